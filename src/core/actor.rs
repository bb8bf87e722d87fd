//! # Supervisor actor: mailbox loop, handle and supervision.
//!
//! Each started supervisor is one tokio task draining an unbounded FIFO mailbox.
//!
//! ## Architecture
//! ```text
//! SupervisorHandle ── dispatch/query/snapshot ──► [mailbox] ──► Actor::run()
//!
//! run():
//!   recover() (journal replay, effects off; unreadable journal → policy:
//!              Stop refuses to start, Resume detaches the journal, Retry reads again)
//!   loop {
//!     ├─► shutdown token cancelled          → exit Shutdown
//!     ├─► Envelope::Snapshot                → reply registry snapshot
//!     └─► Envelope::Message
//!           handle(msg)
//!             ├─ Ok(reply)                  → reply
//!             ├─ Err(validation)            → TransitionRejected, reply Err
//!             └─ Err(fault)                 → crash hook, ActorCrashed, then policy:
//!                  ├─ Stop                  → reply Err, exit Stopped
//!                  ├─ Resume                → ActorResumed, reply Err
//!                  └─ Retry                 → ActorRetrying, sleep, handle(msg) again
//!           send outbox to own mailbox, then reply
//!   }
//!   ActorStopped → cancel token → flush subscribers
//! ```
//!
//! ## Rules
//! - Messages are handled strictly one at a time, in arrival order.
//! - Messages queued while handling a message (restart `ready`, non-blocking abort)
//!   land behind everything already in the mailbox.
//! - A query that times out does not cancel the message; the actor keeps running.
//! - The actor keeps only a weak handle to itself. Once every [`SupervisorHandle`]
//!   (including clones held by effects and workers) is dropped, it exits with
//!   [`ActorExit::Shutdown`]; fire-and-forget messages still queued are discarded.
//! - A retried message runs its effects and persists its record again. Each failed
//!   attempt is followed by a rollback record, so replay lands where the live
//!   registry did.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::action::{Message, Reply};
use crate::core::config::FATAL_HANG_TIME;
use crate::core::handlers::SupervisorCore;
use crate::core::registry::RegistrySnapshot;
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};
use crate::core::supervisor::CrashHook;
use crate::policies::SupervisionPolicy;
use crate::subscribers::SubscriberSet;

/// Mailbox entry.
pub(crate) enum Envelope {
    Message {
        message: Message,
        sender: Option<Arc<str>>,
        reply: Option<oneshot::Sender<Result<Reply, SupervisorError>>>,
    },
    Snapshot {
        reply: oneshot::Sender<RegistrySnapshot>,
    },
}

/// Why the actor task returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActorExit {
    /// [`SupervisorHandle::shutdown`] was called.
    Shutdown,
    /// A fault stopped the actor.
    Stopped {
        /// The fault.
        error: SupervisorError,
    },
}

/// Cloneable address of a running supervisor.
///
/// The supervisor runs while any handle is alive or until [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct SupervisorHandle {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Envelope>,
    bus: Bus,
    token: CancellationToken,
}

impl SupervisorHandle {
    /// Supervisor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Queues `msg` without waiting for its outcome.
    pub fn dispatch(&self, msg: Message) -> Result<(), SupervisorError> {
        self.send(Envelope::Message {
            message: msg,
            sender: None,
            reply: None,
        })
    }

    /// Queues `msg` on behalf of `sender`.
    pub fn dispatch_as(
        &self,
        sender: impl Into<Arc<str>>,
        msg: Message,
    ) -> Result<(), SupervisorError> {
        self.send(Envelope::Message {
            message: msg,
            sender: Some(sender.into()),
            reply: None,
        })
    }

    /// Sends `msg` and waits up to `timeout` for its outcome.
    ///
    /// ### Errors
    /// - whatever the handler returned
    /// - [`SupervisorError::Timeout`] if no reply arrived in time (the message is still handled)
    /// - [`SupervisorError::Closed`] if the actor stopped before replying
    pub async fn query(&self, msg: Message, timeout: Duration) -> Result<Reply, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Envelope::Message {
            message: msg,
            sender: None,
            reply: Some(reply),
        })?;
        match time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_dropped)) => Err(SupervisorError::Closed),
            Err(_elapsed) => Err(SupervisorError::Timeout { after: timeout }),
        }
    }

    /// [`query`](Self::query) with [`FATAL_HANG_TIME`]; a timeout is reported as
    /// [`SupervisorError::Hang`].
    pub async fn block(&self, msg: Message) -> Result<Reply, SupervisorError> {
        match self.query(msg, FATAL_HANG_TIME).await {
            Err(SupervisorError::Timeout { after }) => Err(SupervisorError::Hang { after }),
            other => other,
        }
    }

    /// Copy of the registry, taken after every message queued before this call.
    pub async fn snapshot(&self, timeout: Duration) -> Result<RegistrySnapshot, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Envelope::Snapshot { reply })?;
        match time::timeout(timeout, rx).await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(_dropped)) => Err(SupervisorError::Closed),
            Err(_elapsed) => Err(SupervisorError::Timeout { after: timeout }),
        }
    }

    /// Receiver for events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Asks the actor to stop after the message it is handling.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the actor no longer accepts messages.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, env: Envelope) -> Result<(), SupervisorError> {
        self.tx.send(env).map_err(|_| SupervisorError::Closed)
    }
}

impl std::fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl SupervisorHandle {
    pub(crate) fn downgrade(&self) -> WeakSupervisorHandle {
        WeakSupervisorHandle {
            name: Arc::clone(&self.name),
            tx: self.tx.downgrade(),
            bus: self.bus.clone(),
            token: self.token.clone(),
        }
    }
}

/// Handle that does not keep the mailbox open.
#[derive(Clone)]
pub(crate) struct WeakSupervisorHandle {
    name: Arc<str>,
    tx: mpsc::WeakUnboundedSender<Envelope>,
    bus: Bus,
    token: CancellationToken,
}

impl WeakSupervisorHandle {
    /// Returns a handle while at least one other handle is alive.
    pub(crate) fn upgrade(&self) -> Option<SupervisorHandle> {
        Some(SupervisorHandle {
            name: Arc::clone(&self.name),
            tx: self.tx.upgrade()?,
            bus: self.bus.clone(),
            token: self.token.clone(),
        })
    }
}

/// Creates the mailbox and the handle addressing it.
pub(crate) fn mailbox(
    name: Arc<str>,
    bus: Bus,
) -> (SupervisorHandle, mpsc::UnboundedReceiver<Envelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = SupervisorHandle {
        name,
        tx,
        bus,
        token: CancellationToken::new(),
    };
    (handle, rx)
}

enum Flow {
    Reply(Result<Reply, SupervisorError>),
    Stop(SupervisorError),
}

/// What the supervision policy made of a fault.
enum Decision {
    Stop,
    Resume,
    Retry,
}

/// The running supervisor.
pub(crate) struct Actor {
    pub(crate) core: SupervisorCore,
    pub(crate) rx: mpsc::UnboundedReceiver<Envelope>,
    pub(crate) me: WeakSupervisorHandle,
    pub(crate) token: CancellationToken,
    pub(crate) crash_hook: Option<CrashHook>,
    pub(crate) listener: Option<JoinHandle<()>>,
}

impl Actor {
    pub(crate) fn token_of(handle: &SupervisorHandle) -> CancellationToken {
        handle.token.clone()
    }

    /// Recovers, then drains the mailbox until shutdown or a stopping fault.
    pub(crate) async fn run(mut self) -> ActorExit {
        let exit = match self.recover_supervised().await {
            Ok(()) => self.drain().await,
            Err(error) => ActorExit::Stopped { error },
        };

        // Pending envelopes are dropped; their queries observe `Closed`.
        self.rx.close();
        let reason = match &exit {
            ActorExit::Shutdown => "shutdown".to_string(),
            ActorExit::Stopped { error } => format!("{}: {}", error.as_label(), error),
        };
        self.core
            .publish(Event::new(EventKind::ActorStopped).with_reason(reason));
        self.token.cancel();
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
        exit
    }

    async fn drain(&mut self) -> ActorExit {
        loop {
            let env = tokio::select! {
                biased;
                _ = self.token.cancelled() => return ActorExit::Shutdown,
                env = self.rx.recv() => match env {
                    Some(env) => env,
                    None => return ActorExit::Shutdown,
                },
            };

            match env {
                Envelope::Snapshot { reply } => {
                    let _ = reply.send(self.core.registry.snapshot());
                }
                Envelope::Message {
                    message,
                    sender,
                    reply,
                } => {
                    // Only fire-and-forget messages outlive every handle.
                    let Some(me) = self.me.upgrade() else {
                        return ActorExit::Shutdown;
                    };
                    match self.process(&message, sender, &me).await {
                        Flow::Reply(result) => {
                            if let Some(reply) = reply {
                                let _ = reply.send(result);
                            }
                        }
                        Flow::Stop(err) => {
                            if let Some(reply) = reply {
                                let _ = reply.send(Err(err.clone()));
                            }
                            return ActorExit::Stopped { error: err };
                        }
                    }
                }
            }
        }
    }

    /// Handles one message under the supervision policy, then sends what it queued.
    async fn process(
        &mut self,
        message: &Message,
        sender: Option<Arc<str>>,
        me: &SupervisorHandle,
    ) -> Flow {
        let flow = self.supervise(message, sender, me).await;
        self.core.flush(me);
        flow
    }

    async fn supervise(
        &mut self,
        message: &Message,
        sender: Option<Arc<str>>,
        me: &SupervisorHandle,
    ) -> Flow {
        let mut retries: u32 = 0;
        loop {
            let err = match self.core.handle(message, sender.clone(), me).await {
                Ok(reply) => return Flow::Reply(Ok(reply)),
                Err(err) if !err.is_fault() => {
                    self.core
                        .publish_rejected(&self.core.action_label(message), &err);
                    return Flow::Reply(Err(err));
                }
                Err(err) => err,
            };

            if let Some(hook) = &self.crash_hook {
                hook(&err, message);
            }
            let action = self.core.action_label(message);
            match self.on_fault(&err, &action, &mut retries).await {
                Decision::Stop => return Flow::Stop(err),
                Decision::Resume => return Flow::Reply(Err(err)),
                Decision::Retry => {}
            }
        }
    }

    /// Publishes a fault and applies the supervision policy to it.
    ///
    /// `Retry` sleeps through the backoff here; a shutdown during the sleep stops.
    async fn on_fault(
        &mut self,
        err: &SupervisorError,
        action: &str,
        retries: &mut u32,
    ) -> Decision {
        let reason = format!("{}: {}", err.as_label(), err);
        let mut crashed = Event::new(EventKind::ActorCrashed)
            .with_action(action)
            .with_reason(reason.as_str());
        if let Some(task_id) = err.task_id() {
            crashed = crashed.with_task(task_id.as_str());
        }
        self.core.publish(crashed);

        match self.core.cfg.supervision {
            SupervisionPolicy::Stop => Decision::Stop,
            SupervisionPolicy::Resume => {
                self.core
                    .publish(Event::new(EventKind::ActorResumed).with_reason(reason));
                Decision::Resume
            }
            policy @ SupervisionPolicy::Retry { .. } => {
                let Some(delay) = policy.retry_delay(*retries) else {
                    return Decision::Stop;
                };
                *retries += 1;
                self.core.publish(
                    Event::new(EventKind::ActorRetrying)
                        .with_attempt(*retries)
                        .with_delay(delay)
                        .with_reason(reason),
                );
                tokio::select! {
                    _ = self.token.cancelled() => Decision::Stop,
                    _ = time::sleep(delay) => Decision::Retry,
                }
            }
        }
    }

    /// Replays the journal under the supervision policy.
    ///
    /// An unreadable journal is a fault. `Stop` refuses to start, `Retry` reads it
    /// again after the backoff, and `Resume` starts empty with the journal detached,
    /// so nothing is appended behind the records that could not be read.
    async fn recover_supervised(&mut self) -> Result<(), SupervisorError> {
        let mut retries: u32 = 0;
        loop {
            let Err(err) = self.recover().await else {
                return Ok(());
            };
            error!(actor = %self.core.name, error = %err, "journal replay failed");
            match self.on_fault(&err, "recover", &mut retries).await {
                Decision::Stop => return Err(err),
                Decision::Resume => {
                    warn!(actor = %self.core.name, "journal detached, starting empty");
                    self.core.journal = None;
                    return Ok(());
                }
                Decision::Retry => {}
            }
        }
    }

    /// Replays the journal with effects and persistence turned off.
    async fn recover(&mut self) -> Result<(), SupervisorError> {
        let Some(journal) = self.core.journal.clone() else {
            return Ok(());
        };
        let records = journal.replay().await?;
        let Some(me) = self.me.upgrade() else {
            return Ok(());
        };

        self.core
            .publish(Event::new(EventKind::RecoveryStarted).with_count(records.len()));
        self.core.recovering = true;
        let mut failed = 0;
        for record in records {
            if record.is_rollback() {
                if let Some(task_id) = record.task_id {
                    self.core.restore(&task_id, record.restore);
                }
                continue;
            }
            let message = record.decode(&*self.core.directory);
            if let Err(e) = self.core.handle(&message, None, &me).await {
                failed += 1;
                warn!(
                    actor = %self.core.name,
                    action = %self.core.action_label(&message),
                    error = %e,
                    "replayed message rejected"
                );
            }
        }
        self.core.recovering = false;
        // queued messages were journaled when they were handled
        self.core.outbox.clear();
        self.core
            .publish(Event::new(EventKind::RecoveryCompleted).with_count(failed));
        Ok(())
    }
}

/// Forwards bus events to the subscriber set until the actor exits.
pub(crate) async fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Ok(ev) => forward(&set, ev),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = token.cancelled() => break,
        }
    }
    while let Ok(ev) = rx.try_recv() {
        forward(&set, ev);
    }
    set.shutdown().await;
}

fn forward(set: &SubscriberSet, ev: Event) {
    // Fan-out failures are logged here; forwarding them would let a subscriber that
    // panics on every event feed itself forever.
    if ev.is_subscriber_event() {
        warn!(
            kind = ?ev.kind,
            subscriber = ev.task.as_deref().unwrap_or("unknown"),
            reason = ev.reason.as_deref().unwrap_or(""),
            "subscriber fan-out failed"
        );
        return;
    }
    set.emit_arc(Arc::new(ev));
}
