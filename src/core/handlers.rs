//! # Supervisor action handlers.
//!
//! [`SupervisorCore`] owns the registry and implements the four actions. It is driven
//! by the actor loop one message at a time, so handlers take `&mut self` and never
//! lock anything.
//!
//! ## Update pipeline
//! ```text
//! update(patch)
//!   ├─► task id      patch.taskId, else identity(payload)      ─► MalformedMessage
//!   ├─► known task?                                             ─► UnknownTask
//!   ├─► status set?                                             ─► UnspecifiedStatus
//!   ├─► policy allows from → to?                                ─► IllegalTransition
//!   ├─► persist (journal present, not recovering)               ─► Journal
//!   ├─► from == to                                              ─► Unchanged (no effect)
//!   ├─► merge, set, reindex(from, to)
//!   ├─► effect[to] (skipped while recovering) ─► validate
//!   ├─► reducer                               ─► validate
//!   │        └─ any failure: restore record, reindex(to, from),
//!   │                        persist rollback record              ─► EffectError
//!   └─► commit writes                                            ─► Transitioned
//! ```
//!
//! ## Rules
//! - Validation errors change nothing; they are raised before persistence.
//! - A message that raises `EffectError` leaves the registry as it found it, and the
//!   journal says so: replaying it ends in the same registry.
//! - A `submit` whose `ready` transition fails admits nothing.
//! - Self-addressed updates (restart `ready`, non-blocking abort) carry the
//!   `update` token. They collect in an outbox that the actor sends to its own
//!   mailbox once the message is settled, so a retried message queues each of them
//!   once.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::action::{ActionDirectory, ActionTag, Message, Reply};
use crate::core::actor::SupervisorHandle;
use crate::core::config::SupervisorConfig;
use crate::core::context::Context;
use crate::core::registry::{RegistryView, TaskRegistry};
use crate::core::supervisor::SupervisorAction;
use crate::effects::{Effect, NextState, Reducer};
use crate::error::{EffectError, EffectStage, SupervisorError};
use crate::events::{Bus, Event, EventKind};
use crate::journal::{Journal, PersistedMessage};
use crate::tasks::{Task, TaskId, TaskIdentity, TaskMessage, TaskPatch, TaskStatus};

/// State owned by one running supervisor.
pub(crate) struct SupervisorCore {
    pub(crate) name: Arc<str>,
    pub(crate) cfg: SupervisorConfig,
    pub(crate) directory: Arc<ActionDirectory<SupervisorAction>>,
    pub(crate) registry: TaskRegistry,
    pub(crate) identity: Arc<dyn TaskIdentity>,
    pub(crate) effects: HashMap<TaskStatus, Arc<dyn Effect>>,
    pub(crate) reducer: Arc<dyn Reducer>,
    pub(crate) journal: Option<Arc<dyn Journal>>,
    pub(crate) bus: Bus,
    pub(crate) recovering: bool,
    pub(crate) outbox: Vec<Message>,
}

impl SupervisorCore {
    /// Dispatches `msg` to its handler.
    pub(crate) async fn handle(
        &mut self,
        msg: &Message,
        sender: Option<Arc<str>>,
        me: &SupervisorHandle,
    ) -> Result<Reply, SupervisorError> {
        let tag = self.directory.encode_tag(&msg.tag);
        let Some(action) = self.directory.resolve(&msg.tag) else {
            return Err(SupervisorError::UnknownAction { tag });
        };
        let ctx = Context::new(
            me.clone(),
            sender,
            self.recovering,
            self.journal.clone(),
            tag,
        );

        match action {
            SupervisorAction::Submit => self.submit(msg, &ctx).await,
            SupervisorAction::Update => self.update(msg, &ctx).await,
            SupervisorAction::Restart => self.restart(msg, &ctx).await,
            SupervisorAction::Abort => self.abort(msg, &ctx).await,
        }
    }

    /// Admits a new task and moves it to `ready`.
    async fn submit(&mut self, msg: &Message, ctx: &Context) -> Result<Reply, SupervisorError> {
        let payload = msg
            .task
            .as_ref()
            .and_then(|t| t.payload.as_ref())
            .ok_or(SupervisorError::MalformedMessage {
                action: SupervisorAction::Submit.name(),
                field: "task.payload",
            })?;

        let task_id = match self.identity.task_id(payload) {
            Some(id) if self.identity.is_valid(payload) => id,
            other => return Err(SupervisorError::InvalidTask { task_id: other }),
        };

        if let Some(reason) = self.identity.ignore(payload) {
            ctx.debug()
                .info(format_args!("ignoring task {task_id}: {reason}"));
            self.publish(
                Event::new(EventKind::TaskIgnored)
                    .with_task(task_id.as_str())
                    .with_reason(reason.as_str()),
            );
            return Ok(Reply::Ignored { reason });
        }

        if self.registry.has(task_id.as_str()) {
            self.publish(Event::new(EventKind::TaskDuplicate).with_task(task_id.as_str()));
            return Ok(Reply::Duplicate { task_id });
        }

        self.registry
            .insert(Task::new(task_id.clone(), payload.clone()));
        self.publish(Event::new(EventKind::TaskSubmitted).with_task(task_id.as_str()));

        // Keeps the submit tag and full descriptor, so the persisted record replays
        // through `submit` and recreates the task.
        let ready = Message {
            task: Some(TaskPatch {
                task_id: Some(task_id.clone()),
                status: Some(TaskStatus::Ready),
                payload: Some(payload.clone()),
                ..TaskPatch::default()
            }),
            ..msg.clone()
        };
        if let Err(err) = self.update(&ready, ctx).await {
            self.registry.remove(&task_id);
            if matches!(err, SupervisorError::Effect(_)) {
                self.persist_rollback(task_id, None).await?;
            }
            return Err(err);
        }
        Ok(Reply::Submitted { task_id })
    }

    /// Applies a patch to an existing task.
    async fn update(&mut self, msg: &Message, ctx: &Context) -> Result<Reply, SupervisorError> {
        let patch = msg.task.as_ref().ok_or(SupervisorError::MalformedMessage {
            action: SupervisorAction::Update.name(),
            field: "task",
        })?;
        let task_id = patch
            .task_id
            .clone()
            .or_else(|| {
                patch
                    .payload
                    .as_ref()
                    .and_then(|p| self.identity.task_id(p))
            })
            .ok_or(SupervisorError::MalformedMessage {
                action: SupervisorAction::Update.name(),
                field: "task.taskId",
            })?;

        let Some(current) = self.registry.get(task_id.as_str()).cloned() else {
            return Err(SupervisorError::UnknownTask { task_id });
        };
        let Some(to) = patch.status else {
            return Err(SupervisorError::UnspecifiedStatus { task_id });
        };
        let from = current.status;
        if !self.cfg.transitions.allows(from, to) {
            return Err(SupervisorError::IllegalTransition { task_id, from, to });
        }

        self.persist(msg).await?;

        if from == to {
            self.publish(
                Event::new(EventKind::UpdateSkipped)
                    .with_task(task_id.as_str())
                    .with_status(to),
            );
            return Ok(Reply::Unchanged { task_id });
        }

        let next = current.merged(patch);
        self.registry.set(next.clone());
        self.registry.reindex(from, to, &task_id);

        let task_msg = TaskMessage {
            task: next,
            previous: from,
        };
        match self.run_pipeline(&task_msg, ctx).await {
            Ok(writes) => {
                for task in writes {
                    self.registry.set(task);
                }
                self.publish(
                    Event::new(EventKind::TaskTransitioned)
                        .with_task(task_id.as_str())
                        .with_transition(from, to),
                );
                Ok(Reply::Transitioned { task_id, from, to })
            }
            Err(err) => {
                self.registry.set(current.clone());
                self.registry.reindex(to, from, &task_id);
                ctx.debug().error(&err);
                self.publish(
                    Event::new(EventKind::EffectFailed)
                        .with_task(task_id.as_str())
                        .with_status(to)
                        .with_reason(err.to_string()),
                );
                self.persist_rollback(task_id, Some(current)).await?;
                Err(err.into())
            }
        }
    }

    /// Sends one task or every restartable task back through `init`.
    async fn restart(&mut self, msg: &Message, ctx: &Context) -> Result<Reply, SupervisorError> {
        if let Some(task_id) = &msg.task_id {
            self.restart_one(task_id.clone(), ctx).await?;
            self.publish(Event::new(EventKind::RestartQueued).with_count(1));
            return Ok(Reply::Restarted { count: 1 });
        }

        let ids: Vec<TaskId> = self
            .cfg
            .restart_statuses()
            .into_iter()
            .flat_map(|status| self.registry.ids_in(status))
            .collect();

        let mut count = 0;
        let mut fault = None;
        for task_id in ids {
            match self.restart_one(task_id.clone(), ctx).await {
                Ok(()) => count += 1,
                Err(err) if err.is_fault() => {
                    fault.get_or_insert(err);
                }
                Err(err) => {
                    ctx.debug()
                        .warn(format_args!("skipping restart of {task_id}: {err}"));
                    self.publish_rejected(ctx.tag(), &err);
                }
            }
        }
        if let Some(err) = fault {
            return Err(err);
        }

        self.publish(Event::new(EventKind::RestartQueued).with_count(count));
        Ok(Reply::Restarted { count })
    }

    /// Inline `init`, then `ready` queued to self.
    async fn restart_one(&mut self, task_id: TaskId, ctx: &Context) -> Result<(), SupervisorError> {
        let tag = self.update_tag();
        let init = Message::transition(task_id.clone(), TaskStatus::Init).with_tag(tag.clone());
        let inline = ctx.with_tag(self.directory.encode_tag(&tag));
        self.update(&init, &inline).await?;

        self.queue(Message::transition(task_id, TaskStatus::Ready).with_tag(tag));
        Ok(())
    }

    /// Moves one task, or every task in a status, to `abort`.
    async fn abort(&mut self, msg: &Message, ctx: &Context) -> Result<Reply, SupervisorError> {
        let tag = self.update_tag();
        let inline = ctx.with_tag(self.directory.encode_tag(&tag));

        if let Some(task_id) = &msg.task_id {
            let abort = Message::transition(task_id.clone(), TaskStatus::Abort).with_tag(tag);
            let reply = self.update(&abort, &inline).await?;
            let count = usize::from(matches!(reply, Reply::Transitioned { .. }));
            return Ok(Reply::Aborted { count });
        }

        let raw = msg
            .status
            .as_deref()
            .ok_or(SupervisorError::MalformedMessage {
                action: SupervisorAction::Abort.name(),
                field: "taskId or status",
            })?;
        let Some(status) = TaskStatus::parse(raw) else {
            let reason = format!("unknown task status {raw:?}");
            ctx.debug().warn(format_args!("abort ignored: {reason}"));
            self.publish(Event::new(EventKind::TaskIgnored).with_reason(reason.as_str()));
            return Ok(Reply::Ignored { reason });
        };

        let ids = self.registry.ids_in(status);
        if msg.blocking {
            let mut count = 0;
            for task_id in ids {
                let abort = Message::transition(task_id, TaskStatus::Abort).with_tag(tag.clone());
                self.update(&abort, &inline).await?;
                count += 1;
            }
            return Ok(Reply::Aborted { count });
        }

        let count = ids.len();
        for task_id in ids {
            self.queue(Message::transition(task_id, TaskStatus::Abort).with_tag(tag.clone()));
        }
        self.publish(
            Event::new(EventKind::AbortQueued)
                .with_status(status)
                .with_count(count),
        );
        Ok(Reply::Queued { count })
    }

    /// Runs the effect bound to the new status, then the reducer.
    async fn run_pipeline(
        &self,
        msg: &TaskMessage,
        ctx: &Context,
    ) -> Result<Vec<Task>, EffectError> {
        let task_id = &msg.task.task_id;
        let status = msg.task.status;
        let view = self.registry.view();

        let next = match self.effects.get(&status) {
            Some(effect) if !self.recovering => {
                effect.apply(&view, msg, ctx).await.map_err(|e| {
                    EffectError::failed(task_id.clone(), status, EffectStage::Effect, e.detail)
                })?
            }
            _ => NextState::Unchanged,
        };
        validate(&view, &next, msg, EffectStage::Effect)?;

        let next = self.reducer.reduce(&view, msg, next).map_err(|e| {
            EffectError::failed(task_id.clone(), status, EffectStage::Reducer, e.detail)
        })?;
        validate(&view, &next, msg, EffectStage::Reducer)?;

        Ok(next.into_writes())
    }

    async fn persist(&self, msg: &Message) -> Result<(), SupervisorError> {
        self.append(PersistedMessage::encode(&*self.directory, msg))
            .await
    }

    async fn persist_rollback(
        &self,
        task_id: TaskId,
        restore: Option<Task>,
    ) -> Result<(), SupervisorError> {
        self.append(PersistedMessage::rollback(task_id, restore))
            .await
    }

    async fn append(&self, record: PersistedMessage) -> Result<(), SupervisorError> {
        match &self.journal {
            Some(journal) if !self.recovering => {
                journal.persist(&record).await.map_err(SupervisorError::from)
            }
            _ => Ok(()),
        }
    }

    /// Replays a rollback record: the task becomes `restore`, or goes away.
    pub(crate) fn restore(&mut self, task_id: &TaskId, restore: Option<Task>) {
        let current = self.registry.get(task_id.as_str()).map(|t| t.status);
        match (current, restore) {
            (Some(_), None) => {
                self.registry.remove(task_id);
            }
            (Some(from), Some(task)) => {
                let to = task.status;
                self.registry.set(task);
                self.registry.reindex(from, to, task_id);
            }
            (None, Some(task)) => {
                self.registry.insert(task);
            }
            (None, None) => {}
        }
    }

    /// Adds a self-addressed message to the outbox, once.
    fn queue(&mut self, msg: Message) {
        if !self.outbox.contains(&msg) {
            self.outbox.push(msg);
        }
    }

    /// Sends the outbox to the supervisor's own mailbox.
    pub(crate) fn flush(&mut self, me: &SupervisorHandle) {
        for msg in self.outbox.drain(..) {
            if let Err(e) = me.dispatch_as(Arc::clone(&self.name), msg) {
                warn!(actor = %self.name, error = %e, "dropping self-addressed message");
            }
        }
    }

    fn update_tag(&self) -> ActionTag {
        self.directory
            .tag_of(SupervisorAction::Update)
            .unwrap_or_else(|| ActionTag::named(SupervisorAction::Update.name()))
    }

    /// Stable string form of a message's action, for events and logs.
    pub(crate) fn action_label(&self, msg: &Message) -> String {
        self.directory.encode_tag(&msg.tag)
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_actor(Arc::clone(&self.name)));
    }

    pub(crate) fn publish_rejected(&self, action: &str, err: &SupervisorError) {
        let mut ev = Event::new(EventKind::TransitionRejected)
            .with_action(action)
            .with_reason(format!("{}: {}", err.as_label(), err));
        if let Some(task_id) = err.task_id() {
            ev = ev.with_task(task_id.as_str());
        }
        self.publish(ev);
    }
}

/// Checks that a stage's output only rewrites existing tasks in place.
fn validate(
    view: &RegistryView<'_>,
    next: &NextState,
    msg: &TaskMessage,
    stage: EffectStage,
) -> Result<(), EffectError> {
    let NextState::Write(tasks) = next else {
        return Ok(());
    };
    let damaged = |detail: String| {
        EffectError::damaged(msg.task.task_id.clone(), msg.task.status, stage, detail)
    };
    for task in tasks {
        match view.status_of(task.task_id.as_str()) {
            None => {
                return Err(damaged(format!(
                    "write targets unknown task {}",
                    task.task_id
                )));
            }
            Some(indexed) if indexed != task.status => {
                return Err(damaged(format!(
                    "write moves task {} from {indexed} to {} outside the index",
                    task.task_id, task.status
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> TaskRegistry {
        let mut reg = TaskRegistry::new();
        reg.insert(Task::new("a".into(), json!({})));
        reg
    }

    fn message(reg: &TaskRegistry) -> TaskMessage {
        TaskMessage {
            task: reg.get("a").cloned().unwrap(),
            previous: TaskStatus::Init,
        }
    }

    #[test]
    fn writes_to_existing_tasks_in_place_are_valid() {
        let reg = registry();
        let msg = message(&reg);
        let mut task = msg.task.clone();
        task.state = json!({ "progress": 1 });
        assert!(validate(&reg.view(), &NextState::write(task), &msg, EffectStage::Effect).is_ok());
        assert!(validate(&reg.view(), &NextState::Unchanged, &msg, EffectStage::Effect).is_ok());
    }

    #[test]
    fn writes_to_unknown_tasks_damage_the_state() {
        let reg = registry();
        let msg = message(&reg);
        let ghost = Task::new("ghost".into(), json!({}));
        let err = validate(&reg.view(), &NextState::write(ghost), &msg, EffectStage::Reducer)
            .unwrap_err();
        assert!(err.is_damaged_state());
        assert_eq!(err.stage, EffectStage::Reducer);
    }

    #[test]
    fn status_changes_through_writes_damage_the_state() {
        let reg = registry();
        let msg = message(&reg);
        let mut task = msg.task.clone();
        task.status = TaskStatus::Done;
        let err = validate(&reg.view(), &NextState::write(task), &msg, EffectStage::Effect)
            .unwrap_err();
        assert!(err.detail.contains("from init to done"));
    }
}
