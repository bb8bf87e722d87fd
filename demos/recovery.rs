//! # Example: recovery
//!
//! Simulates a crash and restart of a task supervisor sharing one journal.
//!
//! Shows how to:
//! - Persist accepted updates with [`InMemoryJournal`].
//! - Replay the journal on start (effects stay silent while recovering).
//! - Bulk-restart every unfinished task after recovery.
//! - Attach a custom [`Subscribe`] implementation next to [`LogWriter`].
//!
//! ## Flow
//! ```text
//! run #1: submit a, b, c ─► c done ─► "crash" (shutdown)
//!                                         │ journal
//! run #2: replay ─► {a, b} ready, c done ◄┘
//!         restart() ─► a, b: init ─► ready (effect fires again)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example recovery
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use taskwarden::{
    EffectFn, Event, EventKind, FieldIdentity, InMemoryJournal, LogWriter, Message, NextState,
    Subscribe, Supervisor, SupervisorConfig, TaskStatus,
};

const WAIT: Duration = Duration::from_secs(1);

/// Prints recovery milestones.
struct RecoveryReport;

#[async_trait::async_trait]
impl Subscribe for RecoveryReport {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::RecoveryStarted => {
                println!("[report] replaying {} records", ev.count.unwrap_or(0));
            }
            EventKind::RecoveryCompleted => {
                println!(
                    "[report] recovery done, {} records rejected",
                    ev.count.unwrap_or(0)
                );
            }
            EventKind::RestartQueued => {
                println!("[report] {} tasks restarted", ev.count.unwrap_or(0));
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "recovery-report"
    }
}

fn supervisor(journal: Arc<InMemoryJournal>) -> Result<Supervisor, Box<dyn std::error::Error>> {
    let ready = EffectFn::arc(|msg, ctx| async move {
        ctx.debug()
            .info(format_args!("sending mail for {}", msg.task.task_id));
        Ok(NextState::Unchanged)
    });
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default()), Arc::new(RecoveryReport)];

    Ok(Supervisor::builder(SupervisorConfig::named("mailer"), FieldIdentity::new("foreignId"))
        .with_effect(TaskStatus::Ready, ready)
        .with_journal(journal)
        .with_subscribers(subs)
        .build()?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let journal = Arc::new(InMemoryJournal::new());

    println!("--- run #1 ---");
    let (handle, exit) = supervisor(Arc::clone(&journal))?.start();
    for id in ["00001", "00002", "00003"] {
        handle
            .query(Message::submit(json!({ "foreignId": id })), WAIT)
            .await?;
    }
    handle
        .query(Message::transition("00003", TaskStatus::Done), WAIT)
        .await?;
    handle.shutdown();
    exit.await?;

    for line in journal.lines().await {
        println!("[journal] {line}");
    }

    println!("--- run #2 ---");
    let (handle, exit) = supervisor(journal)?.start();
    let reply = handle.query(Message::restart_all(), WAIT).await?;
    println!("[main] restart: {reply:?}");

    let snap = handle.snapshot(WAIT).await?;
    println!("[main] registry: {}", serde_json::to_string_pretty(&snap)?);

    handle.shutdown();
    exit.await?;
    Ok(())
}
