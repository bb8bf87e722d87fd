//! # In-memory journal.
//!
//! Stores each record as a JSON string, so everything that goes through it is
//! exercised by the same codec a durable backend would use.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::JournalError;
use crate::journal::{Journal, PersistedMessage};

/// Journal kept in process memory.
///
/// Hand the same `Arc<InMemoryJournal>` to a second supervisor to simulate a
/// process restart.
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    records: Mutex<Vec<String>>,
}

impl InMemoryJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a journal holding `records`, as if a previous run had persisted them.
    pub fn seeded<I>(records: I) -> Result<Self, JournalError>
    where
        I: IntoIterator<Item = PersistedMessage>,
    {
        let records = records
            .into_iter()
            .map(|r| serde_json::to_string(&r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            records: Mutex::new(records),
        })
    }

    /// Creates a journal from raw JSON lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            records: Mutex::new(lines.into_iter().map(Into::into).collect()),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Returns `true` if nothing was persisted.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Raw JSON lines in append order.
    pub async fn lines(&self) -> Vec<String> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl Journal for InMemoryJournal {
    async fn persist(&self, record: &PersistedMessage) -> Result<(), JournalError> {
        let line = serde_json::to_string(record)?;
        self.records.lock().await.push(line);
        Ok(())
    }

    async fn replay(&self) -> Result<Vec<PersistedMessage>, JournalError> {
        self.records
            .lock()
            .await
            .iter()
            .enumerate()
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|source| JournalError::Corrupt { index, source })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str) -> PersistedMessage {
        PersistedMessage {
            kind: kind.to_string(),
            task: None,
            task_id: None,
            status: None,
            blocking: false,
            restore: None,
        }
    }

    #[tokio::test]
    async fn persists_in_order() {
        let journal = InMemoryJournal::new();
        journal.persist(&record("submit")).await.unwrap();
        journal.persist(&record("@update")).await.unwrap();

        let kinds: Vec<_> = journal
            .replay()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(kinds, vec!["submit", "@update"]);
        assert_eq!(journal.lines().await[1], r#"{"type":"@update"}"#);
    }

    #[tokio::test]
    async fn corrupt_lines_are_reported_with_their_index() {
        let journal = InMemoryJournal::from_lines([r#"{"type":"submit"}"#, "not json"]);
        match journal.replay().await {
            Err(JournalError::Corrupt { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected corrupt record, got {other:?}"),
        }
    }
}
