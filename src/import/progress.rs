//! Per-job progress: token -> (percent, message), overwrite-only, no history.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Key-value progress accessor shared by the import worker and the API.
///
/// `get` on an unknown token returns the `(0, "not found")` sentinel rather
/// than failing; callers cannot distinguish it from a job that has not
/// written yet except by the message text.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn set(&self, token: &str, percent: u8, message: &str);
    async fn get(&self, token: &str) -> (u8, String);
}

/// In-process store. Entries are kept as a single `"<percent>|<message>"`
/// string and split on the first `|` on read. No expiry: entries live for
/// the process lifetime.
#[derive(Default)]
pub struct InMemoryProgress {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgress {
    async fn set(&self, token: &str, percent: u8, message: &str) {
        let value = format!("{percent}|{message}");
        self.entries
            .write()
            .expect("progress store lock poisoned")
            .insert(token.to_string(), value);
    }

    async fn get(&self, token: &str) -> (u8, String) {
        let entries = self.entries.read().expect("progress store lock poisoned");
        match entries.get(token) {
            Some(value) => {
                let (pct, msg) = value.split_once('|').unwrap_or(("0", value.as_str()));
                (pct.parse().unwrap_or(0), msg.to_string())
            }
            None => (0, "not found".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_token_returns_sentinel() {
        let store = InMemoryProgress::new();
        assert_eq!(store.get("nope").await, (0, "not found".to_string()));
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = InMemoryProgress::new();
        store.set("t1", 40, "Processed 4/10").await;
        assert_eq!(store.get("t1").await, (40, "Processed 4/10".to_string()));
    }

    #[tokio::test]
    async fn set_overwrites_in_place() {
        let store = InMemoryProgress::new();
        store.set("t1", 10, "Processed 1/10").await;
        store.set("t1", 100, "Completed").await;
        assert_eq!(store.get("t1").await, (100, "Completed".to_string()));
    }

    #[tokio::test]
    async fn message_may_contain_separator() {
        let store = InMemoryProgress::new();
        store.set("t1", 30, "Failed: bad | stuff").await;
        assert_eq!(store.get("t1").await, (30, "Failed: bad | stuff".to_string()));
    }
}
