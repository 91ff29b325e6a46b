use async_trait::async_trait;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;

use super::ConversationStore;
use crate::models::chat::ConversationTurn;
use crate::models::stream::CardsData;

const CONVERSATION_FILE: &str = "conversation.json";
const LAST_CARDS_FILE: &str = "last_cards.json";

/// JSON files under a history directory, one file per key.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    async fn write_json<T: serde::Serialize>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.path(name), json).await?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for FileStore {
    async fn save_conversation(
        &self,
        turns: &[ConversationTurn],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.write_json(CONVERSATION_FILE, &turns).await
    }

    async fn load_conversation(
        &self,
    ) -> Result<Vec<ConversationTurn>, Box<dyn Error + Send + Sync>> {
        let path = self.path(CONVERSATION_FILE);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&path).await?;
        let turns = serde_json::from_str(&json)?;
        Ok(turns)
    }

    async fn save_last_cards(
        &self,
        cards: &CardsData,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.write_json(LAST_CARDS_FILE, cards).await
    }

    async fn load_last_cards(&self) -> Result<Option<CardsData>, Box<dyn Error + Send + Sync>> {
        let path = self.path(LAST_CARDS_FILE);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).await?;
        let cards = serde_json::from_str(&json)?;
        Ok(Some(cards))
    }

    async fn clear(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        for name in [CONVERSATION_FILE, LAST_CARDS_FILE] {
            let path = self.path(name);
            if fs::try_exists(&path).await.unwrap_or(false) {
                fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn conversation_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let turns = vec![
            ConversationTurn::greeting(),
            ConversationTurn::user("travel card"),
        ];
        store.save_conversation(&turns).await.unwrap();

        let loaded = store.load_conversation().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].content, "travel card");
        assert_eq!(loaded[1].timestamp, turns[1].timestamp);
    }

    #[tokio::test]
    async fn missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.load_conversation().await.unwrap().is_empty());
        assert!(store.load_last_cards().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(CONVERSATION_FILE), "not json")
            .await
            .unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.load_conversation().await.is_err());
    }

    #[tokio::test]
    async fn clear_removes_both_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store
            .save_conversation(&[ConversationTurn::greeting()])
            .await
            .unwrap();
        store.clear().await.unwrap();
        assert!(store.load_conversation().await.unwrap().is_empty());
    }
}
