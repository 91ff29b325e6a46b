use async_trait::async_trait;
use std::error::Error;
use tokio::sync::Mutex;

use super::ConversationStore;
use crate::models::chat::ConversationTurn;
use crate::models::stream::CardsData;

/// Ephemeral in-process store. Used by tests and `--history-type memory`.
#[derive(Default)]
pub struct MemoryStore {
    conversation: Mutex<Vec<ConversationTurn>>,
    last_cards: Mutex<Option<CardsData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn save_conversation(
        &self,
        turns: &[ConversationTurn],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        *self.conversation.lock().await = turns.to_vec();
        Ok(())
    }

    async fn load_conversation(
        &self,
    ) -> Result<Vec<ConversationTurn>, Box<dyn Error + Send + Sync>> {
        Ok(self.conversation.lock().await.clone())
    }

    async fn save_last_cards(
        &self,
        cards: &CardsData,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        *self.last_cards.lock().await = Some(cards.clone());
        Ok(())
    }

    async fn load_last_cards(&self) -> Result<Option<CardsData>, Box<dyn Error + Send + Sync>> {
        Ok(self.last_cards.lock().await.clone())
    }

    async fn clear(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.conversation.lock().await.clear();
        *self.last_cards.lock().await = None;
        Ok(())
    }
}
