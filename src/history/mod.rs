mod file;
mod memory;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::models::chat::ConversationTurn;
use crate::models::stream::CardsData;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Client-local persistence for the conversation list and the last-viewed
/// cards payload. The browser-local key-value store of the original product,
/// behind a trait so tests can run fully in memory.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn save_conversation(
        &self,
        turns: &[ConversationTurn],
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn load_conversation(
        &self,
    ) -> Result<Vec<ConversationTurn>, Box<dyn Error + Send + Sync>>;

    async fn save_last_cards(
        &self,
        cards: &CardsData,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn load_last_cards(&self) -> Result<Option<CardsData>, Box<dyn Error + Send + Sync>>;

    async fn clear(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}

pub fn create_store(args: &Args) -> Result<Arc<dyn ConversationStore>, Box<dyn Error + Send + Sync>> {
    match args.history_type.to_lowercase().as_str() {
        "file" => {
            info!("conversation history stored in: {}", args.history_path);
            Ok(Arc::new(FileStore::new(&args.history_path)))
        }
        "memory" => Ok(Arc::new(MemoryStore::new())),
        _ => Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Unsupported history store type: {}", args.history_type),
        ))),
    }
}
