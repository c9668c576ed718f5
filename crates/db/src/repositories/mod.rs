use async_trait::async_trait;
use thiserror::Error;

use careline_core::{SessionId, WritebackId, WritebackRecord};

pub mod memory;
pub mod writeback;

pub use memory::InMemoryWritebackRepository;
pub use writeback::SqlWritebackRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Storage for CRM interaction summaries written after each chat.
#[async_trait]
pub trait WritebackRepository: Send + Sync {
    async fn save(&self, record: WritebackRecord) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &WritebackId) -> Result<Option<WritebackRecord>, RepositoryError>;

    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<WritebackRecord>, RepositoryError>;
}
