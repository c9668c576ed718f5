use tokio::sync::RwLock;

use careline_core::{SessionId, WritebackId, WritebackRecord};

use super::{RepositoryError, WritebackRepository};

#[derive(Default)]
pub struct InMemoryWritebackRepository {
    records: RwLock<Vec<WritebackRecord>>,
}

impl InMemoryWritebackRepository {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl WritebackRepository for InMemoryWritebackRepository {
    async fn save(&self, record: WritebackRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Decode(format!("duplicate writeback id {}", record.id.0)));
        }
        records.push(record);
        Ok(())
    }

    async fn find_by_id(&self, id: &WritebackId) -> Result<Option<WritebackRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| &record.id == id).cloned())
    }

    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<WritebackRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|record| &record.session_id == session_id).cloned().collect())
    }
}
