use chrono::{DateTime, Utc};
use sqlx::Row;

use careline_core::{SessionId, WritebackId, WritebackRecord};

use super::{RepositoryError, WritebackRepository};
use crate::DbPool;

pub struct SqlWritebackRepository {
    pool: DbPool,
}

impl SqlWritebackRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_list(raw: &str, column: &str) -> Result<Vec<String>, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("{column} is not a JSON string array: {e}")))
}

fn row_to_writeback(row: &sqlx::sqlite::SqliteRow) -> Result<WritebackRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let session_id: String =
        row.try_get("session_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let message: String =
        row.try_get("message").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let answer: String =
        row.try_get("answer").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let tools_used: String =
        row.try_get("tools_used").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let citation_ids: String =
        row.try_get("citation_ids").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("created_at: {e}")))?;

    Ok(WritebackRecord {
        id: WritebackId(id),
        session_id: SessionId(session_id),
        message,
        answer,
        tools_used: decode_list(&tools_used, "tools_used")?,
        citation_ids: decode_list(&citation_ids, "citation_ids")?,
        created_at,
    })
}

#[async_trait::async_trait]
impl WritebackRepository for SqlWritebackRepository {
    async fn save(&self, record: WritebackRecord) -> Result<(), RepositoryError> {
        let tools_used = serde_json::to_string(&record.tools_used)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let citation_ids = serde_json::to_string(&record.citation_ids)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO crm_writeback (id, session_id, message, answer, tools_used,
                                        citation_ids, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.session_id.0)
        .bind(&record.message)
        .bind(&record.answer)
        .bind(tools_used)
        .bind(citation_ids)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &WritebackId) -> Result<Option<WritebackRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, session_id, message, answer, tools_used, citation_ids, created_at
             FROM crm_writeback WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_writeback(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<WritebackRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, session_id, message, answer, tools_used, citation_ids, created_at
             FROM crm_writeback WHERE session_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(&session_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_writeback).collect()
    }
}
