//! SQLite-backed passage store and query log over `tokio-rusqlite`.
//!
//! Passages land in a `documents` table with the metadata record serialized
//! as a JSON column; `user_queries` holds the fire-and-forget query log.
//! Similarity search is not pushed into SQL: ranking scans all passages in
//! memory, so this backend only needs plain CRUD.

use std::path::Path;

use async_trait::async_trait;
use tokio_rusqlite::Connection;

use super::{DeleteFilter, Passage, PassageMetadata, PassageStore, QueryLog};
use crate::types::RagError;

#[derive(Clone)]
pub struct SqlitePassageStore {
    conn: Connection,
}

impl SqlitePassageStore {
    /// Opens (creating if needed) the database at `path` and ensures the
    /// schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Store(err.to_string()))?;
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                     id TEXT PRIMARY KEY,
                     title TEXT NOT NULL,
                     content TEXT NOT NULL,
                     category TEXT,
                     metadata TEXT NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_documents_title ON documents(title);
                 CREATE TABLE IF NOT EXISTS user_queries (
                     id TEXT PRIMARY KEY,
                     question TEXT NOT NULL,
                     created_at TEXT NOT NULL DEFAULT (datetime('now'))
                 );",
            )
            .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Store(err.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl PassageStore for SqlitePassageStore {
    async fn insert(&self, passage: Passage) -> Result<(), RagError> {
        let metadata = serde_json::to_string(&passage.metadata)
            .map_err(|err| RagError::Store(err.to_string()))?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO documents (id, title, content, category, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    (
                        &passage.id,
                        &passage.title,
                        &passage.content,
                        &passage.category,
                        &metadata,
                    ),
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Store(err.to_string()))
    }

    async fn select_all(&self) -> Result<Vec<Passage>, RagError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, title, content, category, metadata
                         FROM documents ORDER BY rowid",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map([], |row| {
                        let metadata_raw: String = row.get(4)?;
                        let metadata: PassageMetadata =
                            serde_json::from_str(&metadata_raw).unwrap_or_default();
                        Ok(Passage {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            content: row.get(2)?,
                            category: row.get(3)?,
                            metadata,
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut passages = Vec::new();
                for row in rows {
                    passages.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(passages)
            })
            .await
            .map_err(|err| RagError::Store(err.to_string()))
    }

    async fn delete_where(&self, filter: DeleteFilter) -> Result<usize, RagError> {
        self.conn
            .call(move |conn| {
                let deleted = match (&filter.category, &filter.title_prefix) {
                    (Some(category), Some(prefix)) => conn.execute(
                        "DELETE FROM documents WHERE category = ?1 AND title LIKE ?2",
                        (category, format!("{prefix}%")),
                    ),
                    (Some(category), None) => conn.execute(
                        "DELETE FROM documents WHERE category = ?1",
                        [category],
                    ),
                    (None, Some(prefix)) => conn.execute(
                        "DELETE FROM documents WHERE title LIKE ?1",
                        [format!("{prefix}%")],
                    ),
                    (None, None) => conn.execute("DELETE FROM documents", []),
                }
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(deleted)
            })
            .await
            .map_err(|err| RagError::Store(err.to_string()))
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Store(err.to_string()))
    }
}

#[async_trait]
impl QueryLog for SqlitePassageStore {
    async fn record(&self, question: &str) -> Result<(), RagError> {
        let id = uuid::Uuid::new_v4().to_string();
        let question = question.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO user_queries (id, question) VALUES (?1, ?2)",
                    (&id, &question),
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Store(err.to_string()))
    }
}
