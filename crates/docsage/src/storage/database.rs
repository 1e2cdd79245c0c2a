//! SQLite-backed conversation store
//!
//! Three tables: sessions, messages (foreign-keyed to sessions with cascade
//! delete), and documents. All operations are point lookups or range scans
//! keyed by primary id or the session foreign key.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{
    Citation, Document, DocumentStatus, FileType, Message, Role, Session, StatsResponse,
};

/// SQLite-backed store for sessions, messages, and documents
pub struct ConversationStore {
    conn: Arc<Mutex<Connection>>,
}

impl ConversationStore {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::Database(format!("failed to open database: {}", e)))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {}", e)))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
        "#,
        )
        .map_err(|e| Error::Database(format!("failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                metadata TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_updated_at ON sessions(updated_at);

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                citations TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, created_at);

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                file_type TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                uploaded_at TEXT NOT NULL,
                metadata TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);
            CREATE INDEX IF NOT EXISTS idx_documents_content_hash ON documents(content_hash);
        "#,
        )
        .map_err(|e| Error::Database(format!("failed to run migrations: {}", e)))?;

        tracing::debug!("database migrations complete");
        Ok(())
    }

    // ==================== Sessions ====================

    /// Create a new session
    pub fn create_session(&self, title: Option<&str>) -> Result<Session> {
        self.create_session_with_id(Uuid::new_v4(), title)
    }

    /// Create a session under a caller-supplied id (implicit creation on first ask)
    pub fn create_session_with_id(&self, id: Uuid, title: Option<&str>) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id,
            title: title.unwrap_or("New Conversation").to_string(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (id, title, created_at, updated_at, metadata) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.to_string(),
                session.title,
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
                serde_json::to_string(&session.metadata)?,
            ],
        )?;

        Ok(session)
    }

    /// Get a session by id
    pub fn get_session(&self, id: Uuid) -> Result<Session> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM sessions WHERE id = ?1")?;
        stmt.query_row(params![id.to_string()], row_to_session)
            .optional()?
            .ok_or_else(|| Error::session_not_found(id))
    }

    /// List sessions ordered by updated_at descending
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT * FROM sessions ORDER BY updated_at DESC LIMIT ?1")?;
        let sessions = stmt
            .query_map(params![limit as i64], row_to_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Delete a session; its messages cascade via the foreign key
    pub fn delete_session(&self, id: Uuid) -> Result<()> {
        let conn = self.conn.lock();
        let count = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id.to_string()])?;
        if count == 0 {
            return Err(Error::session_not_found(id));
        }
        Ok(())
    }

    // ==================== Messages ====================

    /// Append a message to a session and bump the session's updated_at.
    ///
    /// The message insert and the timestamp bump share one transaction, so
    /// the session's updated_at always equals its newest message's
    /// created_at.
    pub fn append_message(
        &self,
        session_id: Uuid,
        role: Role,
        content: &str,
        citations: &[Citation],
    ) -> Result<Message> {
        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4(),
            session_id,
            role,
            content: content.to_string(),
            citations: citations.to_vec(),
            created_at: now,
        };

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE sessions SET updated_at = ?2 WHERE id = ?1",
            params![session_id.to_string(), now.to_rfc3339()],
        )?;
        if updated == 0 {
            return Err(Error::session_not_found(session_id));
        }

        tx.execute(
            "INSERT INTO messages (id, session_id, role, content, citations, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id.to_string(),
                session_id.to_string(),
                role.as_str(),
                message.content,
                serde_json::to_string(&message.citations)?,
                now.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(message)
    }

    /// List a session's messages in creation order (rowid breaks timestamp ties)
    pub fn list_messages(&self, session_id: Uuid, limit: usize) -> Result<Vec<Message>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM messages WHERE session_id = ?1 ORDER BY created_at ASC, rowid ASC LIMIT ?2",
        )?;
        let messages = stmt
            .query_map(params![session_id.to_string(), limit as i64], row_to_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }

    /// Most recent turns as (question, answer) pairs, oldest first
    pub fn recent_turns(&self, session_id: Uuid, max_turns: usize) -> Result<Vec<(String, String)>> {
        let messages = self.list_messages(session_id, usize::MAX.min(i64::MAX as usize))?;
        let mut turns = Vec::new();
        let mut pending_question: Option<String> = None;
        for message in messages {
            match message.role {
                Role::User => pending_question = Some(message.content),
                Role::Assistant => {
                    if let Some(question) = pending_question.take() {
                        turns.push((question, message.content));
                    }
                }
            }
        }
        if turns.len() > max_turns {
            turns.drain(..turns.len() - max_turns);
        }
        Ok(turns)
    }

    // ==================== Documents ====================

    /// Create a document record with initial status `processing`
    pub fn create_document(
        &self,
        filename: &str,
        file_size: u64,
        file_type: FileType,
        content_hash: &str,
    ) -> Result<Document> {
        let doc = Document {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            file_size,
            file_type,
            content_hash: content_hash.to_string(),
            chunk_count: 0,
            status: DocumentStatus::Processing,
            uploaded_at: Utc::now(),
            metadata: HashMap::new(),
        };

        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO documents (id, filename, file_size, file_type, content_hash, chunk_count, status, uploaded_at, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                doc.id.to_string(),
                doc.filename,
                doc.file_size as i64,
                doc.file_type.as_str(),
                doc.content_hash,
                doc.chunk_count as i64,
                doc.status.as_str(),
                doc.uploaded_at.to_rfc3339(),
                serde_json::to_string(&doc.metadata)?,
            ],
        )?;

        Ok(doc)
    }

    /// Get a document by id
    pub fn get_document(&self, id: Uuid) -> Result<Document> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1")?;
        stmt.query_row(params![id.to_string()], row_to_document)
            .optional()?
            .ok_or_else(|| Error::document_not_found(id))
    }

    /// Find a completed or processing document with identical content
    pub fn find_document_by_hash(&self, content_hash: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE content_hash = ?1 AND status != 'failed' LIMIT 1",
        )?;
        let doc = stmt
            .query_row(params![content_hash], row_to_document)
            .optional()?;
        Ok(doc)
    }

    /// List documents, optionally filtered by status, newest first
    pub fn list_documents(&self, status: Option<DocumentStatus>) -> Result<Vec<Document>> {
        let conn = self.conn.lock();
        let docs = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM documents WHERE status = ?1 ORDER BY uploaded_at DESC",
                )?;
                let docs = stmt
                    .query_map(params![status.as_str()], row_to_document)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                docs
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT * FROM documents ORDER BY uploaded_at DESC")?;
                let docs = stmt
                    .query_map([], row_to_document)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                docs
            }
        };
        Ok(docs)
    }

    /// Update a document's status and chunk count.
    ///
    /// Re-running with the same values is a no-op with respect to observable
    /// state.
    pub fn update_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        chunk_count: Option<u32>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        let count = match chunk_count {
            Some(chunks) => conn.execute(
                "UPDATE documents SET status = ?2, chunk_count = ?3 WHERE id = ?1",
                params![id.to_string(), status.as_str(), chunks as i64],
            )?,
            None => conn.execute(
                "UPDATE documents SET status = ?2 WHERE id = ?1",
                params![id.to_string(), status.as_str()],
            )?,
        };
        if count == 0 {
            return Err(Error::document_not_found(id));
        }
        Ok(())
    }

    /// Delete a document record.
    ///
    /// The caller must also remove the document's vectors from the index;
    /// this store only owns the relational row.
    pub fn delete_document(&self, id: Uuid) -> Result<Document> {
        let doc = self.get_document(id)?;
        let conn = self.conn.lock();
        conn.execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])?;
        Ok(doc)
    }

    // ==================== Stats ====================

    /// Row counts across the three tables
    pub fn stats(&self) -> Result<StatsResponse> {
        let conn = self.conn.lock();
        let sessions: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?;
        let messages: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
        let documents: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
        Ok(StatsResponse {
            sessions: sessions as usize,
            messages: messages as usize,
            documents: documents as usize,
        })
    }

    /// Cheap connectivity probe used by the health endpoint
    pub fn health_check(&self) -> bool {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0)).is_ok()
    }
}

// Row mappers

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_metadata(value: Option<String>) -> HashMap<String, serde_json::Value> {
    value
        .and_then(|v| serde_json::from_str(&v).ok())
        .unwrap_or_default()
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    let id: String = row.get("id")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let metadata: Option<String> = row.get("metadata")?;

    Ok(Session {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        title: row.get("title")?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        metadata: parse_metadata(metadata),
    })
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    let id: String = row.get("id")?;
    let session_id: String = row.get("session_id")?;
    let role: String = row.get("role")?;
    let citations: Option<String> = row.get("citations")?;
    let created_at: String = row.get("created_at")?;

    Ok(Message {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        session_id: Uuid::parse_str(&session_id).unwrap_or_default(),
        role: Role::parse(&role).unwrap_or(Role::User),
        content: row.get("content")?,
        citations: citations
            .and_then(|c| serde_json::from_str(&c).ok())
            .unwrap_or_default(),
        created_at: parse_timestamp(&created_at),
    })
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let id: String = row.get("id")?;
    let file_size: i64 = row.get("file_size")?;
    let file_type: String = row.get("file_type")?;
    let chunk_count: i64 = row.get("chunk_count")?;
    let status: String = row.get("status")?;
    let uploaded_at: String = row.get("uploaded_at")?;
    let metadata: Option<String> = row.get("metadata")?;

    Ok(Document {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        filename: row.get("filename")?,
        file_size: file_size as u64,
        file_type: FileType::from_str_tag(&file_type),
        content_hash: row.get("content_hash")?,
        chunk_count: chunk_count as u32,
        status: DocumentStatus::parse(&status).unwrap_or(DocumentStatus::Failed),
        uploaded_at: parse_timestamp(&uploaded_at),
        metadata: parse_metadata(metadata),
    })
}
