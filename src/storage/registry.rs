//! SQLite registry of ingested policies
//!
//! Records what was ingested when, with content hashes so re-ingesting an
//! unchanged file can be skipped cheaply.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::types::FileType;

/// One ingested policy
#[derive(Debug, Clone)]
pub struct PolicyRecord {
    pub policy_name: String,
    pub filename: String,
    pub file_type: FileType,
    pub content_hash: String,
    pub total_pages: Option<u32>,
    pub ocr_pages: u32,
    pub chunk_count: u32,
    pub ingested_at: DateTime<Utc>,
}

/// SQLite-backed policy registry
pub struct PolicyRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl PolicyRegistry {
    /// Create or open the registry at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let registry = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        registry.migrate()?;
        Ok(registry)
    }

    /// In-memory registry for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let registry = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        registry.migrate()?;
        Ok(registry)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS policies (
                policy_name TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                file_type TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                total_pages INTEGER,
                ocr_pages INTEGER NOT NULL DEFAULT 0,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                ingested_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_policies_content_hash ON policies(content_hash);
        "#,
        )?;

        Ok(())
    }

    /// Insert or replace the record for a policy
    pub fn record(&self, record: &PolicyRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"INSERT OR REPLACE INTO policies
               (policy_name, filename, file_type, content_hash, total_pages, ocr_pages, chunk_count, ingested_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                record.policy_name,
                record.filename,
                file_type_str(&record.file_type),
                record.content_hash,
                record.total_pages,
                record.ocr_pages,
                record.chunk_count,
                record.ingested_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up a policy by name
    pub fn find(&self, policy_name: &str) -> Result<Option<PolicyRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                r#"SELECT policy_name, filename, file_type, content_hash, total_pages, ocr_pages, chunk_count, ingested_at
                   FROM policies WHERE policy_name = ?1"#,
                params![policy_name],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// All registered policies, sorted by name
    pub fn list(&self) -> Result<Vec<PolicyRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"SELECT policy_name, filename, file_type, content_hash, total_pages, ocr_pages, chunk_count, ingested_at
               FROM policies ORDER BY policy_name"#,
        )?;
        let rows = stmt.query_map([], row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Remove a policy's record
    pub fn remove(&self, policy_name: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM policies WHERE policy_name = ?1", params![policy_name])?;
        Ok(changed > 0)
    }
}

fn file_type_str(file_type: &FileType) -> &'static str {
    match file_type {
        FileType::Pdf => "pdf",
        FileType::Docx => "docx",
        FileType::Doc => "doc",
        FileType::Unknown => "unknown",
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<PolicyRecord> {
    let ingested_at: String = row.get(7)?;
    Ok(PolicyRecord {
        policy_name: row.get(0)?,
        filename: row.get(1)?,
        file_type: FileType::from_extension(&row.get::<_, String>(2)?),
        content_hash: row.get(3)?,
        total_pages: row.get(4)?,
        ocr_pages: row.get(5)?,
        chunk_count: row.get(6)?,
        ingested_at: DateTime::parse_from_rfc3339(&ingested_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, hash: &str) -> PolicyRecord {
        PolicyRecord {
            policy_name: name.to_string(),
            filename: format!("{}.pdf", name),
            file_type: FileType::Pdf,
            content_hash: hash.to_string(),
            total_pages: Some(10),
            ocr_pages: 2,
            chunk_count: 42,
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn record_roundtrip() {
        let registry = PolicyRegistry::in_memory().unwrap();
        registry.record(&sample("Gold Plan", "abc")).unwrap();

        let found = registry.find("Gold Plan").unwrap().unwrap();
        assert_eq!(found.filename, "Gold Plan.pdf");
        assert_eq!(found.chunk_count, 42);
        assert_eq!(found.content_hash, "abc");
        assert_eq!(found.ocr_pages, 2);
        assert!(registry.find("Silver Plan").unwrap().is_none());
    }

    #[test]
    fn replacing_a_record_keeps_one_row() {
        let registry = PolicyRegistry::in_memory().unwrap();
        registry.record(&sample("Gold Plan", "abc")).unwrap();
        registry.record(&sample("Gold Plan", "def")).unwrap();

        let all = registry.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content_hash, "def");
    }

    #[test]
    fn remove_deletes_the_record() {
        let registry = PolicyRegistry::in_memory().unwrap();
        registry.record(&sample("Gold Plan", "abc")).unwrap();
        assert!(registry.remove("Gold Plan").unwrap());
        assert!(!registry.remove("Gold Plan").unwrap());
        assert!(registry.list().unwrap().is_empty());
    }
}
