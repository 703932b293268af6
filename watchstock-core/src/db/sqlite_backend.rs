//! SQLite database storage backend
//!
//! This backend stores every collection in one SQLite table of JSON
//! documents, giving indexed lookups and safe concurrent access.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::traits::{BackendType, CatalogStore, DatabaseBackend, Document, Fields};
use crate::models::Collection;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite backend implementation
pub struct SqliteBackend {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Opens (creating if needed) a SQLite catalog file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open SQLite database {:?}", path))?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let backend = Self {
            path,
            conn: Mutex::new(conn),
        };

        backend.init_schema()?;
        Ok(backend)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection lock poisoned"))
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        let current_version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(include_str!("schema.sql"))?;
        } else if current_version < SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is outdated, expected {}",
                current_version,
                SCHEMA_VERSION
            );
        }

        Ok(())
    }

    /// Serializes document fields to JSON for storage
    fn to_json(fields: &Fields) -> Result<String> {
        serde_json::to_string(fields).context("Failed to serialize to JSON")
    }

    /// Deserializes document fields from JSON storage
    fn from_json(json: &str) -> Result<Fields> {
        serde_json::from_str(json).context("Failed to deserialize from JSON")
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
        Ok((row.get(0)?, row.get(1)?))
    }

    fn to_document(id_str: &str, body: &str) -> Result<Document> {
        let id = Uuid::parse_str(id_str)
            .with_context(|| format!("Malformed document id in database: {}", id_str))?;
        Ok(Document::new(id, Self::from_json(body)?))
    }

    fn query_documents(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Document>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::read_row)?;

        let mut documents = Vec::new();
        for row_result in rows {
            let (id_str, body) = row_result?;
            documents.push(Self::to_document(&id_str, &body)?);
        }
        Ok(documents)
    }

    fn load_collection(conn: &Connection, collection: Collection) -> Result<Vec<Document>> {
        Self::query_documents(
            conn,
            "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY rowid",
            &[&collection.name()],
        )
    }

    fn insert_document(conn: &Connection, collection: Collection, document: &Document) -> Result<()> {
        conn.execute(
            "INSERT INTO documents (collection, id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                collection.name(),
                document.id.to_string(),
                Self::to_json(&document.fields)?,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Writes a whole store in place: rows missing from the store are
    /// removed, existing rows keep their `created_at` and position
    fn write_store(conn: &Connection, store: &CatalogStore) -> Result<()> {
        for collection in Collection::ALL {
            let documents = store.collection(collection);
            let keep: HashSet<String> = documents.iter().map(|d| d.id.to_string()).collect();

            let stored: Vec<String> = {
                let mut stmt = conn.prepare("SELECT id FROM documents WHERE collection = ?1")?;
                let ids = stmt.query_map([collection.name()], |row| row.get(0))?;
                ids.collect::<rusqlite::Result<_>>()?
            };
            for id in stored.iter().filter(|id| !keep.contains(*id)) {
                conn.execute(
                    "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection.name(), id],
                )?;
            }

            for document in documents {
                conn.execute(
                    "INSERT INTO documents (collection, id, body, created_at) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body",
                    params![
                        collection.name(),
                        document.id.to_string(),
                        Self::to_json(&document.fields)?,
                        chrono::Utc::now().to_rfc3339(),
                    ],
                )?;
            }
        }
        Ok(())
    }
}

impl DatabaseBackend for SqliteBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<CatalogStore> {
        let conn = self.conn()?;
        Ok(CatalogStore {
            vendors: Self::load_collection(&conn, Collection::Vendors)?,
            categories: Self::load_collection(&conn, Collection::Categories)?,
            items: Self::load_collection(&conn, Collection::Items)?,
        })
    }

    fn save(&self, store: &CatalogStore) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        Self::write_store(&tx, store)?;

        tx.commit()?;
        Ok(())
    }

    fn update_atomically(&self, update_fn: &mut dyn FnMut(&mut CatalogStore)) -> Result<CatalogStore> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Exclusive)?;

        let mut store = CatalogStore {
            vendors: Self::load_collection(&tx, Collection::Vendors)?,
            categories: Self::load_collection(&tx, Collection::Categories)?,
            items: Self::load_collection(&tx, Collection::Items)?,
        };
        update_fn(&mut store);

        Self::write_store(&tx, &store)?;

        tx.commit()?;
        Ok(store)
    }

    // Override for efficient single-document operations

    fn find_by_id(&self, collection: Collection, id: &Uuid) -> Result<Option<Document>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection.name(), id.to_string()],
                Self::read_row,
            )
            .optional()?;

        match row {
            Some((id_str, body)) => Ok(Some(Self::to_document(&id_str, &body)?)),
            None => Ok(None),
        }
    }

    fn find_all(&self, collection: Collection) -> Result<Vec<Document>> {
        let conn = self.conn()?;
        Self::load_collection(&conn, collection)
    }

    fn find_by_field(&self, collection: Collection, field: &str, value: &str) -> Result<Vec<Document>> {
        if field == "id" {
            let id = match Uuid::parse_str(value) {
                Ok(id) => id,
                Err(_) => return Ok(Vec::new()),
            };
            return Ok(self.find_by_id(collection, &id)?.into_iter().collect());
        }

        // json_each yields the element rows of an array and a single row for a scalar
        let conn = self.conn()?;
        let path = format!("$.\"{}\"", field.replace('"', ""));
        Self::query_documents(
            &conn,
            "SELECT d.id, d.body FROM documents d
             WHERE d.collection = ?1
               AND EXISTS (SELECT 1 FROM json_each(d.body, ?2) j WHERE CAST(j.value AS TEXT) = ?3)
             ORDER BY d.rowid",
            &[&collection.name(), &path, &value],
        )
    }

    fn count(&self, collection: Collection) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection.name()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn insert(&self, collection: Collection, fields: Fields) -> Result<Uuid> {
        let conn = self.conn()?;
        let document = Document::new(Uuid::new_v4(), fields);
        Self::insert_document(&conn, collection, &document)?;
        Ok(document.id)
    }

    fn replace(&self, collection: Collection, document: &Document) -> Result<bool> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE documents SET body = ?3 WHERE collection = ?1 AND id = ?2",
            params![
                collection.name(),
                document.id.to_string(),
                Self::to_json(&document.fields)?,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    fn remove(&self, collection: Collection, id: &Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.name(), id.to_string()],
        )?;
        Ok(rows_affected > 0)
    }
}
