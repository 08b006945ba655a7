mod schema;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;
use crate::secrets;

/// Errors from [`Database::share_model`].
#[derive(Debug, Error)]
pub enum ShareError {
    /// The model the share derives from does not exist.
    #[error("Parent model not found: {0}")]
    DanglingParent(Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "modelshare")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("modelshare.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Model operations
    // ============================================================

    /// Store a seed model. A seed has no parent and is its own visibility root.
    pub fn create_model(&self, input: CreateModelInput) -> Result<Model> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO models (id, code, derivation_of, original, created_at)
             VALUES (?, ?, NULL, ?, ?)",
            (
                id.to_string(),
                &input.code,
                id.to_string(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Model {
            id,
            code: input.code,
            derivation_of: None,
            original: Some(id),
            created_at: now,
        })
    }

    pub fn get_model(&self, id: Uuid) -> Result<Option<Model>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let model = conn
            .query_row(
                "SELECT id, code, derivation_of, original, created_at
                 FROM models WHERE id = ?",
                [id.to_string()],
                model_from_row,
            )
            .optional()?;
        Ok(model)
    }

    /// Models derived directly from `id`, oldest first.
    pub fn get_derivations(&self, id: Uuid) -> Result<Vec<Model>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, code, derivation_of, original, created_at
             FROM models WHERE derivation_of = ? ORDER BY created_at",
        )?;

        let models = stmt
            .query_map([id.to_string()], model_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(models)
    }

    /// The derivation chain from `id` back to its seed, starting with `id`.
    ///
    /// Returns an empty list when `id` does not exist. The walk stops at the
    /// first missing or already visited ancestor.
    pub fn get_lineage(&self, id: Uuid) -> Result<Vec<ModelSummary>> {
        let mut lineage = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(id);

        while let Some(current) = next {
            if !visited.insert(current) {
                tracing::warn!("Derivation cycle detected at model {}", current);
                break;
            }
            let Some(model) = self.get_model(current)? else {
                break;
            };
            next = model.derivation_of;
            lineage.push(ModelSummary::from(model));
        }

        Ok(lineage)
    }

    pub fn count_models(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM models", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ============================================================
    // Link operations
    // ============================================================

    pub fn get_link(&self, id: Uuid) -> Result<Option<Link>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let link = conn
            .query_row(
                "SELECT id, model_id, private, created_at FROM links WHERE id = ?",
                [id.to_string()],
                link_from_row,
            )
            .optional()?;
        Ok(link)
    }

    pub fn get_links_for_model(&self, model_id: Uuid) -> Result<Vec<Link>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, model_id, private, created_at
             FROM links WHERE model_id = ? ORDER BY private",
        )?;

        let links = stmt
            .query_map([model_id.to_string()], link_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }

    pub fn count_links(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Resolve a link to its model.
    ///
    /// Private links see the full source. Public links see the source with
    /// every secret region removed.
    pub fn resolve_link(&self, id: Uuid) -> Result<Option<ResolvedLink>> {
        let Some(link) = self.get_link(id)? else {
            return Ok(None);
        };
        let model = self
            .get_model(link.model_id)?
            .ok_or_else(|| anyhow::anyhow!("Model not found for link {}", id))?;

        let code = if link.private {
            model.code
        } else {
            secrets::redact(&model.code)
        };

        Ok(Some(ResolvedLink {
            link_id: link.id,
            model_id: model.id,
            private: link.private,
            code,
            original: model.original,
        }))
    }

    // ============================================================
    // Sharing
    // ============================================================

    /// Persist a shared derivation of `input.current_model_id`.
    ///
    /// Always creates one public link. Code containing a secret region also
    /// gets a private link and becomes its own visibility root; otherwise the
    /// new model inherits the parent's root. A named parent must exist, with
    /// or without secrets. All rows are written in one transaction, so a
    /// failure leaves no trace.
    pub fn share_model(&self, input: ShareInput) -> Result<ShareResult, ShareError> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let model_id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        let inherited = match input.current_model_id {
            Some(parent) => Some(parent_original(&tx, parent)?),
            None => None,
        };
        let has_secret = secrets::contains_secret(&input.code);
        let original = if has_secret {
            Some(model_id)
        } else {
            inherited.unwrap_or(Some(model_id))
        };

        tx.execute(
            "INSERT INTO models (id, code, derivation_of, original, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                model_id.to_string(),
                &input.code,
                input.current_model_id.map(|u| u.to_string()),
                original.map(|u| u.to_string()),
                &now,
            ),
        )?;

        let public = insert_link(&tx, model_id, false, &now)?;
        let private = if has_secret {
            Some(insert_link(&tx, model_id, true, &now)?)
        } else {
            None
        };

        tx.commit()?;

        tracing::info!(
            model = %model_id,
            parent = ?input.current_model_id,
            private = private.is_some(),
            "Shared model"
        );

        Ok(ShareResult {
            public,
            private,
            last_id: model_id,
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn insert_link(
    tx: &Transaction<'_>,
    model_id: Uuid,
    private: bool,
    now: &str,
) -> rusqlite::Result<Uuid> {
    let id = Uuid::new_v4();
    tx.execute(
        "INSERT INTO links (id, model_id, private, created_at) VALUES (?, ?, ?, ?)",
        (
            id.to_string(),
            model_id.to_string(),
            if private { 1 } else { 0 },
            now,
        ),
    )?;
    Ok(id)
}

fn parent_original(tx: &Transaction<'_>, parent: Uuid) -> Result<Option<Uuid>, ShareError> {
    tx.query_row(
        "SELECT original FROM models WHERE id = ?",
        [parent.to_string()],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()?
    .map(|original| original.map(parse_uuid))
    .ok_or(ShareError::DanglingParent(parent))
}

fn model_from_row(row: &Row<'_>) -> rusqlite::Result<Model> {
    Ok(Model {
        id: parse_uuid(row.get::<_, String>(0)?),
        code: row.get(1)?,
        derivation_of: row.get::<_, Option<String>>(2)?.map(parse_uuid),
        original: row.get::<_, Option<String>>(3)?.map(parse_uuid),
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        id: parse_uuid(row.get::<_, String>(0)?),
        model_id: parse_uuid(row.get::<_, String>(1)?),
        private: row.get::<_, i32>(2)? != 0,
        created_at: parse_datetime(row.get::<_, String>(3)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
