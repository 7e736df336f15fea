use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, DatabaseName, OpenFlags, OptionalExtension, params};

/// A backend statement registered under a prefixed call name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRecord {
    pub name: String,
    pub sql: String,
    /// Run with `PRAGMA defer_foreign_keys = ON`.
    pub defer_fks: bool,
    pub doc: Option<String>,
}

pub fn derive_db_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(name);
    if path.extension().is_none() {
        path.set_extension("mi.db");
    }
    path
}

pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

pub fn create_store(path: &Path) -> Result<Connection> {
    ensure_parent_dirs(path)?;
    if path.exists() {
        bail!("database already exists at {}", path.display());
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_READ_WRITE,
    )
    .with_context(|| format!("failed to create {}", path.display()))?;

    configure_pragmas(&conn)?;
    install_schema(&conn)?;
    Ok(conn)
}

pub fn open_store(path: &Path) -> Result<Connection> {
    if !path.exists() {
        bail!("database not found at {}", path.display());
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
        .with_context(|| format!("failed to open {}", path.display()))?;
    configure_pragmas(&conn)?;
    install_schema(&conn)?;
    Ok(conn)
}

pub fn configure_pragmas(conn: &Connection) -> Result<()> {
    conn.pragma_update(Some(DatabaseName::Main), "journal_mode", &"WAL")?;
    conn.pragma_update(Some(DatabaseName::Main), "synchronous", &"NORMAL")?;
    conn.pragma_update(Some(DatabaseName::Main), "foreign_keys", &true)?;
    Ok(())
}

pub fn install_schema(conn: &Connection) -> Result<()> {
    const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS api_call (
  name       TEXT PRIMARY KEY,
  sql        TEXT NOT NULL,
  defer_fks  INTEGER NOT NULL DEFAULT 0,
  doc        TEXT
) WITHOUT ROWID;
"#;

    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Insert or replace a call; returns `true` if the name was new.
pub fn put_call(conn: &Connection, call: &CallRecord) -> Result<bool> {
    let existed = get_call(conn, &call.name)?.is_some();
    conn.execute(
        "INSERT OR REPLACE INTO api_call (name, sql, defer_fks, doc) VALUES (?1, ?2, ?3, ?4)",
        params![call.name, call.sql, call.defer_fks, call.doc],
    )?;
    Ok(!existed)
}

pub fn get_call(conn: &Connection, name: &str) -> Result<Option<CallRecord>> {
    let record = conn
        .query_row(
            "SELECT name, sql, defer_fks, doc FROM api_call WHERE name = ?1",
            params![name],
            |row| {
                Ok(CallRecord {
                    name: row.get(0)?,
                    sql: row.get(1)?,
                    defer_fks: row.get(2)?,
                    doc: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

pub fn list_calls(conn: &Connection, prefix: Option<&str>) -> Result<Vec<CallRecord>> {
    let mut stmt =
        conn.prepare("SELECT name, sql, defer_fks, doc FROM api_call ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(CallRecord {
            name: row.get(0)?,
            sql: row.get(1)?,
            defer_fks: row.get(2)?,
            doc: row.get(3)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        let record = row?;
        if prefix.is_none_or(|p| record.name.starts_with(p)) {
            out.push(record);
        }
    }
    Ok(out)
}
