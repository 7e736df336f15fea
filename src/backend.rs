//! Executes compiled calls. The SQLite backend runs one registered statement
//! per call inside its own transaction.

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql};
use tracing::debug;

use crate::compile::CallDescriptor;
use crate::store;
use crate::value::Value;

/// Result rows rendered as text, with their column headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Rows {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}

pub trait Backend {
    fn execute(&mut self, call: &CallDescriptor) -> Result<Rows>;
}

/// Accepts every call and returns nothing; used when no database is attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiagnosticBackend;

impl Backend for DiagnosticBackend {
    fn execute(&mut self, _call: &CallDescriptor) -> Result<Rows> {
        Ok(Rows::default())
    }
}

pub struct SqliteBackend {
    conn: Connection,
    prefix: String,
}

impl SqliteBackend {
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Text(text) => ToSqlOutput::from(text.as_str()),
            Value::Int(n) => ToSqlOutput::from(*n),
            Value::Float(x) => ToSqlOutput::from(*x),
            Value::Bool(b) => ToSqlOutput::from(*b),
            Value::List(items) => ToSqlOutput::from(
                serde_json::to_string(items)
                    .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?,
            ),
        })
    }
}

fn render_cell(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(n) => n.to_string(),
        ValueRef::Real(x) => x.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

impl Backend for SqliteBackend {
    fn execute(&mut self, call: &CallDescriptor) -> Result<Rows> {
        let full_name = format!("{}{}", self.prefix, call.call_name);
        let record = store::get_call(&self.conn, &full_name)?
            .ok_or_else(|| anyhow!("backend call `{full_name}` is not registered"))?;

        let tx = self.conn.transaction()?;
        if record.defer_fks {
            tx.pragma_update(None, "defer_foreign_keys", true)?;
        }

        let rows = {
            let mut stmt = tx
                .prepare(&record.sql)
                .with_context(|| format!("invalid SQL registered for `{full_name}`"))?;
            for (param, value) in call.params.iter().zip(&call.values) {
                let marker = format!(":{param}");
                let Some(index) = stmt.parameter_index(&marker)? else {
                    bail!("`{full_name}` does not take parameter `{marker}`");
                };
                stmt.raw_bind_parameter(index, value)?;
            }

            let columns: Vec<String> = match &call.output_fields {
                Some(fields) => fields.clone(),
                None => stmt.column_names().into_iter().map(str::to_string).collect(),
            };
            let width = stmt.column_count();
            let mut rows = Vec::new();
            let mut cursor = stmt.raw_query();
            while let Some(row) = cursor.next()? {
                let mut cells = Vec::with_capacity(width);
                for idx in 0..width {
                    cells.push(render_cell(row.get_ref(idx)?));
                }
                rows.push(cells);
            }
            if width == 0 {
                Rows::default()
            } else {
                Rows { columns, rows }
            }
        };

        tx.commit()?;
        debug!(call = full_name.as_str(), rows = rows.rows.len(), "backend call executed");
        Ok(rows)
    }
}
