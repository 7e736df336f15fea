use std::path::Path;

use anyhow::{Result, bail};

use miedit::CallRecord;

pub(crate) fn require_store_path(path: Option<&Path>) -> Result<&Path> {
    match path {
        Some(p) => Ok(p),
        None => bail!("specify --db PATH for this command"),
    }
}

pub(crate) fn print_call_record(record: &CallRecord) {
    println!("name:       {}", record.name);
    println!("defer_fks:  {}", record.defer_fks);
    if let Some(doc) = &record.doc {
        println!("doc:        {doc}");
    }
    println!("sql:        {}", record.sql);
}
