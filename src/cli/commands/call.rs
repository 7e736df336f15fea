use std::path::Path;

use anyhow::{Result, anyhow};

use miedit::store::{get_call, list_calls, put_call};
use miedit::{CallRecord, open_store};

use super::util::print_call_record;
use crate::cli::CallCommand;

pub(crate) fn cmd_call(store: &Path, command: CallCommand) -> Result<()> {
    match command {
        CallCommand::Add {
            name,
            sql,
            defer_fks,
            doc,
        } => {
            let conn = open_store(store)?;
            let record = CallRecord {
                name,
                sql,
                defer_fks,
                doc,
            };
            if put_call(&conn, &record)? {
                println!("registered call `{}`", record.name);
            } else {
                println!("replaced call `{}`", record.name);
            }
        }
        CallCommand::List { prefix } => {
            let conn = open_store(store)?;
            let calls = list_calls(&conn, prefix.as_deref())?;
            if calls.is_empty() {
                println!("no calls registered");
            }
            for call in calls {
                match call.doc {
                    Some(doc) => println!("{} -- {doc}", call.name),
                    None => println!("{}", call.name),
                }
            }
        }
        CallCommand::Show { name } => {
            let conn = open_store(store)?;
            let record = get_call(&conn, &name)?.ok_or_else(|| anyhow!("call `{name}` not found"))?;
            print_call_record(&record);
        }
    }
    Ok(())
}
