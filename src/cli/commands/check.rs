use anyhow::Result;

use miedit::{Api, ApiConfig};

pub(crate) fn cmd_check(config: ApiConfig, json: bool) -> Result<()> {
    let api = Api::load(config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(api.table())?);
        return Ok(());
    }

    let table = api.table();
    println!(
        "{}: {} types, {} subjects, {} operations",
        api.config().spec_path.display(),
        api.registry().len(),
        table.len(),
        table.operation_count()
    );
    print!("{}", api.help_text());
    Ok(())
}
