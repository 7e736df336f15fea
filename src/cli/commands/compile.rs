use anyhow::Result;

use miedit::uiargs::parse_arg_text;
use miedit::{Api, ApiConfig};

pub(crate) fn cmd_compile(config: ApiConfig, op: &str, subject: &str, args: &[String]) -> Result<()> {
    let api = Api::load(config)?;
    let args = parse_arg_text(&args.join(" "))?;
    let call = api.command_to_call(subject, op, &args)?;
    println!("{}", serde_json::to_string_pretty(&call)?);
    Ok(())
}
