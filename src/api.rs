//! The application vocabulary loaded from a specification document.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::compile::{CallCompiler, CallDescriptor};
use crate::error::CommandError;
use crate::focus::FocusStore;
use crate::resolve::resolve;
use crate::section::{self, SpecDocument};
use crate::table::{CommandTable, build_draft};
use crate::types::TypeRegistry;
use crate::value::{ArgMap, Value};

pub const TYPES_SECTION: &str = "types";
pub const COMMANDS_SECTION: &str = "commands";

#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Display name, e.g. "miUML Editor".
    pub name: String,
    /// Prefix the backend puts in front of every call name.
    pub call_prefix: String,
    pub spec_path: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            name: "miUML Editor".to_string(),
            call_prefix: "UI_".to_string(),
            spec_path: PathBuf::from("resources/api_def.mi"),
        }
    }
}

/// Build the registry and resolved command table from a parsed document.
pub fn build(doc: &SpecDocument) -> Result<(TypeRegistry, CommandTable), CommandError> {
    let registry = TypeRegistry::parse(doc.require(TYPES_SECTION)?)?;
    let draft = build_draft(doc.require(COMMANDS_SECTION)?)?;
    let table = resolve(&draft, &registry)?;
    debug!(types = registry.len(), subjects = table.len(), "api built");
    Ok((registry, table))
}

pub struct Api {
    config: ApiConfig,
    registry: TypeRegistry,
    table: CommandTable,
    defaults: FocusStore,
}

impl Api {
    pub fn load(config: ApiConfig) -> Result<Self> {
        let doc = section::read_document(&config.spec_path)?;
        Ok(Self::from_document(config, &doc)?)
    }

    pub fn from_document(config: ApiConfig, doc: &SpecDocument) -> Result<Self, CommandError> {
        let (registry, table) = build(doc)?;
        Ok(Self {
            config,
            registry,
            table,
            defaults: FocusStore::default(),
        })
    }

    /// Re-read the specification. The current table stays live unless the
    /// new one builds completely.
    pub fn refresh(&mut self) -> Result<()> {
        let doc = section::read_document(&self.config.spec_path)?;
        self.replace_from(&doc)?;
        Ok(())
    }

    pub fn replace_from(&mut self, doc: &SpecDocument) -> Result<(), CommandError> {
        let (registry, table) = build(doc)?;
        self.registry = registry;
        self.table = table;
        self.defaults.retain_valid(&self.table, &self.registry);
        info!(
            subjects = self.table.len(),
            focus_values = self.defaults.len(),
            "command table refreshed"
        );
        Ok(())
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn compiler(&self) -> CallCompiler<'_> {
        CallCompiler::new(&self.table, &self.registry, &self.defaults)
    }

    pub fn command_to_call(&self, subject: &str, op: &str, args: &ArgMap) -> Result<CallDescriptor, CommandError> {
        self.compiler().compile(subject, op, args)
    }

    pub fn get_default(&self, subject: &str) -> Result<(String, Option<&Value>), CommandError> {
        self.defaults.get_default(&self.table, subject)
    }

    pub fn get_all_defaults(&self) -> Vec<(String, &Value)> {
        self.defaults.all_defaults(&self.table)
    }

    pub fn set_default(&mut self, subject: &str, value: Value) -> Result<(), CommandError> {
        self.defaults.set_default(&self.table, &self.registry, subject, value)
    }

    pub fn clear_default(&mut self, subject: Option<&str>) -> Result<(), CommandError> {
        self.defaults.clear_default(&self.table, subject)
    }

    pub fn help_text(&self) -> String {
        self.table.help_text(&self.config.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::section::parse_document;
    use std::io::Write;

    fn sample_api() -> Result<Api> {
        let doc = parse_document(fixtures::SAMPLE_SPEC)?;
        Ok(Api::from_document(ApiConfig::default(), &doc)?)
    }

    #[test]
    fn defaults_flow_into_calls() -> Result<()> {
        let mut api = sample_api()?;
        api.set_default("domain", Value::text("ATC"))?;
        let call = api.command_to_call("c", "attach", &ArgMap::new())?;
        assert_eq!(call.values, vec![Value::text("ATC")]);
        assert_eq!(api.get_all_defaults().len(), 1);
        api.clear_default(None)?;
        assert_eq!(api.get_default("domain")?.1, None);
        Ok(())
    }

    #[test]
    fn help_lists_subjects_and_usage() -> Result<()> {
        let api = sample_api()?;
        let help = api.help_text();
        assert!(help.starts_with("miUML Editor Commands\n---\n"));
        assert!(help.contains("domain / d:\n   new domain -ph <name> [-alias <short_name>]\n"));
        assert!(help.trim_end().ends_with("---"));
        Ok(())
    }

    #[test]
    fn failed_refresh_keeps_the_old_table() -> Result<()> {
        let mut api = sample_api()?;
        let before = api.table().clone();
        let broken = parse_document("[types]\nname : string\n[commands]\ndomain : name\n")?;
        assert!(api.replace_from(&broken).is_err());
        assert_eq!(api.table(), &before);
        Ok(())
    }

    #[test]
    fn refresh_keeps_focus_values_that_still_fit() -> Result<()> {
        let mut api = sample_api()?;
        api.set_default("domain", Value::text("ATC"))?;
        api.set_default("paint", Value::text("red"))?;
        let next = parse_document(
            "[types]\nname : string\ncolor : [green|blue]\n[commands]\ndomain : name\n  new : new_domain\npaint : color\n  use : use_color\n",
        )?;
        api.replace_from(&next)?;
        assert_eq!(api.get_default("domain")?.1, Some(&Value::text("ATC")));
        assert_eq!(api.get_default("paint")?.1, None);
        Ok(())
    }

    #[test]
    fn bundled_vocabulary_builds() -> Result<()> {
        let config = ApiConfig {
            spec_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources/api_def.mi"),
            ..ApiConfig::default()
        };
        let api = Api::load(config)?;
        assert!(api.table().subject("sub").is_some());
        let call = api.command_to_call("r", "delete", &ArgMap::from([
            ("r".to_string(), Value::text("12")),
            ("d".to_string(), Value::text("ATC")),
        ]))?;
        assert_eq!(call.params, vec!["rnum", "domain"]);
        assert_eq!(call.values, vec![Value::Int(12), Value::text("ATC")]);
        Ok(())
    }

    #[test]
    fn load_and_refresh_from_disk() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "{}", fixtures::SAMPLE_SPEC)?;
        let config = ApiConfig {
            spec_path: file.path().to_path_buf(),
            ..ApiConfig::default()
        };
        let mut api = Api::load(config)?;
        assert!(api.table().subject("class").is_some());

        let mut rewritten = std::fs::File::create(file.path())?;
        write!(rewritten, "[types]\nname : string\n[commands]\nzone : name\n  new : new_zone\n")?;
        drop(rewritten);
        api.refresh()?;
        assert!(api.table().subject("class").is_none());
        assert!(api.table().subject("zone").is_some());
        Ok(())
    }
}
