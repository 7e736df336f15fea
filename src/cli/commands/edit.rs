use std::env;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use miedit::{Api, ApiConfig, Backend, DiagnosticBackend, Session, SqliteBackend, open_store};

pub(crate) struct EditFlags {
    pub interactive: bool,
    pub diagnostic: bool,
    pub verbose: bool,
}

pub(crate) fn cmd_edit(
    config: ApiConfig,
    store: Option<&Path>,
    files: &[PathBuf],
    flags: EditFlags,
) -> Result<()> {
    let launch_dir = env::current_dir().context("failed to read the working directory")?;
    let prefix = config.call_prefix.clone();
    let api = Api::load(config)?;

    let backend: Box<dyn Backend> = match store {
        Some(path) => Box::new(SqliteBackend::new(open_store(path)?, prefix)),
        None => {
            info!("no database given, running with the diagnostic backend");
            Box::new(DiagnosticBackend)
        }
    };

    let mut session = Session::new(api, backend, io::stdout(), launch_dir);
    session.set_verbose(flags.verbose);
    session.set_diagnostic(flags.diagnostic);

    let stdin = io::stdin();
    let is_terminal = stdin.is_terminal();
    session.run(files, flags.interactive, is_terminal, stdin.lock())
}
