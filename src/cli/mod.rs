mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use miedit::ApiConfig;

#[derive(Parser)]
#[command(name = "miedit", version, about = "Command-line model editor driven by a vocabulary file")]
struct Cli {
    /// Path to an existing editor database
    #[arg(short = 'D', long = "db", global = true, value_name = "PATH", env = "MIEDIT_DB")]
    store: Option<PathBuf>,

    #[command(flatten)]
    api: ApiArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ApiArgs {
    /// Vocabulary file defining types and commands
    #[arg(
        long = "spec",
        global = true,
        value_name = "PATH",
        env = "MIEDIT_SPEC",
        default_value = "resources/api_def.mi"
    )]
    spec: PathBuf,

    /// Name shown in the command listing
    #[arg(long = "api-name", global = true, default_value = "miUML Editor")]
    name: String,

    /// Prefix the backend puts in front of every call name
    #[arg(long = "call-prefix", global = true, default_value = "UI_")]
    call_prefix: String,
}

impl ApiArgs {
    fn config(&self) -> ApiConfig {
        ApiConfig {
            name: self.name.clone(),
            call_prefix: self.call_prefix.clone(),
            spec_path: self.spec.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a new editor database initialised with schema and PRAGMAs
    New {
        /// Project name or path for the database file
        name: String,
    },
    /// Manage backend statements registered for calls
    Call {
        #[command(subcommand)]
        command: CallCommand,
    },
    /// Build the command table and report what it contains
    Check {
        /// Print the resolved table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compile one command and print the resulting call as JSON
    Compile {
        op: String,
        subject: String,
        /// Arguments in editor syntax, e.g. -ph Air Traffic Control
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run an editor session
    Edit {
        /// Command files to run before anything else
        files: Vec<PathBuf>,
        /// Prompt for commands after the files have run
        #[arg(short, long)]
        interactive: bool,
        /// Print calls instead of executing them
        #[arg(short, long)]
        diagnostic: bool,
        /// Print calls before executing them
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Subcommand)]
enum CallCommand {
    /// Register or replace the statement behind a call
    Add {
        /// Full call name including its prefix, e.g. UI_new_domain
        name: String,
        /// Statement with `:param` placeholders
        #[arg(long)]
        sql: String,
        /// Defer foreign key checks until commit
        #[arg(long = "defer-fks")]
        defer_fks: bool,
        /// Optional documentation string
        #[arg(long)]
        doc: Option<String>,
    },
    /// List registered calls
    List {
        #[arg(long = "prefix")]
        prefix: Option<String>,
    },
    /// Show one registered call
    Show { name: String },
}

pub(crate) fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.api.config();

    match cli.command {
        Command::New { name } => commands::cmd_new(&name),
        Command::Call { command } => {
            let store_path = commands::require_store_path(cli.store.as_deref())?;
            commands::cmd_call(store_path, command)
        }
        Command::Check { json } => commands::cmd_check(config, json),
        Command::Compile { op, subject, args } => {
            commands::cmd_compile(config, &op, &subject, &args)
        }
        Command::Edit {
            files,
            interactive,
            diagnostic,
            verbose,
        } => commands::cmd_edit(
            config,
            cli.store.as_deref(),
            &files,
            commands::EditFlags {
                interactive,
                diagnostic,
                verbose,
            },
        ),
    }
}
