//! Editor session: reads command lines, handles the editor's own commands,
//! and sends application commands through the call compiler to a backend.

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::api::Api;
use crate::backend::{Backend, Rows};
use crate::error::{COMMAND_USAGE, CommandError};
use crate::uiargs::{ItemShape, parse_arg_text, parse_items};

pub const EXIT_WORDS: [&str; 5] = ["q", "quit", "exit", "ciao", "bye"];
pub const PROMPT: &str = "* ";

const FOCUS_USAGE: &str = "focus [-c [<subject>] | -s <subject> [-v <value>]]";
const READ_USAGE: &str = "read -f <file>";

const UI_HELP: &str = "\
Editor commands
---
help, h                          this listing
focus, f                         list focus values
focus -c [<subject>]             clear one or all focus values
focus -s <subject> [-v <value>]  show or set a focus value
refresh, r                       reload the command vocabulary
read, run -f <file>              run commands from a file
diagnostic, d                    toggle diagnostic mode (print calls, skip execution)
verbose, v                       toggle verbose mode (print calls before execution)
";

/// How lines reach the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Standard input is not a terminal: no prompt.
    Piped,
    /// Prompt before every line.
    Interactive,
}

/// Whether the session should keep reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Session<W: Write> {
    api: Api,
    backend: Box<dyn Backend>,
    out: W,
    verbose: bool,
    diagnostic: bool,
    launch_dir: PathBuf,
}

impl<W: Write> Session<W> {
    pub fn new(api: Api, backend: Box<dyn Backend>, out: W, launch_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            backend,
            out,
            verbose: false,
            diagnostic: false,
            launch_dir: launch_dir.into(),
        }
    }

    pub fn set_verbose(&mut self, on: bool) {
        self.verbose = on;
    }

    pub fn set_diagnostic(&mut self, on: bool) {
        self.diagnostic = on;
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Run command files in order, then read from `input`.
    ///
    /// A failing file ends the run with an error unless `interactive` is set,
    /// in which case the session moves on to the prompt.
    pub fn run<R: BufRead>(
        &mut self,
        files: &[PathBuf],
        interactive: bool,
        stdin_is_terminal: bool,
        input: R,
    ) -> Result<()> {
        for file in files {
            match self.run_file(file) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => return Ok(()),
                Err(err) => {
                    self.report(&err)?;
                    if !interactive {
                        bail!("command file {} failed", file.display());
                    }
                }
            }
        }
        if !files.is_empty() && !interactive {
            return Ok(());
        }

        let mode = if interactive || stdin_is_terminal {
            Mode::Interactive
        } else {
            Mode::Piped
        };
        self.run_lines(input, mode)
    }

    /// Read lines until EOF or an exit word; errors are reported and skipped.
    pub fn run_lines<R: BufRead>(&mut self, mut input: R, mode: Mode) -> Result<()> {
        let mut line = String::new();
        loop {
            if mode == Mode::Interactive {
                write!(self.out, "{PROMPT}")?;
                self.out.flush()?;
            }
            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            match self.execute_line(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(err) => self.report(&err)?,
            }
        }
        Ok(())
    }

    /// Run a command file, stopping at the first failing line.
    pub fn run_file(&mut self, path: &Path) -> Result<Flow> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read command file {}", path.display()))?;
        info!(file = %path.display(), "running command file");
        writeln!(self.out, "Reading file: {}", path.display())?;
        match self.run_file_lines(path, &contents) {
            Ok(flow) => {
                writeln!(self.out, "End of file: {}", path.display())?;
                Ok(flow)
            }
            Err(err) => {
                writeln!(self.out, "Aborted file: {}", path.display())?;
                Err(err)
            }
        }
    }

    fn run_file_lines(&mut self, path: &Path, contents: &str) -> Result<Flow> {
        for (idx, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            writeln!(self.out, "{PROMPT}{trimmed}")?;
            let flow = self
                .execute_line(trimmed)
                .with_context(|| format!("{}:{}", path.display(), idx + 1))?;
            if flow == Flow::Exit {
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    pub fn execute_line(&mut self, line: &str) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        if EXIT_WORDS.contains(&line) {
            return Ok(Flow::Exit);
        }

        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match word {
            "help" | "h" => {
                write!(self.out, "{UI_HELP}")?;
                writeln!(self.out, "exit words: {}\n", EXIT_WORDS.join(", "))?;
                write!(self.out, "{}", self.api.help_text())?;
            }
            "focus" | "f" => self.focus(rest)?,
            "refresh" | "r" => {
                self.api.refresh()?;
                writeln!(
                    self.out,
                    "reloaded {} subjects from {}",
                    self.api.table().len(),
                    self.api.config().spec_path.display()
                )?;
            }
            "read" | "run" => return self.read(rest),
            "diagnostic" | "d" => {
                self.diagnostic = !self.diagnostic;
                writeln!(self.out, "diagnostic mode {}", on_off(self.diagnostic))?;
            }
            "verbose" | "v" => {
                self.verbose = !self.verbose;
                writeln!(self.out, "verbose mode {}", on_off(self.verbose))?;
            }
            op => self.application(op, rest)?,
        }
        Ok(Flow::Continue)
    }

    fn application(&mut self, op: &str, rest: &str) -> Result<()> {
        let (subject, arg_text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if subject.is_empty() {
            return Err(CommandError::Syntax(COMMAND_USAGE.to_string()).into());
        }
        let args = parse_arg_text(arg_text)?;
        let call = self.api.command_to_call(subject, op, &args)?;

        if self.verbose || self.diagnostic {
            writeln!(self.out, "{}", call.display(&self.api.config().call_prefix))?;
        }
        if self.diagnostic {
            debug!(call = call.call_name.as_str(), "diagnostic mode, call not executed");
            return Ok(());
        }
        let rows = self.backend.execute(&call)?;
        self.print_rows(&rows)
    }

    fn print_rows(&mut self, rows: &Rows) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let header = rows.columns.join("\t");
        writeln!(self.out, "{header}")?;
        writeln!(self.out, "{}", "=".repeat(header.chars().count()))?;
        for row in &rows.rows {
            writeln!(self.out, "{}", row.join("\t"))?;
        }
        Ok(())
    }

    fn focus(&mut self, rest: &str) -> Result<()> {
        let items = parse_items(rest)?;
        let usage = || CommandError::Syntax(FOCUS_USAGE.to_string());

        match items.as_slice() {
            [] => {
                let defaults = self.api.get_all_defaults();
                if defaults.is_empty() {
                    writeln!(self.out, "no focus values set")?;
                }
                for (subject, value) in defaults {
                    writeln!(self.out, "{subject}: {value}")?;
                }
            }
            [clear] if clear.name == "c" && clear.shape != ItemShape::List => {
                let subject = clear.value.as_text();
                self.api.clear_default(subject)?;
                match subject {
                    Some(subject) => writeln!(self.out, "cleared focus for {subject}")?,
                    None => writeln!(self.out, "cleared all focus values")?,
                }
            }
            [show] if show.name == "s" => {
                let subject = show.value.as_text().ok_or_else(usage)?;
                let (name, value) = self.api.get_default(subject)?;
                match value {
                    Some(value) => writeln!(self.out, "{name}: {value}")?,
                    None => writeln!(self.out, "{name}: <none>")?,
                }
            }
            [set, value] if set.name == "s" && value.name == "v" && value.shape != ItemShape::Flag => {
                let subject = set.value.as_text().ok_or_else(usage)?;
                self.api.set_default(subject, value.value.clone())?;
                let (name, stored) = self.api.get_default(subject)?;
                if let Some(stored) = stored {
                    writeln!(self.out, "{name}: {stored}")?;
                }
            }
            _ => return Err(usage().into()),
        }
        Ok(())
    }

    fn read(&mut self, rest: &str) -> Result<Flow> {
        let items = parse_items(rest)?;
        let file = match items.as_slice() {
            [file] if file.name == "f" => file.value.as_text(),
            _ => None,
        };
        let Some(file) = file else {
            return Err(CommandError::Syntax(READ_USAGE.to_string()).into());
        };
        let path = Path::new(file);
        let path = if path.is_relative() {
            self.launch_dir.join(path)
        } else {
            path.to_path_buf()
        };
        self.run_file(&path)
    }

    fn report(&mut self, err: &anyhow::Error) -> Result<()> {
        debug!("command failed: {err:#}");
        writeln!(self.out, "error: {err:#}")?;
        Ok(())
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;
    use crate::backend::DiagnosticBackend;
    use crate::compile::CallDescriptor;
    use crate::fixtures;
    use crate::section::parse_document;
    use crate::value::Value;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Records calls and answers every one with the same rows.
    struct Recorder {
        calls: Rc<RefCell<Vec<CallDescriptor>>>,
        rows: Rows,
    }

    impl Backend for Recorder {
        fn execute(&mut self, call: &CallDescriptor) -> Result<Rows> {
            self.calls.borrow_mut().push(call.clone());
            Ok(self.rows.clone())
        }
    }

    fn api() -> Result<Api> {
        let doc = parse_document(fixtures::SAMPLE_SPEC)?;
        Ok(Api::from_document(ApiConfig::default(), &doc)?)
    }

    fn session(launch_dir: &Path) -> Result<Session<Vec<u8>>> {
        Ok(Session::new(api()?, Box::new(DiagnosticBackend), Vec::new(), launch_dir))
    }

    fn recording(rows: Rows) -> Result<(Session<Vec<u8>>, Rc<RefCell<Vec<CallDescriptor>>>)> {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let backend = Recorder {
            calls: Rc::clone(&calls),
            rows,
        };
        let session = Session::new(api()?, Box::new(backend), Vec::new(), ".");
        Ok((session, calls))
    }

    fn output<W: Write + AsRef<[u8]>>(session: &Session<W>) -> String {
        String::from_utf8_lossy(session.output().as_ref()).into_owned()
    }

    #[test]
    fn focus_commands() -> Result<()> {
        let mut session = session(Path::new("."))?;
        session.execute_line("focus")?;
        session.execute_line("f -s d -v ATC")?;
        session.execute_line("focus -s domain")?;
        session.execute_line("focus -c domain")?;
        session.execute_line("focus -s domain")?;
        let text = output(&session);
        assert!(text.starts_with("no focus values set\n"));
        assert!(text.contains("domain: ATC\ndomain: ATC\ncleared focus for domain\ndomain: <none>\n"));
        Ok(())
    }

    #[test]
    fn focus_argument_shapes_are_checked() -> Result<()> {
        let mut session = session(Path::new("."))?;
        let err = session.execute_line("focus -v ATC").unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommandError>(),
            Some(&CommandError::Syntax(FOCUS_USAGE.to_string()))
        );
        assert!(session.execute_line("focus -s model -v x").is_err());
        Ok(())
    }

    #[test]
    fn calls_run_through_the_backend() -> Result<()> {
        let rows = Rows {
            columns: vec!["name".into(), "alias".into()],
            rows: vec![vec!["Air Traffic Control".into(), "ATC".into()]],
        };
        let (mut session, calls) = recording(rows)?;
        session.execute_line("getall d")?;
        session.execute_line("new domain -ph Air Traffic Control -alias ATC")?;

        let calls = calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].call_name, "new_domain");
        assert_eq!(
            calls[1].values,
            vec![Value::text("Air Traffic Control"), Value::text("ATC")]
        );
        assert!(output(&session).starts_with("name\talias\n==========\nAir Traffic Control\tATC\n"));
        Ok(())
    }

    #[test]
    fn diagnostic_mode_prints_and_skips() -> Result<()> {
        let (mut session, calls) = recording(Rows::default())?;
        session.execute_line("d")?;
        session.execute_line("new domain -ph ATC")?;
        session.execute_line("diagnostic")?;
        session.execute_line("verbose")?;
        session.execute_line("new domain -ph ATC")?;

        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(
            output(&session),
            "diagnostic mode on\nUI_new_domain(p_phrase:='ATC')\ndiagnostic mode off\nverbose mode on\nUI_new_domain(p_phrase:='ATC')\n"
        );
        Ok(())
    }

    #[test]
    fn malformed_command_lines() -> Result<()> {
        let mut session = session(Path::new("."))?;
        let err = session.execute_line("new").unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommandError>(),
            Some(&CommandError::Syntax(COMMAND_USAGE.to_string()))
        );
        let err = session.execute_line("fly domain").unwrap_err();
        assert!(matches!(err.downcast_ref::<CommandError>(), Some(CommandError::BadOp { .. })));
        Ok(())
    }

    #[test]
    fn piped_input_reports_errors_and_continues() -> Result<()> {
        let mut session = session(Path::new("."))?;
        let input = Cursor::new("new ghost\nverbose\nbye\nverbose\n");
        session.run_lines(input, Mode::Piped)?;
        assert_eq!(
            output(&session),
            "error: unknown subject `ghost`\nverbose mode on\n"
        );
        Ok(())
    }

    #[test]
    fn interactive_mode_prompts() -> Result<()> {
        let mut session = session(Path::new("."))?;
        session.run_lines(Cursor::new("v\n"), Mode::Interactive)?;
        assert_eq!(output(&session), "* verbose mode on\n* ");
        Ok(())
    }

    #[test]
    fn help_lists_editor_and_application_commands() -> Result<()> {
        let mut session = session(Path::new("."))?;
        session.execute_line("h")?;
        let text = output(&session);
        assert!(text.contains("exit words: q, quit, exit, ciao, bye"));
        assert!(text.contains("miUML Editor Commands"));
        Ok(())
    }

    #[test]
    fn command_files_resolve_against_launch_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("setup.mi"), "# setup\nf -s d -v ATC\n\nverbose\n")?;
        let mut session = session(dir.path())?;
        session.execute_line("read -f setup.mi")?;
        let path = dir.path().join("setup.mi");
        assert_eq!(
            output(&session),
            format!(
                "Reading file: {0}\n* f -s d -v ATC\ndomain: ATC\n* verbose\nverbose mode on\nEnd of file: {0}\n",
                path.display()
            )
        );
        assert!(session.execute_line("run").is_err());
        Ok(())
    }

    #[test]
    fn failing_file_stops_batch_run() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let bad = dir.path().join("bad.mi");
        let never = dir.path().join("never.mi");
        fs::write(&bad, "verbose\nnew ghost\nverbose\n")?;
        fs::write(&never, "verbose\n")?;

        let mut session = session(dir.path())?;
        let result = session.run(&[bad.clone(), never], false, false, Cursor::new(""));
        assert!(result.is_err());
        let text = output(&session);
        assert!(text.contains(&format!("error: {}:2: unknown subject `ghost`", bad.display())));
        assert_eq!(text.matches("verbose mode").count(), 1);
        assert!(text.contains(&format!("* new ghost\nAborted file: {}\nerror:", bad.display())));
        assert!(!text.contains("End of file"));
        Ok(())
    }

    #[test]
    fn interactive_flag_survives_failing_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let bad = dir.path().join("bad.mi");
        fs::write(&bad, "new ghost\n")?;
        let mut session = session(dir.path())?;
        session.run(&[bad], true, false, Cursor::new("quit\n"))?;
        assert!(output(&session).ends_with("* "));
        Ok(())
    }

    #[test]
    fn failed_refresh_keeps_session_usable() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "[types]\nname : string\n[commands]\ndomain : name\n")?;
        let config = ApiConfig {
            spec_path: file.path().to_path_buf(),
            ..ApiConfig::default()
        };
        let doc = parse_document(fixtures::SAMPLE_SPEC)?;
        let api = Api::from_document(config, &doc)?;
        let mut session = Session::new(api, Box::new(DiagnosticBackend), Vec::new(), ".");

        let input = Cursor::new("refresh\nd\nnew domain -ph ATC\n");
        session.run_lines(input, Mode::Piped)?;
        let text = output(&session);
        assert!(text.starts_with("error: grammar error"));
        assert!(text.ends_with("UI_new_domain(p_phrase:='ATC')\n"));
        Ok(())
    }
}
