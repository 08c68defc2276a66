//! Worker invocation building and launching.
//!
//! Invocation building is pure (strategy + options -> argument list) so
//! it can be tested without spawning anything; the `WorkerLauncher` trait
//! is the seam where tests substitute their own worker programs.

use std::io;
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::config::WorkerSettings;
use crate::models::{Job, Strategy};

/// A fully-built worker invocation: program plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Build the invocation for a job.
    ///
    /// Basic strategy: `<program> --delay=<n> <items...>`. Advanced adds
    /// `--chunk-size=<n>` before the item list. When an interpreter is
    /// configured the program becomes its first argument.
    pub fn for_job(job: &Job, settings: &WorkerSettings) -> Self {
        let script = match job.options.strategy {
            Strategy::Basic => &settings.basic_program,
            Strategy::Advanced => &settings.advanced_program,
        };

        let (program, mut args) = if settings.interpreter.is_empty() {
            (script.clone(), Vec::new())
        } else {
            (settings.interpreter.clone(), vec![script.clone()])
        };

        args.push(format!("--delay={}", job.options.delay_seconds));
        if job.options.strategy == Strategy::Advanced {
            args.push(format!("--chunk-size={}", job.options.chunk_size));
        }
        args.extend(job.items.iter().cloned());

        Self { program, args }
    }
}

impl std::fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

/// Seam between invocation building and process creation.
pub trait WorkerLauncher: Send + Sync {
    /// Spawn the worker with piped stdout/stderr.
    fn spawn(&self, command: &WorkerCommand) -> io::Result<Child>;
}

/// Launches the configured worker program as a real subprocess.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl WorkerLauncher for ProcessLauncher {
    fn spawn(&self, command: &WorkerCommand) -> io::Result<Child> {
        Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobOptions;

    fn job(strategy: Strategy, items: &[&str]) -> Job {
        Job::new(
            "job_1_0".to_string(),
            "owner",
            items.iter().map(|s| s.to_string()).collect(),
            JobOptions {
                delay_seconds: 8,
                chunk_size: 5,
                strategy,
            },
        )
    }

    #[test]
    fn basic_command_has_delay_and_items() {
        let settings = WorkerSettings::default();
        let command = WorkerCommand::for_job(&job(Strategy::Basic, &["v1", "v2"]), &settings);

        assert_eq!(command.program, "python3");
        assert_eq!(
            command.args,
            vec!["get_batch_transcripts.py", "--delay=8", "v1", "v2"]
        );
    }

    #[test]
    fn advanced_command_adds_chunk_size() {
        let settings = WorkerSettings::default();
        let command = WorkerCommand::for_job(&job(Strategy::Advanced, &["v1", "v2", "v3"]), &settings);

        assert_eq!(command.program, "python3");
        assert_eq!(
            command.args,
            vec![
                "get_batch_transcripts_advanced.py",
                "--delay=8",
                "--chunk-size=5",
                "v1",
                "v2",
                "v3"
            ]
        );
    }

    #[test]
    fn empty_interpreter_runs_program_directly() {
        let settings = WorkerSettings {
            interpreter: String::new(),
            basic_program: "/opt/workers/extract.sh".to_string(),
            ..WorkerSettings::default()
        };
        let command = WorkerCommand::for_job(&job(Strategy::Basic, &["v1"]), &settings);

        assert_eq!(command.program, "/opt/workers/extract.sh");
        assert_eq!(command.args, vec!["--delay=8", "v1"]);
    }
}
