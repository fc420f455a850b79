//! Orders batch and direct commands into a single plan and runs it.
//!
//! Batch files are read and parsed completely before anything executes.
//! Their commands come first, in file order and then line order, followed by
//! the direct commands in argument order. Skipped batch lines keep their
//! place in that order.

use crate::command::{Command, Outcome};
use crate::config::ParseErrorPolicy;
use crate::parse::{self, ParseError};
use serde::Serialize;
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use storage::{StoreError, TagStore};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    Stdin,
    File(PathBuf),
}

impl From<&str> for BatchSource {
    fn from(arg: &str) -> Self {
        if arg == "-" {
            BatchSource::Stdin
        } else {
            BatchSource::File(PathBuf::from(arg))
        }
    }
}

impl fmt::Display for BatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchSource::Stdin => f.write_str("<stdin>"),
            BatchSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Batch { source: String, line: usize },
    Direct,
}

#[derive(Debug, Clone)]
pub struct PlannedCommand {
    pub command: Command,
    pub origin: Origin,
}

/// A batch line dropped under [`ParseErrorPolicy::Skip`].
#[derive(Debug, Clone)]
pub struct SkippedLine {
    pub source: String,
    pub line: usize,
    pub error: ParseError,
}

#[derive(Debug, Clone)]
pub enum Step {
    Run(PlannedCommand),
    Skip(SkippedLine),
}

/// Steps in execution order.
#[derive(Debug, Default)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn commands(&self) -> impl Iterator<Item = &PlannedCommand> {
        self.steps.iter().filter_map(|step| match step {
            Step::Run(planned) => Some(planned),
            Step::Skip(_) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedLine> {
        self.steps.iter().filter_map(|step| match step {
            Step::Skip(line) => Some(line),
            Step::Run(_) => None,
        })
    }
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Usage(#[from] ParseError),
    #[error("cannot read batch file {origin}: {error}")]
    BatchRead {
        origin: String,
        #[source]
        error: io::Error,
    },
    #[error("{origin}:{line}: {error}")]
    BatchLine {
        origin: String,
        line: usize,
        #[source]
        error: ParseError,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Receives per-command results during execution.
pub trait Report {
    fn outcome(&mut self, planned: &PlannedCommand, outcome: &Outcome) -> io::Result<()>;
    fn failure(&mut self, planned: &PlannedCommand, error: &StoreError) -> io::Result<()>;
    fn skipped(&mut self, line: &SkippedLine) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Base for relative paths and default target of `ls`/`filter`.
    pub working_dir: PathBuf,
    pub on_parse_error: ParseErrorPolicy,
}

pub struct Sequencer {
    config: SequencerConfig,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Builds the execution plan. Fails without running anything when the
    /// direct arguments do not parse or a batch source cannot be read.
    pub fn assemble(
        &self,
        batches: &[BatchSource],
        direct: &[String],
    ) -> Result<Plan, AssemblyError> {
        let direct = parse::parse_commands(direct.iter().cloned())?;

        let mut plan = Plan::default();
        for source in batches {
            let text = self.read_batch(source).map_err(|error| AssemblyError::BatchRead {
                origin: source.to_string(),
                error,
            })?;
            self.add_batch(&mut plan, &source.to_string(), &text)?;
        }

        plan.steps.extend(direct.into_iter().map(|command| {
            Step::Run(PlannedCommand {
                command,
                origin: Origin::Direct,
            })
        }));
        info!(
            commands = plan.commands().count(),
            skipped = plan.skipped().count(),
            "assembled plan"
        );
        Ok(plan)
    }

    /// Appends the commands of one batch text to `plan`.
    pub fn add_batch(&self, plan: &mut Plan, origin: &str, text: &str) -> Result<(), AssemblyError> {
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            match parse::parse_line(line) {
                Ok(commands) => plan.steps.extend(commands.into_iter().map(|command| {
                    Step::Run(PlannedCommand {
                        command,
                        origin: Origin::Batch {
                            source: origin.to_string(),
                            line: line_no,
                        },
                    })
                })),
                Err(error) => match self.config.on_parse_error {
                    ParseErrorPolicy::Abort => {
                        return Err(AssemblyError::BatchLine {
                            origin: origin.to_string(),
                            line: line_no,
                            error,
                        })
                    }
                    ParseErrorPolicy::Skip => {
                        warn!(source = origin, line = line_no, %error, "skipping batch line");
                        plan.steps.push(Step::Skip(SkippedLine {
                            source: origin.to_string(),
                            line: line_no,
                            error,
                        }));
                    }
                },
            }
        }
        Ok(())
    }

    fn read_batch(&self, source: &BatchSource) -> io::Result<String> {
        match source {
            BatchSource::Stdin => {
                let mut text = String::new();
                io::stdin().lock().read_to_string(&mut text)?;
                Ok(text)
            }
            BatchSource::File(path) => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    self.config.working_dir.join(path)
                };
                std::fs::read_to_string(path)
            }
        }
    }

    /// Runs every planned command in order. A failing command or skipped line
    /// is reported and execution moves on; only reporter I/O errors stop the
    /// run.
    pub fn execute<S, R>(&self, plan: Plan, store: &S, reporter: &mut R) -> io::Result<RunSummary>
    where
        S: TagStore + ?Sized,
        R: Report + ?Sized,
    {
        let mut summary = RunSummary::default();
        for step in &plan.steps {
            let planned = match step {
                Step::Run(planned) => planned,
                Step::Skip(line) => {
                    reporter.skipped(line)?;
                    summary.failed += 1;
                    continue;
                }
            };
            match planned.command.execute(store, &self.config.working_dir) {
                Ok(outcome) => {
                    reporter.outcome(planned, &outcome)?;
                    summary.succeeded += 1;
                }
                Err(error) => {
                    warn!(command = %planned.command, %error, "command failed");
                    reporter.failure(planned, &error)?;
                    summary.failed += 1;
                }
            }
        }
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "run finished"
        );
        Ok(summary)
    }
}
