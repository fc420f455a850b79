use crate::args::Cli;
use crate::output::{JsonReporter, TextReporter};
use anyhow::{Context, Result};
use clap::CommandFactory;
use filetagging_core::config;
use filetagging_core::{BatchSource, Sequencer, SequencerConfig};
use std::io::Write;
use std::path::PathBuf;
use storage::SidecarStore;
use tracing::debug;

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Every command succeeded.
    Success,
    /// At least one command or batch line failed.
    Failure,
    /// Nothing ran: bad arguments, unreadable batch file or bad configuration.
    Usage,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Success => 0,
            Exit::Failure => 1,
            Exit::Usage => 2,
        }
    }
}

/// Runs one invocation. `working_dir` anchors relative paths and is the
/// default target of `ls` and `filter`.
///
/// Configuration errors are returned as `Err`; everything else is reported
/// on `out`/`err` and folded into the returned [`Exit`].
pub fn run<O: Write, E: Write>(
    cli: &Cli,
    working_dir: PathBuf,
    mut out: O,
    mut err: E,
) -> Result<Exit> {
    if cli.files.is_empty() && cli.commands.is_empty() {
        writeln!(out, "{}", Cli::command().render_usage())?;
        return Ok(Exit::Success);
    }

    let cfg = config::load(cli.config.as_deref()).context("loading configuration")?;
    debug!(?cfg, working_dir = %working_dir.display(), "starting");

    let sequencer = Sequencer::new(SequencerConfig {
        working_dir,
        on_parse_error: cfg.batch.on_parse_error,
    });
    let batches: Vec<BatchSource> = cli
        .files
        .iter()
        .map(|f| BatchSource::from(f.as_str()))
        .collect();

    let plan = match sequencer.assemble(&batches, &cli.commands) {
        Ok(plan) => plan,
        Err(e) => {
            writeln!(err, "error: {}", e)?;
            writeln!(err, "Try 'filetagging --help' for more information.")?;
            return Ok(Exit::Usage);
        }
    };

    let store = SidecarStore::new(cfg.store.sidecar_name);
    let summary = if cli.json {
        sequencer.execute(plan, &store, &mut JsonReporter::new(&mut out, &mut err))?
    } else {
        sequencer.execute(plan, &store, &mut TextReporter::new(&mut out, &mut err))?
    };
    out.flush()?;

    Ok(if summary.is_success() {
        Exit::Success
    } else {
        Exit::Failure
    })
}
