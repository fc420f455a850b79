//! Core library: command model, batch grammar, sequencing and configuration.

pub mod command;
pub mod config;
pub mod parse;
pub mod sequencer;

pub use command::{Command, Outcome};
pub use sequencer::{
    AssemblyError, BatchSource, Plan, PlannedCommand, Report, RunSummary, Sequencer,
    SequencerConfig, Step,
};
