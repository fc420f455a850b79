//! Rendering of command results.
//!
//! Outcomes go to the output stream, failures and skipped batch lines to the
//! error stream.

use filetagging_core::sequencer::{Origin, PlannedCommand, Report, SkippedLine};
use filetagging_core::Outcome;
use serde::Serialize;
use std::io::{self, Write};
use storage::StoreError;

fn location(origin: &Origin) -> Option<String> {
    match origin {
        Origin::Batch { source, line } => Some(format!("{}:{}", source, line)),
        Origin::Direct => None,
    }
}

/// Plain text, one item per line.
pub struct TextReporter<O, E> {
    out: O,
    err: E,
}

impl<O: Write, E: Write> TextReporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }
}

impl<O: Write, E: Write> Report for TextReporter<O, E> {
    fn outcome(&mut self, _planned: &PlannedCommand, outcome: &Outcome) -> io::Result<()> {
        match outcome {
            Outcome::Tags { tags } => {
                for tag in tags {
                    writeln!(self.out, "{}", tag)?;
                }
            }
            Outcome::Listing { files } => {
                for file in files {
                    if file.tags.is_empty() {
                        writeln!(self.out, "{}:", file.name)?;
                    } else {
                        let tags: Vec<&str> = file.tags.iter().map(|t| t.as_str()).collect();
                        writeln!(self.out, "{}: {}", file.name, tags.join(" "))?;
                    }
                }
            }
            Outcome::Files { files } => {
                for name in files {
                    writeln!(self.out, "{}", name)?;
                }
            }
            Outcome::Done => {}
        }
        Ok(())
    }

    fn failure(&mut self, planned: &PlannedCommand, error: &StoreError) -> io::Result<()> {
        match location(&planned.origin) {
            Some(at) => writeln!(self.err, "error: {}: {}: {}", at, planned.command, error),
            None => writeln!(self.err, "error: {}: {}", planned.command, error),
        }
    }

    fn skipped(&mut self, line: &SkippedLine) -> io::Result<()> {
        writeln!(
            self.err,
            "error: {}:{}: {} (line skipped)",
            line.source, line.line, line.error
        )
    }
}

#[derive(Debug, Serialize)]
struct Record<'a> {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// One JSON object per line.
pub struct JsonReporter<O, E> {
    out: O,
    err: E,
}

impl<O: Write, E: Write> JsonReporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }
}

fn write_record<W: Write, T: Serialize>(w: &mut W, record: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *w, record)?;
    writeln!(w)
}

impl<O: Write, E: Write> Report for JsonReporter<O, E> {
    fn outcome(&mut self, planned: &PlannedCommand, outcome: &Outcome) -> io::Result<()> {
        let record = Record {
            command: planned.command.to_string(),
            origin: location(&planned.origin),
            ok: true,
            result: Some(outcome),
            error: None,
        };
        write_record(&mut self.out, &record)
    }

    fn failure(&mut self, planned: &PlannedCommand, error: &StoreError) -> io::Result<()> {
        let record = Record {
            command: planned.command.to_string(),
            origin: location(&planned.origin),
            ok: false,
            result: None,
            error: Some(error.to_string()),
        };
        write_record(&mut self.err, &record)
    }

    fn skipped(&mut self, line: &SkippedLine) -> io::Result<()> {
        let record = serde_json::json!({
            "origin": format!("{}:{}", line.source, line.line),
            "ok": false,
            "error": line.error.to_string(),
        });
        write_record(&mut self.err, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetagging_core::Command;
    use std::path::PathBuf;
    use storage::{Tag, TagSet, TaggedFile};

    fn planned(origin: Origin) -> PlannedCommand {
        PlannedCommand {
            command: Command::List {
                target: Some("docs".into()),
            },
            origin,
        }
    }

    fn tags(names: &[&str]) -> TagSet {
        names.iter().map(|n| Tag::new(*n).unwrap()).collect()
    }

    #[test]
    fn text_listing_format() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let outcome = Outcome::Listing {
            files: vec![
                TaggedFile {
                    name: "a.txt".into(),
                    tags: TagSet::new(),
                },
                TaggedFile {
                    name: "b.txt".into(),
                    tags: tags(&["x", "y"]),
                },
            ],
        };
        TextReporter::new(&mut out, &mut err)
            .outcome(&planned(Origin::Direct), &outcome)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a.txt:\nb.txt: x y\n");
        assert!(err.is_empty());
    }

    #[test]
    fn text_failure_names_batch_line() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let origin = Origin::Batch {
            source: "cmds".into(),
            line: 3,
        };
        TextReporter::new(&mut out, &mut err)
            .failure(
                &planned(origin),
                &StoreError::NotFound(PathBuf::from("docs")),
            )
            .unwrap();
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "error: cmds:3: ls docs: no such file or directory: docs\n"
        );
        assert!(out.is_empty());
    }

    #[test]
    fn json_outcome_record() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        JsonReporter::new(&mut out, &mut err)
            .outcome(
                &planned(Origin::Direct),
                &Outcome::Tags {
                    tags: tags(&["work"]),
                },
            )
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "command": "ls docs",
                "ok": true,
                "result": {"kind": "tags", "tags": ["work"]}
            })
        );
    }
}
