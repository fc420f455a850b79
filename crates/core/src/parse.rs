//! Command grammar shared by direct arguments and batch files.
//!
//! ```text
//! ls [<target>]
//! filter <tag> [<directory>]
//! add <tag> <file>
//! rm <tag> <file>
//! mv <source> <destination>
//! ```
//!
//! Required operands are taken by position, whatever they spell. Optional
//! operands are taken only when the next token is not itself a command name.

use crate::command::Command;
use std::iter::Peekable;
use std::path::PathBuf;
use storage::Tag;
use thiserror::Error;

pub const COMMAND_NAMES: [&str; 5] = ["ls", "filter", "add", "rm", "mv"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unrecognized command '{0}'")]
    UnknownCommand(String),
    #[error("'{command}' expects {usage}")]
    MissingOperand {
        command: &'static str,
        usage: &'static str,
    },
    #[error("'{0}': tag must not be empty")]
    EmptyTag(&'static str),
    #[error("unmatched {0} quote")]
    UnmatchedQuote(char),
    #[error("backslash at end of line")]
    DanglingEscape,
}

fn is_command_name(token: &str) -> bool {
    COMMAND_NAMES.contains(&token)
}

/// Splits a batch line into tokens.
///
/// Whitespace separates tokens and a backslash takes the next character
/// literally. `'...'` and `"..."` end the current token and yield their
/// contents verbatim as a token of their own, so `a'b c'd` is three tokens.
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut token = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                if !token.is_empty() {
                    tokens.push(std::mem::take(&mut token));
                }
                let mut quoted = String::new();
                loop {
                    match chars.next() {
                        Some(q) if q == c => break,
                        Some(other) => quoted.push(other),
                        None => return Err(ParseError::UnmatchedQuote(c)),
                    }
                }
                tokens.push(quoted);
            }
            '\\' => {
                let escaped = chars.next().ok_or(ParseError::DanglingEscape)?;
                token.push(escaped);
            }
            c if c.is_whitespace() => {
                if !token.is_empty() {
                    tokens.push(std::mem::take(&mut token));
                }
            }
            c => token.push(c),
        }
    }
    if !token.is_empty() {
        tokens.push(token);
    }
    Ok(tokens)
}

/// Parses one batch line. Blank lines and `#` comments yield no commands.
pub fn parse_line(line: &str) -> Result<Vec<Command>, ParseError> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(Vec::new());
    }
    parse_commands(tokenize(line)?)
}

/// Parses a token stream into commands, in order.
pub fn parse_commands<I>(tokens: I) -> Result<Vec<Command>, ParseError>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut tokens = tokens.into_iter().map(Into::into).peekable();
    let mut commands = Vec::new();

    while let Some(word) = tokens.next() {
        let command = match word.as_str() {
            "ls" => Command::List {
                target: optional(&mut tokens),
            },
            "filter" => {
                const USAGE: &str = "<tag> [<directory>]";
                let tag = tag_operand(&mut tokens, "filter", USAGE)?;
                Command::Filter {
                    tag,
                    target: optional(&mut tokens),
                }
            }
            "add" => {
                const USAGE: &str = "<tag> <file>";
                let tag = tag_operand(&mut tokens, "add", USAGE)?;
                let path = required(&mut tokens, "add", USAGE)?.into();
                Command::Add { tag, path }
            }
            "rm" => {
                const USAGE: &str = "<tag> <file>";
                let tag = tag_operand(&mut tokens, "rm", USAGE)?;
                let path = required(&mut tokens, "rm", USAGE)?.into();
                Command::Remove { tag, path }
            }
            "mv" => {
                const USAGE: &str = "<source> <destination>";
                let source = required(&mut tokens, "mv", USAGE)?.into();
                let destination = required(&mut tokens, "mv", USAGE)?.into();
                Command::Move {
                    source,
                    destination,
                }
            }
            _ => return Err(ParseError::UnknownCommand(word)),
        };
        commands.push(command);
    }
    Ok(commands)
}

fn optional<I: Iterator<Item = String>>(tokens: &mut Peekable<I>) -> Option<PathBuf> {
    tokens
        .next_if(|t| !is_command_name(t))
        .map(PathBuf::from)
}

fn required<I: Iterator<Item = String>>(
    tokens: &mut Peekable<I>,
    command: &'static str,
    usage: &'static str,
) -> Result<String, ParseError> {
    tokens
        .next()
        .ok_or(ParseError::MissingOperand { command, usage })
}

fn tag_operand<I: Iterator<Item = String>>(
    tokens: &mut Peekable<I>,
    command: &'static str,
    usage: &'static str,
) -> Result<Tag, ParseError> {
    let raw = required(tokens, command, usage)?;
    Tag::new(raw).map_err(|_| ParseError::EmptyTag(command))
}

/// Renders a token so that `tokenize` reads it back unchanged.
pub fn quote(token: &str) -> String {
    let plain = !token.is_empty()
        && !token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\'));
    if plain {
        return token.to_string();
    }
    if !token.contains('\'') {
        return format!("'{token}'");
    }
    if !token.contains('"') {
        return format!("\"{token}\"");
    }
    let mut out = String::with_capacity(token.len() + 4);
    for c in token.chars() {
        if c.is_whitespace() || matches!(c, '\'' | '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
