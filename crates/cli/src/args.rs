use clap::Parser;

const COMMANDS_HELP: &str = "\
Commands:
  ls [<file>|<directory>]     List the tags of a file, or of every file in a directory
  filter <tag> [<directory>]  List files tagged with a tag
  add <tag> <file>            Add a tag to a file
  rm <tag> <file>             Remove a tag from a file
  mv <source> <destination>   Move or rename a tagged file

Commands run in the order given; commands from batch files run first.
Put `--` before the commands if an operand starts with '-'.";

#[derive(Parser, Debug)]
#[command(name = "filetagging", version)]
#[command(about = "Manage tags on files", long_about = None)]
#[command(after_help = COMMANDS_HELP)]
pub struct Cli {
    /// Execute commands from a batch file ("-" reads standard input); may be repeated
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub files: Vec<String>,

    /// Path to config TOML
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print one JSON object per command result
    #[arg(long)]
    pub json: bool,

    /// Commands to run, e.g. `add work report.pdf ls report.pdf`
    #[arg(value_name = "COMMANDS")]
    pub commands: Vec<String>,
}
