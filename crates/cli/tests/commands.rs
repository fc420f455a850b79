use clap::Parser;
use filetagging::args::Cli;
use filetagging::run::{run, Exit};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn invoke(dir: &Path, args: &[&str]) -> (Exit, String, String) {
    let cli = Cli::try_parse_from(std::iter::once("filetagging").chain(args.iter().copied()))
        .unwrap();
    let mut out = Vec::new();
    let mut err = Vec::new();
    let exit = run(&cli, dir.to_path_buf(), &mut out, &mut err).unwrap();
    (
        exit,
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
    )
}

#[test]
fn add_then_ls_prints_tags() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "hello").unwrap();

    let (exit, out, err) = invoke(
        temp.path(),
        &["add", "work", "a.txt", "add", "draft", "a.txt", "ls", "a.txt"],
    );
    assert_eq!(exit, Exit::Success);
    assert_eq!(out, "draft\nwork\n");
    assert!(err.is_empty());
    assert!(temp.path().join("tags.json").exists());
}

#[test]
fn failing_command_does_not_abort_the_run() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("b.txt"), "").unwrap();

    let (exit, out, err) = invoke(
        temp.path(),
        &[
            "add",
            "missing-tag-name",
            "nonexistent.txt",
            "add",
            "t",
            "b.txt",
            "ls",
            "b.txt",
        ],
    );
    assert_eq!(exit, Exit::Failure);
    assert_eq!(out, "t\n");
    assert!(err.starts_with("error: add missing-tag-name nonexistent.txt: no such file"));
}

#[test]
fn batch_files_run_before_direct_commands() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "").unwrap();
    fs::write(temp.path().join("cmds"), "add x a.txt\nls a.txt\n").unwrap();

    let (exit, out, _) = invoke(
        temp.path(),
        &["add", "y", "a.txt", "ls", "a.txt", "-f", "cmds"],
    );
    assert_eq!(exit, Exit::Success);
    assert_eq!(out, "x\nx\ny\n");
}

#[test]
fn mv_keeps_tags() {
    let temp = tempdir().unwrap();
    fs::create_dir(temp.path().join("archive")).unwrap();
    fs::write(temp.path().join("a.txt"), "").unwrap();

    let (exit, out, err) = invoke(
        temp.path(),
        &[
            "add",
            "old",
            "a.txt",
            "mv",
            "a.txt",
            "archive/b.txt",
            "ls",
            "archive/b.txt",
            "ls",
            "a.txt",
        ],
    );
    assert_eq!(exit, Exit::Failure);
    assert_eq!(out, "old\n");
    assert!(err.contains("ls a.txt: no such file or directory"));
    assert!(temp.path().join("archive/b.txt").exists());
    assert!(!temp.path().join("tags.json").exists());
}

#[test]
fn mv_onto_existing_file_conflicts() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "a").unwrap();
    fs::write(temp.path().join("b.txt"), "b").unwrap();

    let (exit, _, err) = invoke(temp.path(), &["mv", "a.txt", "b.txt"]);
    assert_eq!(exit, Exit::Failure);
    assert!(err.contains("destination already exists"));
    assert_eq!(fs::read_to_string(temp.path().join("b.txt")).unwrap(), "b");
}

#[test]
fn operands_may_be_named_like_commands() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("report.txt"), "").unwrap();
    fs::write(temp.path().join("ls"), "").unwrap();

    let (exit, out, err) = invoke(
        temp.path(),
        &[
            "add", "rm", "report.txt", "add", "work", "ls", "mv", "ls", "add", "ls",
            "report.txt", "ls", "./add",
        ],
    );
    assert_eq!(exit, Exit::Success, "{err}");
    assert_eq!(out, "rm\nwork\n");
    assert!(temp.path().join("add").exists());
    assert!(!temp.path().join("ls").exists());
}

#[test]
fn ls_directory_and_filter() {
    let temp = tempdir().unwrap();
    let docs = temp.path().join("docs");
    fs::create_dir(&docs).unwrap();
    for name in ["b.md", "a.md", "c.md"] {
        fs::write(docs.join(name), "").unwrap();
    }

    let (exit, _, _) = invoke(
        temp.path(),
        &["add", "t", "docs/c.md", "add", "t", "docs/a.md", "add", "u", "docs/a.md"],
    );
    assert_eq!(exit, Exit::Success);
    let (exit, out, _) = invoke(temp.path(), &["ls", "docs", "filter", "t", "docs"]);
    assert_eq!(exit, Exit::Success);
    assert_eq!(out, "a.md: t u\nb.md:\nc.md: t\na.md\nc.md\n");

    // Without a directory operand filter looks at the working directory.
    let (exit, out, _) = invoke(&docs, &["filter", "u"]);
    assert_eq!(exit, Exit::Success);
    assert_eq!(out, "a.md\n");
}

#[test]
fn ls_empty_directory_prints_nothing() {
    let temp = tempdir().unwrap();
    let (exit, out, err) = invoke(temp.path(), &["ls"]);
    assert_eq!(exit, Exit::Success);
    assert!(out.is_empty());
    assert!(err.is_empty());
}

#[test]
fn unknown_command_runs_nothing() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "").unwrap();

    let (exit, out, err) = invoke(temp.path(), &["add", "t", "a.txt", "tag", "x"]);
    assert_eq!(exit, Exit::Usage);
    assert!(out.is_empty());
    assert!(err.contains("unrecognized command 'tag'"));
    assert!(!temp.path().join("tags.json").exists());
}

#[test]
fn missing_batch_file_runs_nothing() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "").unwrap();

    let (exit, _, err) = invoke(temp.path(), &["-f", "nope", "add", "t", "a.txt"]);
    assert_eq!(exit, Exit::Usage);
    assert!(err.contains("cannot read batch file nope"));
    assert!(!temp.path().join("tags.json").exists());
}

#[test]
fn malformed_batch_line_is_skipped_by_default() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "").unwrap();
    fs::write(
        temp.path().join("cmds"),
        "# tag everything\nadd one a.txt\nadd 'unterminated a.txt\nadd two a.txt\n",
    )
    .unwrap();

    let (exit, out, err) = invoke(temp.path(), &["-f", "cmds", "ls", "a.txt"]);
    assert_eq!(exit, Exit::Failure);
    assert_eq!(out, "one\ntwo\n");
    assert!(err.contains("cmds:3: unmatched ' quote"));
}

#[test]
fn abort_policy_from_config_runs_nothing() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "").unwrap();
    fs::write(temp.path().join("cmds"), "add one a.txt\nadd\n").unwrap();
    let config = temp.path().join("filetagging.toml");
    fs::write(&config, "[batch]\non_parse_error = \"abort\"\n").unwrap();

    let (exit, out, err) = invoke(
        temp.path(),
        &["-c", config.to_str().unwrap(), "-f", "cmds"],
    );
    assert_eq!(exit, Exit::Usage);
    assert!(out.is_empty());
    assert!(err.contains("cmds:2:"));
    assert!(!temp.path().join("tags.json").exists());
}

#[test]
fn custom_sidecar_name_from_config() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "").unwrap();
    let config = temp.path().join("filetagging.toml");
    fs::write(&config, "[store]\nsidecar_name = \".filetags\"\n").unwrap();

    let (exit, out, _) = invoke(
        temp.path(),
        &["-c", config.to_str().unwrap(), "add", "t", "a.txt", "ls"],
    );
    assert_eq!(exit, Exit::Success);
    assert!(temp.path().join(".filetags").exists());
    assert!(!temp.path().join("tags.json").exists());
    assert_eq!(out, "a.txt: t\nfiletagging.toml:\n");
}

#[test]
fn json_output_has_one_record_per_command() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "").unwrap();

    let (exit, out, _) = invoke(
        temp.path(),
        &["--json", "add", "t", "a.txt", "ls", "a.txt"],
    );
    assert_eq!(exit, Exit::Success);
    let records: Vec<serde_json::Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["result"]["kind"], "done");
    assert_eq!(records[1]["command"], "ls a.txt");
    assert_eq!(records[1]["result"]["tags"], serde_json::json!(["t"]));
}

#[test]
fn no_arguments_prints_usage() {
    let temp = tempdir().unwrap();
    let (exit, out, _) = invoke(temp.path(), &[]);
    assert_eq!(exit, Exit::Success);
    assert!(out.contains("Usage:"));
}
