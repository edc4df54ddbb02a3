//! Duplication of the real process streams.
//!
//! Runs without the libtest harness: the harness captures `println!` per test
//! and prints its own progress on stdout, both of which would hide or pollute
//! what reaches the log file.

#[cfg(unix)]
fn main() {
    use std::process::Command;

    use signal_toolbox::ToolboxError;
    use signal_toolbox::utilities::{WriteMode, duplicate_stdout_stream_to_file};

    let tmp = tempfile::tempdir().unwrap();
    let log_path = tmp.path().join("run.log");
    let read_log = || std::fs::read_to_string(&log_path).unwrap();

    let logs = duplicate_stdout_stream_to_file("run", tmp.path(), WriteMode::Write, true).unwrap();
    assert_eq!(logs.log_path(), log_path);
    assert!(logs.records_errors());

    println!("printed via println");
    eprintln!("reported via eprintln");
    let status = Command::new("sh").args(["-c", "echo from a child process"]).status().unwrap();
    assert!(status.success());

    let busy = duplicate_stdout_stream_to_file("other", tmp.path(), WriteMode::Write, false);
    assert!(matches!(busy, Err(ToolboxError::StreamBusy("stdout"))));
    assert!(!tmp.path().join("other.log").exists());

    logs.suppress().unwrap();
    let first = read_log();
    assert!(first.contains("printed via println\n"), "log was {first:?}");
    assert!(first.contains("reported via eprintln\n"), "log was {first:?}");
    assert!(first.contains("from a child process\n"), "log was {first:?}");

    println!("printed after suppress");
    assert_eq!(read_log(), first);

    let logs = duplicate_stdout_stream_to_file("run", tmp.path(), WriteMode::Append, false).unwrap();
    assert!(!logs.records_errors());
    print!("second run");
    eprintln!("not recorded");
    drop(logs);

    let second = read_log();
    assert!(second.starts_with(&first));
    assert!(second.ends_with("second run"), "log was {second:?}");
    assert!(!second.contains("not recorded"));

    let custom = duplicate_stdout_stream_to_file("trace.txt", tmp.path(), WriteMode::Write, false).unwrap();
    assert_eq!(custom.log_path(), tmp.path().join("trace.txt"));
    println!("into the custom file");
    custom.suppress().unwrap();
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("trace.txt")).unwrap(),
        "into the custom file\n"
    );

    println!("stream duplication: ok");
}

#[cfg(not(unix))]
fn main() {}
