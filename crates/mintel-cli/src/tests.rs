use clap::Parser;

use super::*;
use crate::requests::RequestsCommands;
use crate::worker::WorkerCommands;

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["mintel-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["mintel-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_worker_run_once() {
    let cli = Cli::try_parse_from(["mintel-cli", "worker", "run-once"]).expect("valid args");
    assert!(matches!(
        cli.command,
        Some(Commands::Worker {
            command: WorkerCommands::RunOnce
        })
    ));
}

#[test]
fn parses_sweep_stale_override() {
    let cli = Cli::try_parse_from([
        "mintel-cli",
        "worker",
        "sweep-stale",
        "--older-than-secs",
        "120",
    ])
    .expect("valid args");
    assert!(matches!(
        cli.command,
        Some(Commands::Worker {
            command: WorkerCommands::SweepStale {
                older_than_secs: Some(120)
            }
        })
    ));
}

#[test]
fn requests_list_defaults() {
    let cli = Cli::try_parse_from(["mintel-cli", "requests", "list"]).expect("valid args");
    match cli.command {
        Some(Commands::Requests {
            command: RequestsCommands::List { status, limit },
        }) => {
            assert!(status.is_none());
            assert_eq!(limit, 20);
        }
        other => panic!("unexpected parse: {other:?}"),
    }
}

#[test]
fn decode_reads_stdin_by_default() {
    let cli = Cli::try_parse_from(["mintel-cli", "decode"]).expect("valid args");
    assert!(matches!(
        cli.command,
        Some(Commands::Decode { ref path }) if path == "-"
    ));
}

#[test]
fn decode_file_round_trip() {
    let dir = std::env::temp_dir().join(format!("mintel-cli-decode-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let file = dir.join("completion.txt");

    std::fs::write(&file, "Aquí está:\n```json\n{\"a\": [1, 2,],}\n```").expect("write");
    assert!(decode::run_decode(file.to_str().expect("utf8 path")).is_ok());

    std::fs::write(&file, "{\"a\": [1, 2").expect("write");
    let err = decode::run_decode(file.to_str().expect("utf8 path")).unwrap_err();
    assert!(err.to_string().starts_with("incomplete"));

    std::fs::remove_dir_all(&dir).ok();
}
