use super::*;

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["postpulse-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["postpulse-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["postpulse-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn regenerate_defaults_to_real_run_with_config_window() {
    let cli = Cli::try_parse_from(["postpulse-cli", "snapshots", "regenerate", "--user", "u1"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Snapshots {
            command: SnapshotCommands::Regenerate {
                ref user,
                days: None,
                dry_run: false
            }
        }) if user == "u1"
    ));
}

#[test]
fn regenerate_accepts_window_and_dry_run() {
    let cli = Cli::try_parse_from([
        "postpulse-cli",
        "snapshots",
        "regenerate",
        "--user",
        "u1",
        "--days",
        "30",
        "--dry-run",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Snapshots {
            command: SnapshotCommands::Regenerate {
                days: Some(30),
                dry_run: true,
                ..
            }
        })
    ));
}

#[test]
fn regenerate_requires_user() {
    assert!(Cli::try_parse_from(["postpulse-cli", "snapshots", "regenerate"]).is_err());
}

#[test]
fn regenerate_rejects_negative_days() {
    assert!(Cli::try_parse_from([
        "postpulse-cli",
        "snapshots",
        "regenerate",
        "--user",
        "u1",
        "--days",
        "-3",
    ])
    .is_err());
}

#[test]
fn list_parses_status_and_limit() {
    let cli = Cli::try_parse_from([
        "postpulse-cli",
        "snapshots",
        "list",
        "--user",
        "u1",
        "--status",
        "gold",
        "--limit",
        "10",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Snapshots {
            command: SnapshotCommands::List {
                status: Some(ref s),
                limit: Some(10),
                ..
            }
        }) if s == "gold"
    ));
}

#[test]
fn preview_takes_input_path() {
    let cli = Cli::try_parse_from([
        "postpulse-cli",
        "snapshots",
        "preview",
        "--input",
        "export.json",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Snapshots {
            command: SnapshotCommands::Preview { ref input, days: None }
        }) if input == std::path::Path::new("export.json")
    ));
}
