use super::*;
use crate::query::configured_name;
use crate::run::Selection;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["rivalwatch", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_prune_days() {
    let cli = Cli::try_parse_from(["rivalwatch", "db", "prune", "--days", "90"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Prune { days: 90 }
        })
    ));
}

#[test]
fn db_prune_requires_days() {
    assert!(Cli::try_parse_from(["rivalwatch", "db", "prune"]).is_err());
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["rivalwatch"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn run_defaults_to_all_competitors() {
    let cli = Cli::try_parse_from(["rivalwatch", "run"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Run {
            ref competitors,
            category: None,
            no_notify: false,
            dry_run: false,
        }) if competitors.is_empty()
    ));
}

#[test]
fn run_accepts_repeated_competitors_and_flags() {
    let cli = Cli::try_parse_from([
        "rivalwatch",
        "run",
        "--competitor",
        "Linear",
        "--competitor",
        "notion",
        "--no-notify",
        "--dry-run",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Run {
            ref competitors,
            no_notify: true,
            dry_run: true,
            ..
        }) if competitors == &["Linear", "notion"]
    ));
}

#[test]
fn history_requires_competitor_and_defaults_days() {
    assert!(Cli::try_parse_from(["rivalwatch", "history"]).is_err());

    let cli = Cli::try_parse_from(["rivalwatch", "history", "--competitor", "Figma"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::History { ref competitor, days: 30 }) if competitor == "Figma"
    ));
}

#[test]
fn trend_accepts_days() {
    let cli = Cli::try_parse_from(["rivalwatch", "trend", "--competitor", "Slack", "--days", "7"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Trend { days: 7, .. })
    ));
}

#[test]
fn leaderboard_defaults() {
    let cli = Cli::try_parse_from(["rivalwatch", "leaderboard"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Leaderboard {
            per_competitor: 1,
            notify: false
        })
    ));
}

#[test]
fn truncate_marks_cut_text() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("abcdefghij", 4), "abcd...");
}

// ---------------------------------------------------------------------------
// Competitor selection
// ---------------------------------------------------------------------------

fn competitors_file() -> rivalwatch_core::CompetitorsFile {
    rivalwatch_core::parse_competitors(
        r"
competitors:
  - name: Linear
    url: https://linear.app/changelog
    category: Project Management
  - name: Notion
    url: https://www.notion.so/releases
    category: Productivity
  - name: Asana
    url: https://asana.com/product/whats-new
    category: Project Management
",
    )
    .expect("valid competitors yaml")
}

fn names(selected: &[rivalwatch_core::CompetitorConfig]) -> Vec<&str> {
    selected.iter().map(|c| c.name.as_str()).collect()
}

#[test]
fn empty_selection_keeps_file_order() {
    let selected = Selection::default().resolve(&competitors_file()).unwrap();
    assert_eq!(names(&selected), ["Linear", "Notion", "Asana"]);
}

#[test]
fn selection_by_name_is_case_insensitive_and_keeps_file_order() {
    let selection = Selection {
        names: vec!["asana".to_string(), "LINEAR".to_string()],
        category: None,
    };
    let selected = selection.resolve(&competitors_file()).unwrap();
    assert_eq!(names(&selected), ["Linear", "Asana"]);
}

#[test]
fn selection_by_category() {
    let selection = Selection {
        names: vec![],
        category: Some("project management".to_string()),
    };
    let selected = selection.resolve(&competitors_file()).unwrap();
    assert_eq!(names(&selected), ["Linear", "Asana"]);
}

#[test]
fn unknown_competitor_is_an_error() {
    let selection = Selection {
        names: vec!["Basecamp".to_string()],
        category: None,
    };
    let err = selection.resolve(&competitors_file()).unwrap_err();
    assert!(err.to_string().contains("Basecamp"));
}

#[test]
fn disjoint_name_and_category_is_an_error() {
    let selection = Selection {
        names: vec!["Notion".to_string()],
        category: Some("Project Management".to_string()),
    };
    assert!(selection.resolve(&competitors_file()).is_err());
}

#[test]
fn history_and_trend_names_resolve_to_the_configured_spelling() {
    let file = competitors_file();
    assert_eq!(configured_name(&file, "linear").unwrap(), "Linear");
    assert_eq!(configured_name(&file, "  NOTION ").unwrap(), "Notion");

    let err = configured_name(&file, "Basecamp").unwrap_err();
    assert_eq!(err.to_string(), "competitor 'Basecamp' is not configured");
}
