//! Purpose: `symco-reset` CLI entry point and the linear reset flow.
//! Role: Binary crate root; parses args, reports the file set, gates deletion.
//! Invariants: Confirmation is skipped only by `--force` or when nothing exists.
//! Invariants: Cancellation is a normal termination path with exit code 0.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `core::error::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use clap::{Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod confirm;

use confirm::{CONFIRM_PHRASE, read_confirmation};
use symco_reset::core::error::{Error, ErrorKind, to_exit_code};
use symco_reset::core::fileset::{DbFile, DbFileSet, FileStatus};
use symco_reset::core::reset::{ResetOutcome, reset_files};

const RESTART_COMMAND: &str = "uvicorn app:app --host 0.0.0.0 --port 8000 --reload";

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    init_tracing();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                return Ok(RunOutcome::ok());
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `symco-reset --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    execute(cli, color_mode)
        .map_err(add_io_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "symco-reset",
    version,
    about = "Reset the local symco database by deleting its SQLite files",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Deletes symco.db, symco.db-wal, and symco.db-shm after a typed
confirmation. The symco server is never stopped or checked for;
stop it yourself before resetting.
"#,
    after_help = r#"EXAMPLES
  $ symco-reset                      # report, prompt, then delete
  $ symco-reset --force              # skip the confirmation prompt
  $ symco-reset --dir /srv/symco     # files live somewhere else
  $ symco-reset --force --json       # machine-readable outcome

NOTES
  - Confirmation requires typing DELETE exactly; anything else cancels (exit 0)
  - Absent files are reported and skipped; deleting nothing is not an error
  - Restart the server afterwards: uvicorn app:app --host 0.0.0.0 --port 8000 --reload"#
)]
struct Cli {
    #[arg(
        long,
        help = "Directory containing the database files (default: .)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(long, help = "Skip the typed confirmation prompt")]
    force: bool,
    #[arg(long, help = "Emit JSON instead of human-readable output")]
    json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

fn execute(cli: Cli, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    let base_dir = cli.dir.unwrap_or_else(|| PathBuf::from("."));
    let set = DbFileSet::at(&base_dir);

    let mut statuses = Vec::with_capacity(set.files().len());
    for file in set.files() {
        statuses.push(file.status()?);
    }

    if !cli.json {
        println!("SYMCO database reset");
        println!("This permanently deletes the local symco database files.");
        println!("Stop the symco server before continuing; this tool does not check for one.");
        println!();
        emit_file_report(set.files(), &statuses);
        println!();
    }

    let present_count = statuses.iter().filter(|status| status.is_present()).count();
    if present_count == 0 {
        if cli.json {
            let entries = file_entries(set.files(), &statuses);
            emit_json(&reset_envelope(&base_dir, entries, false, None));
        } else {
            println!("Nothing to delete.");
        }
        return Ok(RunOutcome::ok());
    }

    if !cli.force {
        eprint!("Type {CONFIRM_PHRASE} to confirm (anything else cancels): ");
        let confirmed = read_confirmation(&mut io::stdin().lock())?;
        if !confirmed {
            if cli.json {
                let entries = file_entries(set.files(), &statuses);
                emit_json(&reset_envelope(&base_dir, entries, true, None));
            } else {
                println!("Cancelled. No files were deleted.");
            }
            return Ok(RunOutcome::ok());
        }
    }

    let outcome = hint_failures(reset_files(&set));

    if cli.json {
        let entries = file_entries(set.files(), &statuses);
        emit_json(&reset_envelope(&base_dir, entries, false, Some(&outcome)));
    } else {
        for file in &outcome.deleted {
            println!("Deleted {}", file.name);
        }
        for (_, err) in &outcome.failed {
            emit_error(err, color_mode);
        }
        if outcome.failed.is_empty() {
            println!();
            println!("Reset complete. Restart the symco server to recreate an empty database:");
            println!("  {RESTART_COMMAND}");
        } else {
            println!(
                "Deleted {} of {} files.",
                outcome.deleted.len(),
                present_count
            );
        }
    }

    match outcome.first_error_kind() {
        Some(kind) => Ok(RunOutcome::with_code(to_exit_code(kind))),
        None => Ok(RunOutcome::ok()),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Permission => err.with_hint(
            "Permission denied. Check file ownership and directory permissions.",
        ),
        ErrorKind::Io => err.with_hint("I/O error. Check the path and filesystem."),
        _ => err,
    }
}

fn hint_failures(outcome: ResetOutcome) -> ResetOutcome {
    ResetOutcome {
        deleted: outcome.deleted,
        failed: outcome
            .failed
            .into_iter()
            .map(|(file, err)| (file, add_io_hint(err)))
            .collect(),
    }
}

const REPORT_HEADERS: [&str; 3] = ["FILE", "STATUS", "MODIFIED"];

fn emit_file_report(files: &[DbFile], statuses: &[FileStatus]) {
    let rows = files
        .iter()
        .zip(statuses)
        .map(|(file, status)| {
            [
                file.name.clone(),
                status_cell(file, *status),
                modified_cell(file, *status),
            ]
        })
        .collect::<Vec<_>>();
    println!("{}", render_report(&rows));
}

fn render_report(rows: &[[String; 3]]) -> String {
    let mut widths = REPORT_HEADERS.map(str::len);
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let header_row = REPORT_HEADERS.map(str::to_string);
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_report_line(&header_row, &widths));
    for row in rows {
        lines.push(format_report_line(row, &widths));
    }
    lines.join("\n")
}

fn format_report_line(cells: &[String; 3], widths: &[usize; 3]) -> String {
    let mut line = String::new();
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        let pad = widths[idx].saturating_sub(cell.chars().count());
        if idx + 1 < cells.len() && pad > 0 {
            line.push_str(&" ".repeat(pad));
        }
    }
    line
}

fn status_cell(file: &DbFile, status: FileStatus) -> String {
    match status {
        FileStatus::Present { size_bytes, .. } if file.role.reports_size() => {
            format_bytes(size_bytes)
        }
        FileStatus::Present { .. } => "present".to_string(),
        FileStatus::Absent => "not found".to_string(),
    }
}

fn modified_cell(file: &DbFile, status: FileStatus) -> String {
    match status {
        FileStatus::Present {
            modified: Some(modified),
            ..
        } if file.role.reports_size() => {
            format_system_time(modified).unwrap_or_else(|| "-".to_string())
        }
        _ => "-".to_string(),
    }
}

fn format_bytes(value: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * 1024 * 1024;
    if value < KIB {
        return value.to_string();
    }
    let (unit, suffix) = if value >= GIB {
        (GIB, "G")
    } else if value >= MIB {
        (MIB, "M")
    } else {
        (KIB, "K")
    };
    if value.is_multiple_of(unit) {
        return format!("{}{}", value / unit, suffix);
    }
    format!("{:.1}{}", (value as f64) / (unit as f64), suffix)
}

fn format_system_time(time: std::time::SystemTime) -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = time.duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

#[derive(Serialize)]
struct FileEntry {
    file: String,
    role: &'static str,
    present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
}

#[derive(Serialize)]
struct DeletedEntry {
    file: String,
    path: String,
}

#[derive(Serialize)]
struct FailedEntry {
    file: String,
    error: Value,
}

#[derive(Serialize)]
struct ResetEnvelope {
    dir: String,
    files: Vec<FileEntry>,
    cancelled: bool,
    deleted: Vec<DeletedEntry>,
    failed: Vec<FailedEntry>,
}

fn file_entries(files: &[DbFile], statuses: &[FileStatus]) -> Vec<FileEntry> {
    files
        .iter()
        .zip(statuses)
        .map(|(file, status)| file_entry(file, *status))
        .collect()
}

fn file_entry(file: &DbFile, status: FileStatus) -> FileEntry {
    let (present, size_bytes, modified) = match status {
        FileStatus::Present {
            size_bytes,
            modified,
        } if file.role.reports_size() => {
            (true, Some(size_bytes), modified.and_then(format_system_time))
        }
        FileStatus::Present { .. } => (true, None, None),
        FileStatus::Absent => (false, None, None),
    };
    FileEntry {
        file: file.name.clone(),
        role: file.role.token(),
        present,
        size_bytes,
        modified,
    }
}

fn reset_envelope(
    base_dir: &Path,
    files: Vec<FileEntry>,
    cancelled: bool,
    outcome: Option<&ResetOutcome>,
) -> ResetEnvelope {
    let deleted = outcome
        .map(|outcome| {
            outcome
                .deleted
                .iter()
                .map(|file| DeletedEntry {
                    file: file.name.clone(),
                    path: file.path.display().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    let failed = outcome
        .map(|outcome| {
            outcome
                .failed
                .iter()
                .map(|(file, err)| FailedEntry {
                    file: file.name.clone(),
                    error: error_json(err)["error"].clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    ResetEnvelope {
        dir: base_dir.display().to_string(),
        files,
        cancelled,
        deleted,
        failed,
    }
}

fn emit_json(envelope: &impl Serialize) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(envelope)
    } else {
        serde_json::to_string(envelope)
    };
    println!(
        "{}",
        json.unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    );
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

#[cfg(test)]
mod tests {
    use super::{
        Error, ErrorKind, error_text, file_entry, format_bytes, render_report, reset_envelope,
        status_cell,
    };
    use symco_reset::core::fileset::{DbFileSet, FileStatus};

    fn sample_set() -> DbFileSet {
        DbFileSet::at(std::path::Path::new("/srv/symco"))
    }

    #[test]
    fn format_bytes_uses_k_m_g_suffixes() {
        assert_eq!(format_bytes(512), "512");
        assert_eq!(format_bytes(2048), "2K");
        assert_eq!(format_bytes(10_240), "10K");
        assert_eq!(format_bytes(1536), "1.5K");
        assert_eq!(format_bytes(1024 * 1024), "1M");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3G");
    }

    #[test]
    fn format_system_time_renders_rfc3339() {
        let time = std::time::UNIX_EPOCH + std::time::Duration::from_secs(86_400);
        assert_eq!(
            super::format_system_time(time).as_deref(),
            Some("1970-01-02T00:00:00Z")
        );
    }

    #[test]
    fn status_cell_reports_size_presence_and_absence() {
        let set = sample_set();
        let db = &set.files()[0];
        let shm = &set.files()[2];

        let present = FileStatus::Present {
            size_bytes: 10_240,
            modified: None,
        };
        assert_eq!(status_cell(db, present), "10K");
        assert_eq!(status_cell(shm, present), "present");
        assert_eq!(status_cell(db, FileStatus::Absent), "not found");
    }

    #[test]
    fn render_report_aligns_columns() {
        let rows = vec![
            [
                "symco.db".to_string(),
                "10K".to_string(),
                "2026-02-01T00:00:00Z".to_string(),
            ],
            [
                "symco.db-wal".to_string(),
                "not found".to_string(),
                "-".to_string(),
            ],
        ];
        let rendered = render_report(&rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("FILE          STATUS"));
        assert!(lines[1].starts_with("symco.db      10K"));
        assert!(lines[2].starts_with("symco.db-wal  not found"));
    }

    #[test]
    fn shm_entry_json_has_presence_only() {
        let set = sample_set();
        let shm = &set.files()[2];
        let entry = file_entry(
            shm,
            FileStatus::Present {
                size_bytes: 32_768,
                modified: None,
            },
        );
        let value = serde_json::to_value(&entry).expect("to_value");
        assert_eq!(value["file"], "symco.db-shm");
        assert_eq!(value["role"], "shm");
        assert_eq!(value["present"], true);
        assert!(value.get("size_bytes").is_none());
        assert!(value.get("modified").is_none());
    }

    #[test]
    fn cancelled_envelope_has_empty_outcome_arrays() {
        let set = sample_set();
        let entries = super::file_entries(
            set.files(),
            &[FileStatus::Absent, FileStatus::Absent, FileStatus::Absent],
        );
        let envelope = reset_envelope(std::path::Path::new("."), entries, true, None);
        let value = serde_json::to_value(&envelope).expect("to_value");
        assert_eq!(value["cancelled"], true);
        assert_eq!(value["deleted"].as_array().map(Vec::len), Some(0));
        assert_eq!(value["failed"].as_array().map(Vec::len), Some(0));
        assert_eq!(value["files"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn error_text_lists_message_hint_and_path() {
        let err = Error::new(ErrorKind::Permission)
            .with_message("failed to delete database file")
            .with_path("/srv/symco/symco.db")
            .with_hint("Check file ownership.");
        let rendered = error_text(&err, false);
        assert!(rendered.contains("error: failed to delete database file"));
        assert!(rendered.contains("hint: Check file ownership."));
        assert!(rendered.contains("path: /srv/symco/symco.db"));
    }

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::Permission)
            .with_message("failed to delete database file")
            .with_hint("Check file ownership.");
        let colored = error_text(&err, true);
        let plain = error_text(&err, false);
        assert!(colored.contains("\u{1b}[31merror:\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[33mhint:\u{1b}[0m"));
        assert!(plain.contains("error:"));
        assert!(!plain.contains("\u{1b}["));
    }
}
