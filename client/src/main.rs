//! Campus - version history of academic files from the command line.
//!
//! # Commands
//!
//! - `campus login`: Sign in and store the session
//! - `campus logout`: Forget the stored session
//! - `campus history <file-id>`: List a file's versions, most recent first
//! - `campus show <file-id> <version>`: Print or save the content of one version
//!
//! # Environment Variables
//!
//! See the [`config`] module for available configuration options.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use campus_client::api::{ApiClient, ApiError};
use campus_client::config::Config;
use campus_client::error::ClientError;
use campus_client::session::SessionStore;
use campus_client::view::HistoryView;
use campus_history::{parse_label, parse_timestamp, History, SequencedEntry};

/// Environment variable read for the password before prompting.
const PASSWORD_ENV: &str = "CAMPUS_PASSWORD";

/// Campus - version history of academic files.
///
/// Browses the version history kept by the Campus backend and retrieves the
/// content of any earlier version.
#[derive(Parser, Debug)]
#[command(name = "campus")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    CAMPUS_API_URL               API base URL (required)
    CAMPUS_SESSION_DIR           Session directory (default: ~/.campus)
    CAMPUS_REQUEST_TIMEOUT_SECS  HTTP timeout in seconds (default: 30)
    CAMPUS_PASSWORD              Password for 'login' (prompted if unset)

EXAMPLES:
    # Sign in
    export CAMPUS_API_URL=https://api.campus.example
    campus login --email ana@campus.example

    # List the versions of a file
    campus history 6651f0c2

    # Save version 1.3 of a spreadsheet, decoding its base64 payload
    campus show 6651f0c2 1.3 --decode-base64 --output notas.xlsx
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session.
    Login {
        /// Account email address.
        #[arg(short, long)]
        email: String,
    },

    /// Forget the stored session.
    Logout,

    /// List the versions of a file, most recent first.
    History {
        /// File identifier.
        file_id: String,

        /// Print the history as JSON in chronological order.
        #[arg(long)]
        json: bool,
    },

    /// Print or save the content of one version.
    Show {
        /// File identifier.
        file_id: String,

        /// Version label as listed by `history` (e.g. 1.3), or a change id.
        version: String,

        /// Decode a base64 payload before writing it.
        #[arg(long)]
        decode_base64: bool,

        /// Write the content to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    let store = SessionStore::new(&config.session_dir);

    debug!(
        api_url = %config.api_url,
        session_dir = %config.session_dir.display(),
        "Configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let result = runtime.block_on(async {
        match cli.command {
            Command::Login { email } => run_login(&config, &store, &email).await,
            Command::History { file_id, json } => {
                run_history(&config, &store, file_id, json).await
            }
            Command::Show {
                file_id,
                version,
                decode_base64,
                output,
            } => run_show(&config, &store, file_id, &version, decode_base64, output).await,
            Command::Logout => run_logout(&store),
        }
    });

    if let Err(err) = &result {
        if is_session_invalidating(err) {
            if let Err(clear_err) = store.clear() {
                warn!(error = %clear_err, "Failed to clear invalid session");
            }
            bail!("Session expired or invalid. Run 'campus login' to sign in again.");
        }
    }

    result
}

/// Signs in and persists the session.
async fn run_login(config: &Config, store: &SessionStore, email: &str) -> Result<()> {
    let password = read_password()?;

    let mut client = ApiClient::from_config(config, None)?;
    let session = match client.login(email, &password).await {
        Ok(session) => session,
        Err(ApiError::Unauthorized) => bail!("Sign-in failed: invalid email or password"),
        Err(err) => return Err(err).context("Sign-in failed"),
    };

    store.save(&session).context("Failed to store session")?;
    info!(path = %store.path().display(), "Session stored");

    let who = session
        .user()
        .and_then(|user| user.name.clone().or_else(|| user.email.clone()))
        .unwrap_or_else(|| email.to_string());
    println!("Signed in as {who}");
    Ok(())
}

/// Removes the stored session.
fn run_logout(store: &SessionStore) -> Result<()> {
    if store.clear().context("Failed to remove session")? {
        println!("Signed out");
    } else {
        println!("No stored session");
    }
    Ok(())
}

/// Lists a file's history.
async fn run_history(
    config: &Config,
    store: &SessionStore,
    file_id: String,
    json: bool,
) -> Result<()> {
    let view = open_view(config, store, file_id)?;
    view.refresh().await?;
    let history = view.history().unwrap_or_default();

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    print_history(view.file_id(), &history);
    Ok(())
}

/// Retrieves the content of one version.
async fn run_show(
    config: &Config,
    store: &SessionStore,
    file_id: String,
    version: &str,
    decode_base64: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let view = open_view(config, store, file_id)?;
    view.refresh().await?;

    let label = view
        .history()
        .map_or_else(|| version.to_string(), |history| version_label(&history, version));

    let payload = match view.select(&label).await {
        Ok(payload) => payload,
        Err(ClientError::Api(ApiError::NotFound(what))) => {
            debug!(what = %what, "Content missing");
            bail!("Could not load content for version {version}: the server has no content for it");
        }
        Err(err) => return Err(err.into()),
    };

    let bytes = if decode_base64 {
        payload
            .decode_base64()
            .map_err(ClientError::from)
            .context("Content is not valid base64")?
    } else {
        payload.into_bytes()
    };

    match output {
        Some(path) => {
            fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} to {}", format_size(bytes.len()), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Maps a `show` argument to a label.
///
/// Well-formed labels win; otherwise the argument is looked up as a change id.
fn version_label(history: &History, version: &str) -> String {
    if parse_label(version).is_some() {
        return version.to_string();
    }
    history
        .by_id(version)
        .map_or_else(|| version.to_string(), |entry| entry.label.clone())
}

/// Builds a history view authenticated with the stored session.
fn open_view(
    config: &Config,
    store: &SessionStore,
    file_id: String,
) -> Result<HistoryView<ApiClient>> {
    let session = store.load().context("Failed to read stored session")?;
    if session.is_none() {
        bail!("Not signed in. Run 'campus login' first.");
    }

    let client = ApiClient::from_config(config, session)?;
    Ok(HistoryView::new(client, file_id))
}

fn print_history(file_id: &str, history: &History) {
    if history.is_empty() {
        println!("No history for file {file_id}");
        return;
    }

    println!(
        "{:<8} {:<17} {:>9}  {:<8}  DESCRIPTION",
        "VERSION", "DATE", "SIZE", "REVIEWED"
    );
    for entry in history.display_order() {
        println!("{}", format_entry(entry));
    }
}

fn format_entry(entry: &SequencedEntry) -> String {
    let record = &entry.record;
    let label = if entry.is_current {
        format!("{} *", entry.label)
    } else {
        entry.label.clone()
    };
    let date = parse_timestamp(&record.created_at)
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let reviewed = if record.reviewed { "yes" } else { "no" };
    let description = if record.has_description() {
        record.description.as_str()
    } else {
        "-"
    };

    format!(
        "{label:<8} {date:<17} {:>9}  {reviewed:<8}  {description}",
        format_size(record.size)
    )
}

fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }

    eprint!("Password: ");
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read password")?;

    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password cannot be empty");
    }
    Ok(password)
}

fn is_session_invalidating(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ApiError>()
            .is_some_and(ApiError::is_session_invalidating)
            || cause
                .downcast_ref::<ClientError>()
                .is_some_and(ClientError::is_session_invalidating)
    })
}

/// Initializes the logging subsystem. Logs go to stderr so command output
/// stays clean.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_history::{sequence, ChangeRecord};

    #[test]
    fn cli_parses_show_arguments() {
        let cli = Cli::parse_from([
            "campus",
            "show",
            "f1",
            "1.3",
            "--decode-base64",
            "-o",
            "out.xlsx",
        ]);
        match cli.command {
            Command::Show {
                file_id,
                version,
                decode_base64,
                output,
            } => {
                assert_eq!(file_id, "f1");
                assert_eq!(version, "1.3");
                assert!(decode_base64);
                assert_eq!(output, Some(PathBuf::from("out.xlsx")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn format_entry_marks_current_and_placeholders() {
        let history = sequence(vec![
            ChangeRecord::new("a", 1, "2024-01-01T09:30:00Z", "abc"),
            ChangeRecord::new("b", 2, "bad", "").with_reviewed(true),
        ]);

        let rendered: Vec<String> = history.display_order().map(format_entry).collect();
        assert!(rendered[0].starts_with("1.2 *"));
        assert!(rendered[0].contains("2024-01-01 09:30"));
        assert!(rendered[0].contains(" no "));
        assert!(rendered[1].starts_with("1.1 "));
        assert!(rendered[1].contains(" yes "));
        assert!(rendered[1].ends_with(" -"));
    }

    #[test]
    fn version_label_prefers_labels_over_change_ids() {
        let history = sequence(vec![
            ChangeRecord::new("x", 1, "2024-01-01T09:00:00Z", "a"),
            ChangeRecord::new("y", 2, "2024-01-02T09:00:00Z", "b"),
            ChangeRecord::new("1.2", 3, "2024-01-03T09:00:00Z", "c"),
        ]);

        assert_eq!(version_label(&history, "1.2"), "1.2");
        assert_eq!(history.by_label("1.2").map(|e| e.record.id.as_str()), Some("y"));
        assert_eq!(version_label(&history, "x"), "1.1");
        assert_eq!(version_label(&history, "missing"), "missing");
    }

    #[test]
    fn unauthorized_is_detected_through_context() {
        let err = anyhow::Error::from(ApiError::Unauthorized).context("Sign-in failed");
        assert!(is_session_invalidating(&err));

        let err = anyhow::Error::from(ClientError::from(ApiError::Unauthorized));
        assert!(is_session_invalidating(&err));

        let err = anyhow::Error::from(ApiError::NotFound("x".to_string()));
        assert!(!is_session_invalidating(&err));
    }
}
