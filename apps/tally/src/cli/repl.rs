//! # REPL
//!
//! Line-oriented keyboard front end. Each input line is a key sequence fed
//! through the same event funnel as every other input source; lines starting
//! with `:` are REPL commands.

use crate::api::HistoryItem;
use crate::client::HistoryClient;
use crate::sink::{ChannelSink, HttpSink};
use colored::{ColoredString, Colorize};
use std::io::Write;
use std::sync::Arc;
use tally_core::{
    CalcError, Calculator, HistoryBackend, HistorySink, HistoryStore, Snapshot, Theme,
    format_number, parse_keys,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;

const HELP: &str = "\
Keys:     0-9 .  + - * /  = (or enter)  c (clear entry)  a (all clear)
Names:    ac ce back mc mr m+ m-
Commands: :theme  :history [n]  :help  :quit";

// =============================================================================
// RECORDER
// =============================================================================

/// Where completed calculations go, and where `:history` reads from.
///
/// Every recorder runs under one session, created when the recorder opens.
pub enum Recorder {
    Local {
        sink: ChannelSink,
        store: Arc<RwLock<HistoryBackend>>,
        session_id: String,
    },
    Remote {
        sink: Arc<HttpSink>,
        client: HistoryClient,
        session_id: String,
    },
}

impl Recorder {
    /// Record into a local store through a background writer.
    ///
    /// The session is created in the store, or reused when it exists.
    pub fn local(mut store: HistoryBackend, session_id: Option<String>) -> Result<Self, CalcError> {
        let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        store.create_session(&session_id)?;

        let store = Arc::new(RwLock::new(store));
        let (sink, _writer) = ChannelSink::spawn(store.clone());
        Ok(Self::Local {
            sink: sink.with_session(session_id.clone()),
            store,
            session_id,
        })
    }

    /// Record into a remote history service.
    ///
    /// Without an explicit id the service is asked for a new session. If it
    /// cannot be reached, calculations are tagged with a local id and the
    /// uploads fail on their own.
    pub async fn remote(client: HistoryClient, session_id: Option<String>) -> Result<Self, CalcError> {
        let session_id = match session_id {
            Some(id) => id,
            None => match client.create_session().await {
                Ok(created) => created.session_id,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot create remote session");
                    uuid::Uuid::new_v4().to_string()
                }
            },
        };

        let sink = HttpSink::new(client.clone())?.with_session(session_id.clone());
        Ok(Self::Remote {
            sink: Arc::new(sink),
            client,
            session_id,
        })
    }

    /// Session every recorded calculation is tagged with.
    pub fn session_id(&self) -> &str {
        match self {
            Self::Local { session_id, .. } | Self::Remote { session_id, .. } => session_id,
        }
    }

    /// The sink to attach to a calculator.
    pub fn sink(&self) -> Arc<dyn HistorySink> {
        match self {
            Self::Local { sink, .. } => Arc::new(sink.clone()),
            Self::Remote { sink, .. } => sink.clone(),
        }
    }

    /// Wait until every calculation recorded so far has been handed off.
    pub async fn flush(&self) -> Result<(), CalcError> {
        match self {
            Self::Local { sink, .. } => sink.flush().await,
            Self::Remote { sink, .. } => sink.flush().await,
        }
    }

    /// Hand off everything recorded so far and release the local store.
    ///
    /// Calculations reported after this are dropped with a warning.
    pub async fn close(&self) -> Result<(), CalcError> {
        match self {
            Self::Local { sink, .. } => {
                let written = sink.close().await?;
                tracing::debug!(written, "local history closed");
                Ok(())
            }
            Self::Remote { sink, .. } => sink.flush().await,
        }
    }

    /// Most recent calculations, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<HistoryItem>, CalcError> {
        self.flush().await?;
        match self {
            Self::Local { store, .. } => Ok(store
                .read()
                .await
                .list_recent(limit)?
                .into_iter()
                .map(HistoryItem::from)
                .collect()),
            Self::Remote { client, .. } => client
                .list_recent(limit)
                .await
                .map(|r| r.history)
                .map_err(|e| CalcError::IoError(e.to_string())),
        }
    }
}

// =============================================================================
// RENDERING
// =============================================================================

fn paint_display(text: &str, theme: Theme) -> ColoredString {
    if text == "Error" {
        return text.red().bold();
    }
    match theme {
        Theme::Light => text.blue().bold(),
        Theme::Dark => text.bright_white().bold(),
    }
}

fn paint_muted(text: &str, theme: Theme) -> ColoredString {
    match theme {
        Theme::Light => text.black().dimmed(),
        Theme::Dark => text.bright_black(),
    }
}

/// Render the calculator state as one block of text.
///
/// Line one is the expression trace (possibly empty), line two the display,
/// prefixed with `M` while memory is non-zero.
pub fn render_snapshot(snapshot: &Snapshot, theme: Theme) -> String {
    let memory_flag = if snapshot.memory != 0.0 { "M" } else { " " };
    let mut out = format!(
        "{}\n{} {}",
        paint_muted(&snapshot.expression, theme),
        paint_muted(memory_flag, theme),
        paint_display(&snapshot.display, theme)
    );
    if let Some(reason) = &snapshot.error {
        out.push_str(&format!("  {}", paint_muted(reason, theme)));
    }
    out
}

fn render_history(items: &[HistoryItem], theme: Theme) -> String {
    if items.is_empty() {
        return paint_muted("(no calculations yet)", theme).to_string();
    }
    items
        .iter()
        .map(|item| {
            format!(
                "{} {} = {}",
                paint_muted(&item.timestamp.format("%H:%M:%S").to_string(), theme),
                item.expression,
                paint_display(&item.result, theme)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// LOOP
// =============================================================================

/// What a line asked the REPL to do.
#[derive(Debug, PartialEq)]
enum Line {
    Empty,
    Keys(String),
    Theme,
    History(Option<usize>),
    Help,
    Quit,
    Unknown(String),
}

fn parse_line(line: &str) -> Line {
    let line = line.trim();
    let Some(command) = line.strip_prefix(':') else {
        return if line.is_empty() {
            Line::Empty
        } else {
            Line::Keys(line.to_string())
        };
    };

    let mut words = command.split_whitespace();
    match words.next().unwrap_or_default() {
        "q" | "quit" | "exit" => Line::Quit,
        "theme" => Line::Theme,
        "help" | "h" => Line::Help,
        "history" => Line::History(words.next().and_then(|n| n.parse().ok())),
        other => Line::Unknown(other.to_string()),
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Run the REPL on stdin until `:quit` or end of input.
pub async fn run_repl(
    mut calc: Calculator,
    mut theme: Theme,
    recorder: Option<Recorder>,
    history_limit: usize,
) -> Result<(), CalcError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Some(recorder) = &recorder {
        println!("{}", paint_muted(&format!("session {}", recorder.session_id()), theme));
    }
    println!("{}", render_snapshot(&calc.snapshot(), theme));
    prompt();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CalcError::IoError(format!("stdin: {}", e)))?
    {
        match parse_line(&line) {
            Line::Empty => {}
            Line::Quit => break,
            Line::Help => println!("{}", HELP),
            Line::Theme => {
                theme.toggle();
                println!("theme: {}", theme);
                println!("{}", render_snapshot(&calc.snapshot(), theme));
            }
            Line::History(n) => match &recorder {
                Some(recorder) => match recorder.recent(n.unwrap_or(history_limit)).await {
                    Ok(items) => println!("{}", render_history(&items, theme)),
                    Err(e) => eprintln!("{}: {}", "error".red().bold(), e),
                },
                None => println!("history is not enabled"),
            },
            Line::Unknown(command) => {
                eprintln!("{}: unknown command ':{}' (try :help)", "error".red().bold(), command);
            }
            Line::Keys(keys) => match parse_keys(&keys) {
                Ok(events) => {
                    calc.dispatch_all(events);
                    tracing::debug!(display = calc.display(), memory = %format_number(calc.memory()), "state");
                    println!("{}", render_snapshot(&calc.snapshot(), theme));
                }
                Err(e) => eprintln!("{}: {}", "error".red().bold(), e),
            },
        }
        prompt();
    }
    println!();

    if let Some(recorder) = &recorder {
        recorder.close().await?;
    }
    Ok(())
}
