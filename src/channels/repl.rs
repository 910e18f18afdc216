//! Interactive REPL channel with line editing and markdown rendering.
//!
//! Runs the message router over a single terminal session. Uses rustyline
//! for line editing, history and tab-completion, and termimad for rendering
//! markdown replies inline.
//!
//! ## Commands
//!
//! - `/quit` or `/exit` - Exit the REPL
//! - everything else, agent commands included, goes to the router
//!
//! Confirming a transaction means resending the previewed message; the
//! up-arrow history recalls it unchanged.

use std::borrow::Cow;
use std::sync::Arc;

use rustyline::completion::Completer;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Editor, Helper};
use termimad::MadSkin;
use tokio::sync::mpsc;

use crate::agent::{ConversationSession, Router};
use crate::error::ChannelError;

/// Commands the REPL handles itself.
const EXIT_COMMANDS: &[&str] = &["quit", "exit"];

/// Agent commands offered for completion.
const AGENT_COMMANDS: &[&str] = &["help", "reset", "balance"];

/// Rustyline helper for command tab completion.
struct ReplHelper {
    commands: Vec<String>,
}

impl ReplHelper {
    fn new(prefix: &str) -> Self {
        let commands = AGENT_COMMANDS
            .iter()
            .chain(EXIT_COMMANDS)
            .map(|cmd| format!("{prefix}{cmd}"))
            .collect();
        Self { commands }
    }

    fn matches(&self, line: &str) -> Vec<String> {
        self.commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .cloned()
            .collect()
    }
}

impl Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.is_empty() {
            return Ok((0, vec![]));
        }
        Ok((0, self.matches(&line[..pos])))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if line.is_empty() || pos < line.len() {
            return None;
        }

        self.commands
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.as_str() != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ReplHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{hint}\x1b[0m"))
    }
}

impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

/// Build a termimad skin with our color scheme.
fn make_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.set_headers_fg(termimad::crossterm::style::Color::Yellow);
    skin.bold.set_fg(termimad::crossterm::style::Color::White);
    skin.italic
        .set_fg(termimad::crossterm::style::Color::Magenta);
    skin.inline_code
        .set_fg(termimad::crossterm::style::Color::Green);
    skin.code_block
        .set_fg(termimad::crossterm::style::Color::Green);
    skin.code_block.left_margin = 2;
    skin
}

fn terminal_width() -> usize {
    termimad::crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(80)
}

fn is_exit_command(line: &str, prefix: &str) -> bool {
    line.strip_prefix(prefix)
        .is_some_and(|cmd| EXIT_COMMANDS.contains(&cmd.to_lowercase().as_str()))
}

/// Get the history file path (~/.artemis/history).
fn history_path() -> std::path::PathBuf {
    crate::bootstrap::artemis_dir().join("history")
}

/// REPL channel with line editing and markdown rendering.
pub struct ReplChannel {
    router: Arc<Router>,
    /// Optional single message to send (for -m flag).
    single_message: Option<String>,
}

impl ReplChannel {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            single_message: None,
        }
    }

    /// Create a REPL channel that sends a single message and exits.
    pub fn with_message(router: Arc<Router>, message: String) -> Self {
        Self {
            router,
            single_message: Some(message),
        }
    }

    /// Read lines until exit, routing each through one conversation session.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let mut session = ConversationSession::new(format!("repl-{}", uuid::Uuid::new_v4()));

        if let Some(message) = &self.single_message {
            let reply = self.router.handle(&mut session, message).await;
            render_reply(&reply);
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel::<String>(1);
        let (ack_tx, ack_rx) = std::sync::mpsc::channel::<()>();
        let prefix = self.router.command_prefix().to_string();

        let input = std::thread::spawn(move || read_lines(prefix, tx, ack_rx));

        while let Some(line) = rx.recv().await {
            let reply = self.router.handle(&mut session, &line).await;
            render_reply(&reply);
            if ack_tx.send(()).is_err() {
                break;
            }
        }

        input
            .join()
            .map_err(|_| ChannelError::Terminal("input thread panicked".to_string()))?
    }
}

/// Blocking input loop. Waits for each reply before prompting again.
fn read_lines(
    prefix: String,
    tx: mpsc::Sender<String>,
    ack_rx: std::sync::mpsc::Receiver<()>,
) -> Result<(), ChannelError> {
    let config = Config::builder()
        .history_ignore_dups(true)
        .map_err(|e| ChannelError::Terminal(e.to_string()))?
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::with_config(config)
        .map_err(|e| ChannelError::Terminal(format!("Failed to initialize line editor: {e}")))?;
    rl.set_helper(Some(ReplHelper::new(&prefix)));

    let hist_path = history_path();
    if let Some(parent) = hist_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.load_history(&hist_path);

    println!("\x1b[1mArtemis\x1b[0m  {prefix}help for commands, {prefix}quit to exit");
    println!();

    loop {
        match rl.readline("\x1b[1;36m\u{203A}\x1b[0m ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if is_exit_command(line, &prefix) {
                    break;
                }
                if tx.blocking_send(line.to_string()).is_err() || ack_rx.recv().is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&hist_path) {
        tracing::debug!("failed to save REPL history: {}", e);
    }
    Ok(())
}

fn render_reply(reply: &str) {
    let width = terminal_width();
    eprintln!("\x1b[90m{}\x1b[0m", "\u{2500}".repeat(width.min(80)));

    let skin = make_skin();
    let text = termimad::FmtText::from(&skin, reply, Some(width));
    print!("{text}");
    println!();
}
