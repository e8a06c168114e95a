use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::{Reply, ToolCallLine};
use crate::server_client::SessionInfo;

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const USER_PROMPT: Color = Color::Green;
    const ASSISTANT_TEXT: Color = Color::Cyan;
    const TOOL_CALL: Color = Color::Yellow;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

/// What the user typed.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Empty,
    Quit,
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "" => Input::Empty,
            "exit" | "quit" | "/exit" | "/quit" => Input::Quit,
            _ => Input::Message(trimmed.to_string()),
        }
    }
}

/// Manages terminal I/O for the interactive REPL.
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    /// Print the startup banner.
    pub fn print_banner(&self, backend: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("relay-cli"),
            ResetColor,
            Print(" - chat with MCP tools\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", backend)),
            Print("Type 'exit' or 'quit' to end.\n"),
            Print("---\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Read a line of user input with prompt. End of input counts as quit.
    pub fn read_input(&self) -> Result<Input> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            Print("\n"),
            SetForegroundColor(Colors::USER_PROMPT),
            Print("you> "),
            ResetColor,
        )?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(Input::Quit);
        }
        Ok(Input::parse(&line))
    }

    /// Print the tool calls a reply made, then its answer.
    pub fn display_reply(&self, reply: &Reply) -> Result<()> {
        for call in &reply.tool_calls {
            self.display_tool_call(call)?;
        }
        let mut stdout = io::stdout();
        let color = if reply.response.starts_with("Error: ") {
            Colors::ERROR
        } else {
            Colors::ASSISTANT_TEXT
        };
        execute!(
            stdout,
            SetForegroundColor(color),
            Print(&reply.response),
            ResetColor,
            Print("\n"),
        )?;
        stdout.flush()?;
        Ok(())
    }

    fn display_tool_call(&self, call: &ToolCallLine) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::TOOL_CALL),
            Print(format!("[tool: {}] ", call.name)),
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", truncate(&call.args.to_string(), 200))),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Show a spinner/waiting indicator. Returns a handle to stop it.
    pub fn start_spinner(&self) -> SpinnerHandle {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let thread = std::thread::spawn(move || {
            let frames = ['|', '/', '-', '\\'];
            let mut i = 0;
            while running_clone.load(Ordering::SeqCst) {
                let mut stdout = io::stdout();
                execute!(
                    stdout,
                    SetForegroundColor(Colors::DIM),
                    Print(format!("\r{} ", frames[i % frames.len()])),
                    ResetColor,
                )
                .ok();
                stdout.flush().ok();
                i += 1;
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            let mut stdout = io::stdout();
            execute!(stdout, Print("\r  \r")).ok();
            stdout.flush().ok();
        });

        SpinnerHandle {
            running,
            thread: Some(thread),
        }
    }

    /// Print a session listing.
    pub fn print_sessions(&self, sessions: &[SessionInfo]) -> Result<()> {
        let mut stdout = io::stdout();
        if sessions.is_empty() {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print("No sessions found.\n"),
                ResetColor,
            )?;
            return Ok(());
        }

        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("Sessions:\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!(
                "{:<38} {:<6} {:<20} {}\n",
                "ID", "MSGS", "LAST ACTIVE", "LAST MESSAGE"
            )),
            Print(format!("{}\n", "-".repeat(100))),
            ResetColor,
        )?;

        for s in sessions {
            let when = s
                .timestamp
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            execute!(
                stdout,
                Print(format!(
                    "{:<38} {:<6} {:<20} {}\n",
                    s.id,
                    s.message_count,
                    when,
                    truncate(&s.last_message.replace('\n', " "), 40),
                )),
            )?;
        }

        stdout.flush()?;
        Ok(())
    }

    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}

/// Cut `s` to at most `max` characters, marking the cut.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max).collect();
    format!("{}...", cut)
}

/// Handle to a running spinner. Dropping it stops the animation and waits
/// for the line to be cleared.
pub struct SpinnerHandle {
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
