//! Session Management
//!
//! A `Session` owns the responder (and through it the fixed tool registry
//! and endpoint configuration) for the lifetime of the process, and runs
//! the line-oriented chat loop.

use std::borrow::Cow;
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::message::Turn;
use crate::postprocess;
use crate::responder::Responder;

/// Inputs that end the session, compared case-insensitively after trimming
pub const EXIT_KEYWORDS: [&str; 2] = ["quit", "exit"];

pub const FAREWELL: &str = "Goodbye!";

/// Completed turns kept for inspection; older turns are dropped first
pub const TRANSCRIPT_LIMIT: usize = 50;

const WELCOME: &str = "Welcome! I'm your AI assistant.\nType 'quit' to exit. You can ask me anything!";

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True when `input` asks to leave the chat
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    EXIT_KEYWORDS.iter().any(|kw| input.eq_ignore_ascii_case(kw))
}

/// An interactive chat session
pub struct Session {
    id: SessionId,
    responder: Responder,
    transcript: Vec<Turn>,
}

impl Session {
    pub fn new(responder: Responder) -> Self {
        Self {
            id: SessionId::new(),
            responder,
            transcript: Vec::new(),
        }
    }

    /// Most recent completed turns, oldest first, at most [`TRANSCRIPT_LIMIT`].
    /// Turns are never fed back to the model.
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// Run one turn and return the display string
    pub async fn respond(&mut self, input: &str) -> Result<String> {
        let turn = self.responder.invoke(input).await?;
        let text = postprocess::display_text(&turn, self.responder.tools());
        if self.transcript.len() == TRANSCRIPT_LIMIT {
            self.transcript.remove(0);
        }
        self.transcript.push(turn);
        Ok(text)
    }

    /// Read lines from `input` until an exit keyword or end of input,
    /// printing each answer to `output`.
    ///
    /// A failed turn is reported and the loop carries on. Only configuration
    /// errors and I/O errors on the terminal itself end it early.
    pub async fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> Result<()> {
        writeln!(output, "{WELCOME}")?;
        tracing::info!(session = %self.id, tools = ?self.responder.tools().names(), "Session started");

        loop {
            write!(output, "\nYou: ")?;
            output.flush()?;

            let mut raw = Vec::new();
            if input.read_until(b'\n', &mut raw)? == 0 {
                writeln!(output, "\n{FAREWELL}")?;
                break;
            }

            let line = String::from_utf8_lossy(&raw);
            if matches!(line, Cow::Owned(_)) {
                tracing::warn!(session = %self.id, "Input is not valid UTF-8; invalid bytes replaced");
            }
            let line = line.trim();
            if is_exit_command(line) {
                writeln!(output, "{FAREWELL}")?;
                break;
            }
            if line.is_empty() {
                continue;
            }

            write!(output, "\nAssistant: ")?;
            output.flush()?;

            match self.respond(line).await {
                Ok(text) => writeln!(output, "{text}")?,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(session = %self.id, error = %e, "Turn failed");
                    writeln!(output, "Error: {e}")?;
                    writeln!(output, "{}", self.responder.provider().troubleshooting_hint())?;
                }
            }
        }

        tracing::info!(session = %self.id, turns = self.transcript.len(), "Session ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_keywords() {
        assert!(is_exit_command("quit"));
        assert!(is_exit_command("  QUIT \n"));
        assert!(is_exit_command("Exit"));
        assert!(!is_exit_command("quitter"));
        assert!(!is_exit_command("please quit"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn test_session_ids_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
