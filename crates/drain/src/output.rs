//! Output for matched messages
//!
//! Raw format writes the payload bytes untouched followed by a newline, so
//! output can be piped into `jq`, `grep` and friends. JSON format wraps each
//! match with its subject and stream sequence.

use std::io::{self, Write};

use jstail_config::OutputFormat;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::source::Message;

/// Printed once the backlog is observed empty
pub const DRAINED_NOTICE: &str = "No messages received, exiting.";

#[derive(Serialize)]
struct JsonLine<'a> {
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<u64>,
    payload: std::borrow::Cow<'a, str>,
}

/// Writes matched messages to a sink
pub struct Output<W: Write> {
    writer: W,
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
}

impl<W: Write> Output<W> {
    /// Create an output writing `format` to `writer`
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            use_color: false,
            quiet: false,
        }
    }

    /// Dim the drained notice (caller decides based on TTY)
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    /// Suppress the drained notice
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Write one matched message
    pub fn emit(&mut self, message: &Message) -> io::Result<()> {
        match self.format {
            OutputFormat::Raw => {
                self.writer.write_all(&message.payload)?;
            }
            OutputFormat::Json => {
                let line = JsonLine {
                    subject: &message.subject,
                    sequence: message.sequence,
                    payload: String::from_utf8_lossy(&message.payload),
                };
                serde_json::to_writer(&mut self.writer, &line)?;
            }
        }
        self.writer.write_all(b"\n")
    }

    /// Write the drained notice
    pub fn drained(&mut self) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        if self.use_color {
            writeln!(self.writer, "{}", DRAINED_NOTICE.dimmed())
        } else {
            writeln!(self.writer, "{DRAINED_NOTICE}")
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the output and return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}
