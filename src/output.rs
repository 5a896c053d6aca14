//! Output routing for command results.
//!
//! Results go to stdout; diagnostics go through `tracing` to stderr.

use serde::Serialize;

/// How command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Plain human-readable text.
    Text,
    /// One pretty-printed JSON document per command.
    Json,
    /// Nothing on success.
    Quiet,
}

/// Output settings shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct OutputContext {
    mode: OutputMode,
}

impl OutputContext {
    /// `--json` wins over `--quiet`.
    #[must_use]
    pub const fn from_flags(json: bool, quiet: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Text
        };
        Self { mode }
    }

    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        self.mode
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.mode, OutputMode::Json)
    }

    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        matches!(self.mode, OutputMode::Quiet)
    }

    /// Print `value` as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<()> {
        let payload = serde_json::to_string_pretty(value)?;
        println!("{payload}");
        Ok(())
    }

    /// Print a text line unless quiet or in JSON mode.
    pub fn line(&self, text: impl AsRef<str>) {
        if matches!(self.mode, OutputMode::Text) {
            println!("{}", text.as_ref());
        }
    }
}
