use std::io::{self, Write};
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;

use crate::error::Result;
use crate::output::format::OutputFormat;
use crate::output::model::{CommandError, CommandResult, ErrorCode};

/// Builder for constructing command results.
pub struct ResultBuilder<T: Serialize> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError {
			code,
			message: message.into(),
		});
		self
	}

	pub fn build(self) -> CommandResult<T> {
		CommandResult {
			ok: self.error.is_none() && self.data.is_some(),
			command: self.command,
			data: self.data,
			error: self.error,
			duration_ms: Some(self.start_time.elapsed().as_millis() as u64),
		}
	}
}

/// Prints a result envelope. Text mode prints only the payload, or the error
/// line to stderr.
pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) -> Result<()> {
	match format {
		OutputFormat::Json => {
			let json = serde_json::to_string_pretty(result).context("serialize command result")?;
			println!("{json}");
		}
		OutputFormat::Text => {
			if let Some(error) = &result.error {
				eprintln!("Error [{}]: {}", error.code, error.message);
			} else if let Some(data) = &result.data {
				let json = serde_json::to_string_pretty(data).context("serialize command data")?;
				let mut stdout = io::stdout().lock();
				writeln!(stdout, "{json}")?;
			}
		}
	}
	Ok(())
}
