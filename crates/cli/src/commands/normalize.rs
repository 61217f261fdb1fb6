use std::io::{self, BufRead};

use serde_json::{Value, json};
use vidcheck::{Error, normalize};

use crate::error::Result;
use crate::output::OutputFormat;

/// Normalizes one frame given as an argument, or every non-blank stdin line.
///
/// An invalid argument frame fails the command; invalid stdin lines are
/// reported inline and processing continues.
pub fn execute(frame: Option<String>, format: OutputFormat) -> Result<()> {
	match frame {
		Some(frame) => {
			let (value, failure) = outcome(&frame);
			emit(&value, format);
			match failure {
				Some(err) => Err(err.into()),
				None => Ok(()),
			}
		}
		None => {
			for line in io::stdin().lock().lines() {
				let line = line?;
				if line.trim().is_empty() {
					continue;
				}
				let (value, _) = outcome(&line);
				emit(&value, format);
			}
			Ok(())
		}
	}
}

fn outcome(raw: &str) -> (Value, Option<Error>) {
	match normalize(raw) {
		Ok(Some(event)) => (json!({ "ok": true, "event": event }), None),
		Ok(None) => (json!({ "ok": true, "ignored": true }), None),
		Err(err) => {
			let err = Error::InvalidFrame(err);
			(json!({ "ok": false, "error": err.to_string() }), Some(err))
		}
	}
}

fn emit(value: &Value, format: OutputFormat) {
	match format {
		OutputFormat::Json => println!("{value}"),
		OutputFormat::Text => {
			if let Some(event) = value.get("event") {
				println!("{event}");
			} else if let Some(error) = value.get("error").and_then(Value::as_str) {
				println!("error: {error}");
			} else {
				println!("ignored");
			}
		}
	}
}
