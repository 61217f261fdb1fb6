//! Terminal display sink.

use std::io::{self, Write};

use colored::{ColoredString, Colorize};
use tracing::trace;
use vidcheck::{AnalysisId, ConnectionLabel, DisplaySink, PLACEHOLDER, Stage, StageResult, Tone, format_score};

/// Prints session updates as they happen.
///
/// In quiet mode nothing is printed; the command prints a summary at the end
/// instead. Errors are always remembered for that summary.
pub struct TerminalSink {
	live: bool,
	last_label: Option<ConnectionLabel>,
	errors: Vec<String>,
}

impl TerminalSink {
	pub fn new(live: bool) -> Self {
		Self {
			live,
			last_label: None,
			errors: Vec::new(),
		}
	}

	pub fn errors(&self) -> &[String] {
		&self.errors
	}

	fn line(&self, text: impl std::fmt::Display) {
		if self.live {
			let mut stdout = io::stdout().lock();
			let _ = writeln!(stdout, "{text}");
		}
	}
}

pub fn paint(text: &str, tone: Tone) -> ColoredString {
	match tone {
		Tone::Good => text.green(),
		Tone::Bad => text.red(),
		Tone::Warn => text.yellow(),
		Tone::Neutral => text.normal(),
	}
}

/// `video     0.80  Real`, uncolored.
pub fn stage_columns(value: &StageResult) -> (String, String, String) {
	(
		format!("{:<9}", value.stage().as_str()),
		format_score(value.score()),
		value.label().unwrap_or(PLACEHOLDER).to_string(),
	)
}

impl DisplaySink for TerminalSink {
	fn set_stage(&mut self, stage: Stage, value: &StageResult) {
		let (name, score, label) = stage_columns(value);
		let tone = match stage {
			Stage::Metadata => Tone::Neutral,
			_ => Tone::classify(&label),
		};
		let name = if stage == Stage::Final { name.bold() } else { name.normal() };
		self.line(format_args!("  {name} {score:>5}  {}", paint(&label, tone)));
	}

	fn set_progress(&mut self, text: &str, percent: u8) {
		self.line(format_args!("{} {text}", format!("[{percent:>3}%]").dimmed()));
	}

	fn set_connection_state(&mut self, label: ConnectionLabel) {
		if self.last_label == Some(label) {
			return;
		}
		self.last_label = Some(label);
		self.line(format_args!("{} {}", "●".dimmed(), paint(label.as_str(), label.tone())));
	}

	fn show_error(&mut self, message: &str) {
		self.errors.push(message.to_string());
		if self.live {
			eprintln!("{} {message}", "error:".red().bold());
		}
	}

	fn show_heatmap(&mut self, resolved: &str) {
		self.line(format_args!("  {:<9} {}", "heatmap", resolved.underline()));
	}

	fn set_submit_enabled(&mut self, enabled: bool) {
		trace!(target = "vidcheck.cli", enabled, "submit gate");
	}

	fn reset(&mut self, id: &AnalysisId) {
		self.last_label = None;
		self.errors.clear();
		self.line(format_args!("{} {}", "analysis".bold(), id));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use vidcheck::{FinalResult, MetadataResult, Score};

	#[test]
	fn columns_use_placeholders() {
		let meta = StageResult::Metadata(MetadataResult::default());
		assert_eq!(stage_columns(&meta), ("metadata ".to_string(), "-".to_string(), "-".to_string()));

		let fin = StageResult::Final(FinalResult {
			score: Score::new(0.456),
			verdict: "Fake".into(),
		});
		assert_eq!(stage_columns(&fin), ("final    ".to_string(), "0.46".to_string(), "Fake".to_string()));
	}

	#[test]
	fn quiet_sink_still_remembers_errors() {
		let mut sink = TerminalSink::new(false);
		sink.show_error("boom");
		sink.set_progress("ignored", 10);
		assert_eq!(sink.errors(), ["boom".to_string()]);

		sink.reset(&AnalysisId::from("next".to_string()));
		assert!(sink.errors().is_empty());
	}
}
