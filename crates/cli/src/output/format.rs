use clap::ValueEnum;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text with live progress
	#[default]
	Text,
	/// A single JSON envelope on stdout
	Json,
}

impl OutputFormat {
	pub fn is_text(self) -> bool {
		self == OutputFormat::Text
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}
