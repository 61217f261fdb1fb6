use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "vidcheck")]
#[command(about = "Video authenticity analysis from the command line")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Backend base address
	#[arg(long, global = true, env = "VIDCHECK_BASE_URL", value_name = "URL")]
	pub base_url: Option<String>,

	/// JSON configuration file (baseUrl, maxReconnectAttempts, reconnectDelayMs, requestTimeoutMs)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Submit a video and follow its analysis until it finishes
	Analyze(AnalyzeArgs),

	/// Normalize stream frames (one argument, or one frame per stdin line)
	Normalize {
		/// Raw frame text
		frame: Option<String>,
	},

	/// Resolve a heatmap reference against the backend address
	Heatmap {
		/// Reference as sent by the backend (e.g. `./temp/frame_1.jpg`)
		reference: String,
	},
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
	/// Remote video address
	#[arg(long, value_name = "URL")]
	pub url: Option<String>,

	/// Local video file to upload
	#[arg(long, value_name = "PATH")]
	pub file: Option<PathBuf>,
}
