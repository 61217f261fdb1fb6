mod analyze;
mod heatmap;
mod normalize;

use crate::cli::{Cli, Commands};
use crate::config;
use crate::error::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
	match cli.command {
		Commands::Analyze(args) => {
			let config = config::resolve(cli.config.as_deref(), cli.base_url.as_deref())?;
			analyze::execute(args, config, cli.format).await
		}
		Commands::Normalize { frame } => normalize::execute(frame, cli.format),
		Commands::Heatmap { reference } => {
			let config = config::resolve(cli.config.as_deref(), cli.base_url.as_deref())?;
			heatmap::execute(&reference, &config, cli.format)
		}
	}
}
