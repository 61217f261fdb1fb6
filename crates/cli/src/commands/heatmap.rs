use serde_json::json;
use vidcheck::{ClientConfig, resolve_heatmap};

use crate::error::{CliError, Result};
use crate::output::{OutputFormat, ResultBuilder, print_result};

pub fn execute(reference: &str, config: &ClientConfig, format: OutputFormat) -> Result<()> {
	let resolved = resolve_heatmap(config.base(), reference.trim())
		.ok_or_else(|| CliError::Client(vidcheck::Error::Validation("heatmap reference is empty".into())))?;

	match format {
		OutputFormat::Text => println!("{resolved}"),
		OutputFormat::Json => {
			let result = ResultBuilder::new("heatmap")
				.data(json!({ "reference": reference, "url": resolved }))
				.build();
			print_result(&result, format)?;
		}
	}
	Ok(())
}
