//! Raw API passthrough, for poking at paths the bridge does not model.

use crestron_core::Bridge;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn handle(bridge: &Bridge, path: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Err(CliError::Validation {
            field: "path".into(),
            reason: "path must not be empty".into(),
        });
    }

    let value = bridge.raw_get(path).await?;
    // Tables make no sense for arbitrary JSON.
    let format = match global.output {
        OutputFormat::Table | OutputFormat::Plain => OutputFormat::Json,
        ref other => other.clone(),
    };
    let out = output::render_single(&format, &value, |_| String::new(), |_| String::new());
    output::print_output(&out, global.quiet);
    Ok(())
}
