use super::{boot_offline, json_pretty, EXIT_SUCCESS};
use crate::profile::{write_atomic, ProfileStore};
use std::path::Path;

pub fn run(store: &ProfileStore, output: &Path, json: bool) -> Result<u8, String> {
    let state = boot_offline(&store.load()?)?;
    let profile = state.export().map_err(|e| format!("profile error: {e}"))?;

    if output == Path::new("-") {
        println!("{}", json_pretty(&profile.to_json())?);
        return Ok(EXIT_SUCCESS);
    }

    write_atomic(output, &profile.to_json())?;
    if json {
        let payload = serde_json::json!({
            "output": output,
            "resources": profile.resources.len(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("profile exported to {}", output.display());
    }
    Ok(EXIT_SUCCESS)
}
