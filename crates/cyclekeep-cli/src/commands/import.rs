use super::{boot_offline, json_pretty, EXIT_SUCCESS};
use crate::profile::ProfileStore;
use cyclekeep_core::StateKind;
use serde_json::Value;
use std::path::Path;

pub fn run(store: &ProfileStore, file: &Path, json: bool) -> Result<u8, String> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let blob: Value = serde_json::from_str(&content)
        .map_err(|e| format!("profile error: {} is not valid JSON: {e}", file.display()))?;

    let state = boot_offline(&blob)?;
    let profile = state.export().map_err(|e| format!("profile error: {e}"))?;

    let lock = store.lock()?;
    store.save(&lock, &profile)?;

    let model = state.read_model();
    if json {
        println!("{}", json_pretty(&model)?);
    } else if state.kind() == StateKind::Initialized {
        println!(
            "imported identity {} with {} resource(s)",
            model.account_id,
            model.resources.len()
        );
    } else {
        println!("imported profile has no identity; profile reset");
    }
    Ok(EXIT_SUCCESS)
}
