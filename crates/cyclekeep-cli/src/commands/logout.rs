use super::{json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use crate::profile::ProfileStore;
use cyclekeep_core::{boot_state, Event, ManagerState};

pub fn run(store: &ProfileStore, yes: bool, json: bool) -> Result<u8, String> {
    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Discard the identity stored in {}? Export it first to keep it",
                store.path().display()
            ))
            .default(false)
            .interact()
            .map_err(|e| format!("confirmation failed: {e}"))?;
        if !confirmed {
            println!("logout cancelled");
            return Ok(EXIT_FAILURE);
        }
    }

    let lock = store.lock()?;
    // A damaged profile is discarded the same way as a healthy one.
    let state = store
        .load()
        .map_or(ManagerState::Uninitialized, |blob| boot_state(&blob))
        .apply(Event::LoggedOut);
    let profile = state.export().map_err(|e| e.to_string())?;
    store.save(&lock, &profile)?;

    if json {
        let payload = serde_json::json!({ "state": state.kind() });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("logged out; {} reset", store.path().display());
    }
    Ok(EXIT_SUCCESS)
}
