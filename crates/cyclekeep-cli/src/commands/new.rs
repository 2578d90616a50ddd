use super::{boot_offline, json_pretty, EXIT_SUCCESS};
use crate::profile::ProfileStore;
use cyclekeep_core::{new_identity, StateKind};

pub fn run(store: &ProfileStore, force: bool, json: bool) -> Result<u8, String> {
    let lock = store.lock()?;

    // An unreadable profile can be replaced only on purpose.
    let current = store.load().and_then(|blob| boot_offline(&blob));
    if !force {
        match current {
            Ok(state) if state.kind() == StateKind::Initialized => {
                return Err(format!(
                    "profile error: {} already holds an identity; export it and pass --force to replace it",
                    store.path().display()
                ));
            }
            Err(e) => return Err(format!("{e} (pass --force to replace it)")),
            Ok(_) => {}
        }
    }

    let profile = new_identity().map_err(|e| e.to_string())?;
    let state = boot_offline(&profile.to_json())?;
    store.save(&lock, &profile)?;

    let account = state
        .identity()
        .map(|i| i.account.to_string())
        .unwrap_or_default();
    if json {
        let payload = serde_json::json!({
            "account_id": account,
            "profile": store.path(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("created identity {account}");
        println!("profile written to {}", store.path().display());
    }
    Ok(EXIT_SUCCESS)
}
