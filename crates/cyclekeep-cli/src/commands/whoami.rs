use super::{colorize_state, json_pretty, EXIT_PROFILE_ERROR, EXIT_SUCCESS};
use crate::profile::ProfileStore;
use cyclekeep_core::{boot_state, StateKind};

pub fn run(store: &ProfileStore, json: bool) -> Result<u8, String> {
    let model = boot_state(&store.load()?).read_model();
    let code = if model.state == StateKind::Errored {
        EXIT_PROFILE_ERROR
    } else {
        EXIT_SUCCESS
    };
    if json {
        let payload = serde_json::json!({
            "state": model.state,
            "account_id": model.account_id,
            "resources": model.resources.len(),
            "error": model.error,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(code);
    }

    println!("state:     {}", colorize_state(model.state));
    match model.state {
        StateKind::Initialized => {
            println!("account:   {}", model.account_id);
            println!("resources: {}", model.resources.len());
        }
        StateKind::Uninitialized => println!("no identity; run `cyclekeep new` to create one"),
        StateKind::Errored => println!("error:     {}", model.error),
    }
    Ok(code)
}
