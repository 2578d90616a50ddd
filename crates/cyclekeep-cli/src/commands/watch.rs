use super::{block_on, make_remote_client, no_identity, print_resources, EXIT_SUCCESS};
use crate::concurrency::shutdown_requested;
use crate::profile::ProfileStore;
use cyclekeep_core::{Manager, ReadModel, Session, StateKind};
use cyclekeep_remote::{HttpClient, RemoteResourceClient};
use serde_json::Value;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(
    store: &ProfileStore,
    remote_url: Option<&str>,
    interval: Duration,
    json: bool,
) -> Result<u8, String> {
    let client = make_remote_client(remote_url)?;
    let blob = {
        let _lock = store.lock()?;
        store.load()?
    };
    block_on(watch(store, client, &blob, interval, json))?
}

async fn watch(
    store: &ProfileStore,
    client: HttpClient,
    blob: &Value,
    interval: Duration,
    json: bool,
) -> Result<u8, String> {
    let mut session = Session::new(Manager::new(client), interval);
    load(&mut session, blob)?;
    if !json {
        eprintln!(
            "refreshing every {}s, press Ctrl-C to stop",
            interval.as_secs()
        );
    }

    // What the profile file held when this watch last loaded or wrote it.
    // Any other content was written by another command and wins.
    let mut on_disk = blob.clone();
    let mut last: Option<ReadModel> = None;
    while !shutdown_requested() {
        tokio::time::sleep(POLL_INTERVAL).await;

        let current = store.load()?;
        if current != on_disk {
            tracing::info!("profile changed on disk; reloading");
            load(&mut session, &current)?;
            on_disk = current;
            last = None;
            continue;
        }

        let model = session.manager().read_model();
        if last.as_ref() == Some(&model) {
            continue;
        }

        {
            let Some(lock) = store.try_lock()? else {
                tracing::warn!("profile is locked by another command; retrying");
                continue;
            };
            // The file may have changed between the check above and the lock.
            if store.load()? != on_disk {
                continue;
            }
            let profile = session.manager().export().map_err(|e| e.to_string())?;
            store.save(&lock, &profile)?;
            on_disk = profile.to_json();
        }

        if json {
            let line = serde_json::to_string(&model)
                .map_err(|e| format!("JSON serialization failed: {e}"))?;
            println!("{line}");
        } else {
            println!();
            print_resources(&model);
        }
        last = Some(model);
    }

    tracing::debug!("watch stopped");
    Ok(EXIT_SUCCESS)
}

/// Boot `blob` into the session. Only an identity can be watched.
fn load<C: RemoteResourceClient + 'static>(
    session: &mut Session<C>,
    blob: &Value,
) -> Result<(), String> {
    match session.load(blob) {
        StateKind::Initialized => Ok(()),
        StateKind::Uninitialized => Err(no_identity()),
        StateKind::Errored => Err(format!(
            "profile error: {}",
            session.manager().read_model().error
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyclekeep_remote::MockRemote;
    use serde_json::json;

    fn session() -> Session<MockRemote> {
        Session::new(Manager::new(MockRemote::new()), Duration::from_secs(30))
    }

    #[test]
    fn empty_profile_cannot_be_watched() {
        let empty = json!({"resources": [], "publicKey": "", "privateKey": ""});
        let err = load(&mut session(), &empty).unwrap_err();
        assert!(err.contains("no identity"));
    }

    #[test]
    fn damaged_profile_is_profile_error() {
        let err = load(&mut session(), &json!({"resources": 3})).unwrap_err();
        assert!(err.starts_with("profile error:"));
    }
}
