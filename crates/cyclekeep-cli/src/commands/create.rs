use super::{
    block_on, boot_online, json_pretty, make_remote_client, no_identity, spin_fail, spin_ok,
    spinner, EXIT_SUCCESS,
};
use crate::profile::ProfileStore;
use cyclekeep_core::CreateOutcome;

pub fn run(
    store: &ProfileStore,
    nickname: &str,
    remote_url: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let client = make_remote_client(remote_url)?;
    let lock = store.lock()?;
    let manager = boot_online(&store.load()?, client)?;

    let pb = spinner(&format!("creating resource '{nickname}'…"));
    match block_on(manager.create_resource(nickname))? {
        CreateOutcome::Created(view) => {
            spin_ok(&pb, &format!("created {}", view.id));
            let profile = manager.export().map_err(|e| e.to_string())?;
            store.save(&lock, &profile)?;
            if json {
                println!("{}", json_pretty(&view)?);
            } else {
                println!("{} {}", view.nickname, view.id);
            }
            Ok(EXIT_SUCCESS)
        }
        CreateOutcome::Rejected(message) => {
            spin_fail(&pb, "create rejected");
            Err(format!("create rejected: {message}"))
        }
        CreateOutcome::Failed(message) => {
            spin_fail(&pb, "create failed");
            Err(format!("remote error: {message}"))
        }
        CreateOutcome::Skipped => {
            pb.finish_and_clear();
            Err(no_identity())
        }
    }
}
