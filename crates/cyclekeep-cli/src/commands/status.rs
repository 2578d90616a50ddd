use super::{
    block_on, boot_online, json_pretty, make_remote_client, print_resources, spin_fail, spin_ok,
    spinner, EXIT_REMOTE_ERROR, EXIT_SUCCESS,
};
use crate::profile::ProfileStore;

pub fn run(store: &ProfileStore, remote_url: Option<&str>, json: bool) -> Result<u8, String> {
    let client = make_remote_client(remote_url)?;
    let lock = store.lock()?;
    let manager = boot_online(&store.load()?, client)?;

    let pb = spinner("reading cycle balances…");
    let applied = block_on(manager.refresh_quota())?;
    let model = manager.read_model();
    let failed = model.resources.iter().filter(|r| !r.error.is_empty()).count();
    if failed == 0 {
        spin_ok(&pb, &format!("read {applied} balance(s)"));
    } else {
        spin_fail(&pb, &format!("{failed} of {applied} balance read(s) failed"));
    }

    // Failed reads keep their previous balance, so saving never loses data.
    let profile = manager.export().map_err(|e| e.to_string())?;
    store.save(&lock, &profile)?;

    if json {
        println!("{}", json_pretty(&model)?);
    } else {
        print_resources(&model);
    }

    if failed > 0 && failed == model.resources.len() {
        Ok(EXIT_REMOTE_ERROR)
    } else {
        Ok(EXIT_SUCCESS)
    }
}
