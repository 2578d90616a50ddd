use super::{
    block_on, boot_online, json_pretty, make_remote_client, spin_fail, spin_ok, spinner,
    EXIT_SUCCESS,
};
use crate::profile::ProfileStore;

pub fn run(store: &ProfileStore, remote_url: Option<&str>, json: bool) -> Result<u8, String> {
    let client = make_remote_client(remote_url)?;
    let manager = boot_online(&store.load()?, client)?;

    let pb = spinner("reading account status…");
    let status = block_on(manager.account_status())?.map_err(|e| {
        spin_fail(&pb, "account status unavailable");
        e.to_string()
    })?;
    spin_ok(&pb, "account status read");

    let account = manager.read_model().account_id;
    if json {
        let payload = serde_json::json!({
            "account_id": account,
            "resource_count": status.resource_count,
            "remaining_quota": status.remaining_quota,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("account:         {account}");
        println!("resources:       {}", status.resource_count);
        println!("remaining quota: {}", status.remaining_quota);
    }
    Ok(EXIT_SUCCESS)
}
