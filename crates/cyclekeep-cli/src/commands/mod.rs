pub mod account;
pub mod completions;
pub mod create;
pub mod export;
pub mod import;
pub mod logout;
pub mod man_pages;
pub mod new;
pub mod status;
pub mod watch;
pub mod whoami;

use cyclekeep_core::{boot_state, Manager, ManagerState, ReadModel, StateKind};
use cyclekeep_remote::{HttpClient, RemoteConfig};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_PROFILE_ERROR: u8 = 2;
pub const EXIT_REMOTE_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_state(state: StateKind) -> String {
    use console::Style;
    let text = state.to_string();
    match state {
        StateKind::Initialized => Style::new().green().apply_to(text).to_string(),
        StateKind::Uninitialized => Style::new().yellow().apply_to(text).to_string(),
        StateKind::Errored => Style::new().red().bold().apply_to(text).to_string(),
    }
}

pub fn colorize_status(loading: bool, error: &str) -> String {
    use console::Style;
    if !error.is_empty() {
        Style::new().red().apply_to(error).to_string()
    } else if loading {
        Style::new().yellow().apply_to("loading").to_string()
    } else {
        Style::new().green().apply_to("ok").to_string()
    }
}

pub fn print_resources(model: &ReadModel) {
    if model.resources.is_empty() {
        println!("no resources");
        return;
    }
    println!("{:<16} {:<32} {:>20}  STATUS", "NICKNAME", "ID", "CYCLES");
    for r in &model.resources {
        println!(
            "{:<16} {:<32} {:>20}  {}",
            r.nickname,
            r.id.as_str(),
            r.remaining_quota,
            colorize_status(r.loading, &r.error)
        );
    }
    if !model.error.is_empty() {
        println!("error: {}", model.error);
    }
}

/// Boot a blob offline. Errored profiles are reported as profile errors.
pub fn boot_offline(blob: &Value) -> Result<ManagerState, String> {
    let state = boot_state(blob);
    match state {
        ManagerState::Errored { error } => Err(format!("profile error: {error}")),
        state => Ok(state),
    }
}

/// Boot a blob into a manager that talks to the remote service. Only an
/// initialized profile can do that.
pub fn boot_online(blob: &Value, client: HttpClient) -> Result<Manager<HttpClient>, String> {
    let manager = Manager::new(client);
    match manager.boot(blob) {
        StateKind::Initialized => Ok(manager),
        StateKind::Uninitialized => Err(no_identity()),
        StateKind::Errored => Err(format!("profile error: {}", manager.read_model().error)),
    }
}

pub fn no_identity() -> String {
    "profile error: no identity; run `cyclekeep new` or `cyclekeep import` first".to_owned()
}

pub fn make_remote_client(remote_url: Option<&str>) -> Result<HttpClient, String> {
    let config = if let Some(url) = remote_url {
        RemoteConfig::new(url)
    } else {
        RemoteConfig::load_default().map_err(|e| format!("no --remote and no config: {e}"))?
    };
    Ok(HttpClient::new(config))
}

/// Drive a future to completion on a single-threaded runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;
    Ok(runtime.block_on(future))
}
