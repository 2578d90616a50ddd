mod commands;
mod concurrency;
mod profile;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_PROFILE_ERROR, EXIT_REMOTE_ERROR};
use concurrency::install_signal_handler;
use profile::ProfileStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "cyclekeep",
    version,
    about = "Keep track of remotely hosted resources and their cycle balances"
)]
struct Cli {
    /// Path to the profile file.
    #[arg(
        long,
        default_value = "~/.local/share/cyclekeep/profile.json",
        global = true
    )]
    profile: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a new identity and store it in the profile.
    New {
        /// Replace an existing identity.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Replace the profile with an exported profile file.
    Import {
        /// JSON file to import.
        file: PathBuf,
    },
    /// Write the profile to a file ("-" for stdout).
    Export {
        #[arg(long, short, default_value = "cyclekeep-profile.json")]
        output: PathBuf,
    },
    /// Show the profile state and account id.
    Whoami,
    /// Create a resource on the remote service.
    Create {
        /// Local label for the new resource.
        nickname: String,
        /// Remote service URL (overrides config file).
        #[arg(long)]
        remote: Option<String>,
    },
    /// Read every resource's cycle balance once.
    Status {
        /// Remote service URL (overrides config file).
        #[arg(long)]
        remote: Option<String>,
    },
    /// Show how many resources the account owns and its remaining allowance.
    Account {
        /// Remote service URL (overrides config file).
        #[arg(long)]
        remote: Option<String>,
    },
    /// Keep refreshing balances until interrupted.
    Watch {
        /// Remote service URL (overrides config file).
        #[arg(long)]
        remote: Option<String>,
        /// Seconds between refresh cycles.
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },
    /// Discard the stored identity and resources.
    Logout {
        /// Skip the confirmation prompt.
        #[arg(long, short, default_value_t = false)]
        yes: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CYCLEKEEP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    let store = ProfileStore::new(expand_tilde(&cli.profile));
    let json_output = cli.json;

    let result = match cli.command {
        Commands::New { force } => commands::new::run(&store, force, json_output),
        Commands::Import { file } => commands::import::run(&store, &file, json_output),
        Commands::Export { output } => commands::export::run(&store, &output, json_output),
        Commands::Whoami => commands::whoami::run(&store, json_output),
        Commands::Create { nickname, remote } => {
            commands::create::run(&store, &nickname, remote.as_deref(), json_output)
        }
        Commands::Status { remote } => {
            commands::status::run(&store, remote.as_deref(), json_output)
        }
        Commands::Account { remote } => {
            commands::account::run(&store, remote.as_deref(), json_output)
        }
        Commands::Watch { remote, interval } => commands::watch::run(
            &store,
            remote.as_deref(),
            Duration::from_secs(interval),
            json_output,
        ),
        Commands::Logout { yes } => commands::logout::run(&store, yes, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("profile error:") {
        EXIT_PROFILE_ERROR
    } else if msg.starts_with("remote error:") || msg.starts_with("no --remote and no config") {
        EXIT_REMOTE_ERROR
    } else {
        EXIT_FAILURE
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exit_codes_follow_message_prefix() {
        assert_eq!(exit_code_for("profile error: bad"), EXIT_PROFILE_ERROR);
        assert_eq!(exit_code_for("remote error: HTTP 500"), EXIT_REMOTE_ERROR);
        assert_eq!(exit_code_for("create rejected: quota exceeded"), EXIT_FAILURE);
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand_tilde("~/x.json"), PathBuf::from(home).join("x.json"));
        }
        assert_eq!(expand_tilde("/abs/x.json"), PathBuf::from("/abs/x.json"));
    }
}
