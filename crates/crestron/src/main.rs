mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crestron_core::Bridge;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;

    match command {
        // Config commands don't need a hub
        Command::Config(args) => commands::config_cmd::handle(args, &global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "crestron", &mut std::io::stdout());
            Ok(())
        }

        // Long-running: owns its bridge and background poll
        Command::Watch(args) => {
            let bridge_config = config::build_bridge_config(&global)?;
            commands::watch::handle(bridge_config, args, &global).await
        }

        // Everything else: login, one cycle, run, logout
        cmd => {
            let bridge_config = config::build_bridge_config(&global)?;
            tracing::debug!(command = ?cmd, url = %bridge_config.url, "dispatching command");

            let global = &global;
            Bridge::oneshot(bridge_config, |bridge| async move {
                commands::dispatch(cmd, &bridge, global).await
            })
            .await
        }
    }
}
