mod cli;
mod error;
mod output;
mod scenario;
mod simulate;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use skylink_config::{Config, ConfigError};

use crate::cli::{Cli, Command, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // The config file may carry the default log filter, so load it first
    let config = load_config(&cli.global);
    init_tracing(
        cli.global.verbose,
        config
            .as_ref()
            .ok()
            .and_then(|cfg| cfg.defaults.log_filter.as_deref()),
    );

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli, config).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins, then `-v`, then `defaults.log_filter`, then `warn`.
/// Logs go to stderr so JSON output stays parseable.
fn init_tracing(verbosity: u8, configured: Option<&str>) {
    let filter = match verbosity {
        0 => configured.unwrap_or("warn"),
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

fn load_config(global: &GlobalOpts) -> Result<Config, ConfigError> {
    match &global.config {
        Some(path) => skylink_config::load_config_from(path),
        None => skylink_config::load_config(),
    }
}

async fn run(cli: Cli, config: Result<Config, ConfigError>) -> Result<(), CliError> {
    match cli.command {
        Command::Simulate(args) => {
            let config = config?;
            let format = cli.global.output.unwrap_or(match config.defaults.output.as_str() {
                "json" => OutputFormat::Json,
                _ => OutputFormat::Table,
            });

            let scenario = scenario::load(&args.scenario)?;
            let mut sdk_config = config.to_sdk_config();
            if let Some(at_startup) = scenario.at_startup {
                sdk_config.auto_connection.at_startup = at_startup;
            }

            tracing::debug!(scenario = %args.scenario.display(), ?format, "running simulation");
            let frames = simulate::run(&scenario, sdk_config).await?;
            output::print_output(&output::render_frames(format, &frames)?);
            Ok(())
        }

        Command::Config(args) => match args.command {
            ConfigCommand::Show => {
                let config = config?;
                output::print_output(toml::to_string_pretty(&config)?.trim_end());
                Ok(())
            }
            // Works even when the file is broken
            ConfigCommand::Path => {
                let path = cli
                    .global
                    .config
                    .unwrap_or_else(skylink_config::config_path);
                output::print_output(&path.display().to_string());
                Ok(())
            }
        },

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "skylink", &mut std::io::stdout());
            Ok(())
        }
    }
}
