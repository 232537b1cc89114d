// ABOUTME: Entry point for the ecsroll CLI application.
// ABOUTME: Parses arguments, sets up logging, and dispatches to command handlers.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands};
use ecsroll::config::{Config, Overrides, RunOverrides};
use ecsroll::error::Result;
use ecsroll::output::Output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // --debug wins over RUST_LOG
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output_mode());

    match run(cli, output.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::resolve(cli.config.as_deref(), &cwd)?.with_overrides(cli.global_overrides());

    match cli.command {
        Commands::Deploy {
            cluster,
            services,
            image_tag,
            image_tags,
            containers,
            workdir,
            poll_interval,
            stabilize_timeout,
        } => {
            let config = config.with_overrides(Overrides {
                cluster,
                image_tag,
                image_tags,
                services,
                containers,
                workdir,
                poll_interval,
                stabilize_timeout,
                ..Overrides::default()
            });
            commands::deploy(config, output).await
        }
        Commands::Run {
            cluster,
            task_definition,
            container,
            image_tag,
            image_tags,
            workdir,
            log_group,
            launch_type,
            subnets,
            security_groups,
            public_ip,
            shell,
            stop_timeout,
            args,
        } => {
            let config = config
                .with_overrides(Overrides {
                    cluster,
                    image_tag,
                    image_tags,
                    workdir,
                    ..Overrides::default()
                })
                .with_run_overrides(RunOverrides {
                    task_definition,
                    container,
                    log_group,
                    launch_type,
                    subnets,
                    security_groups,
                    stop_timeout,
                    ..cli::run_overrides(shell, public_ip)
                });
            commands::run(config, args, output).await
        }
        Commands::Events {
            cluster,
            service,
            since,
            poll_interval,
        } => {
            let config = config.with_overrides(Overrides {
                cluster,
                poll_interval,
                ..Overrides::default()
            });
            commands::events(config, service, since, output).await
        }
    }
}
