use anyhow::Result;
use classroom::{
    app,
    cli::{
        handle_export_command, handle_join_command, handle_status_command, Cli, CliCommand,
        ServeArgs,
    },
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let serve_args = match cli.command {
        Some(CliCommand::Version) => {
            println!("classroom {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Join(args)) => {
            handle_join_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Status) => {
            handle_status_command().await?;
            return Ok(());
        }
        Some(CliCommand::Export(args)) => {
            handle_export_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Serve(args)) => args,
        None => ServeArgs::default(),
    };

    app::run_service(serve_args).await
}
