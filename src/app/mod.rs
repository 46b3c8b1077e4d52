use crate::api::ApiServer;
use crate::backend::{Backend, BackendClient};
use crate::cli::ServeArgs;
use crate::config::Config;
use crate::metadata::SessionMetadata;
use crate::session::{ClassSession, Classroom, SessionDeps};
use crate::speech::{speaker_from_config, Announcer};
use crate::transport::BridgeTransport;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub async fn run_service(args: ServeArgs) -> Result<()> {
    info!("Starting classroom service");

    let config = Config::load()?;
    let identity = args
        .identity
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .context("No identity given. Run `classroom serve --identity <name>`")?
        .to_string();
    let metadata = SessionMetadata::read(&args.effective_metadata());

    let backend: Arc<dyn Backend> = Arc::new(BackendClient::new(&config.backend)?);
    let bridge = Arc::new(BridgeTransport::new(&config.bridge));
    let deps = SessionDeps {
        announcer: Announcer::new(speaker_from_config(&config.speech)),
        backend,
        timing: config.timing.clone(),
    };

    let session = ClassSession::new(&identity, &args.room, &metadata, deps.clone())
        .context("Cannot start a session without a teacher or student role")?;
    let role = session.role();
    let classroom = Classroom::new(
        session,
        deps,
        bridge.clone(),
        bridge,
        config.export.resolve_dir()?,
    )?;

    let api_server = ApiServer::new(classroom, &config);

    info!("{} joined {} as {}", identity, args.room, role);
    info!("Room bridge: {}", config.bridge.base_url);
    info!("Backend: {}", config.backend.base_url);

    tokio::select! {
        result = api_server.start() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down classroom service");
            Ok(())
        }
    }
}
