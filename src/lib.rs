mod db;
mod error;
mod intake;
mod poller;
mod rate_guard;
mod settings;
mod source;
mod transport;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;

pub use db::{Database, Location, NewWatch, OwnerId, WatchEntry, WatchFilters, WatchId};
pub use error::{IntakeError, SourceError};
pub use intake::{ChoiceOption, Command, Inbound, IntakeController, Reply, SessionStore};
pub use poller::{CycleReport, Direction, Notification, PollerConfig, PollerController};
pub use rate_guard::RateGuard;
pub use settings::Settings;
pub use source::{ImmoScoutClient, ListingSource};
pub use transport::{
    dispatch_notifications, spawn_stdin_reader, ConsoleSink, ConsoleTransport, MessageSink,
};

/// Wires storage, the listing source, the poller and the console transport
/// together and runs until stdin closes or Ctrl-C is received.
pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("flatwatch starting up...");

    let settings = Settings::load_from_env()?;
    let db = Database::new(settings.database_path.clone()).context("failed to open database")?;
    info!(
        "Serving console owner {} from {}",
        settings.console_owner_id,
        db.path().display()
    );

    let source: Arc<dyn ListingSource> = Arc::new(
        ImmoScoutClient::new(&settings.source).context("failed to build listing source client")?,
    );

    let sink: Arc<dyn MessageSink> = Arc::new(ConsoleSink::stdout());
    let (notification_tx, notification_rx) = mpsc::unbounded_channel();
    let dispatcher = tokio::spawn(dispatch_notifications(notification_rx, sink.clone()));

    let mut poller = PollerController::new();
    poller.start(
        db.clone(),
        source.clone(),
        notification_tx,
        PollerConfig {
            interval: settings.poll_interval(),
            pacing: settings.request_pacing(),
        },
    )?;

    let intake = IntakeController::new(
        db,
        source,
        SessionStore::new(),
        Arc::new(RateGuard::new(settings.throttle_window())),
    )?;
    let console = ConsoleTransport::new(settings.console_owner_id, Arc::new(intake), sink);

    let input = spawn_stdin_reader()?;
    let served = tokio::select! {
        result = console.serve(input) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            Ok(())
        }
    };

    // Dropping the poller's sender lets the dispatcher drain and exit.
    if let Err(err) = poller.stop().await {
        warn!("Failed to stop poller cleanly: {err:#}");
    }
    if let Err(err) = dispatcher.await {
        warn!("Notification dispatcher failed to join: {err}");
    }

    served
}
