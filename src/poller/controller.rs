use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{db::Database, source::ListingSource};

use super::{
    detector::Notification,
    loop_worker::{polling_loop, PollerConfig},
};

pub struct PollerController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl PollerController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(
        &mut self,
        db: Database,
        source: Arc<dyn ListingSource>,
        notifications: mpsc::UnboundedSender<Notification>,
        config: PollerConfig,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("poller already running");
        }
        if config.interval.is_zero() {
            bail!("poll interval must be greater than zero");
        }

        info!(
            "starting poller (interval {}s, pacing {}ms)",
            config.interval.as_secs(),
            config.pacing.as_millis()
        );

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(polling_loop(
            db,
            source,
            notifications,
            config,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancels the loop and waits for an in-flight cycle to finish.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("polling loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for PollerController {
    fn default() -> Self {
        Self::new()
    }
}
