//! Durable storage for watch entries.
//!
//! A single worker thread owns the only SQLite connection. Every public
//! operation is shipped to that thread as one closure, so operations never
//! interleave and list results are consistent snapshots.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
pub mod models;
mod repositories;

use migrations::run_migrations;

pub use models::{Location, NewWatch, OwnerId, WatchEntry, WatchFilters, WatchId};

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Owns the storage thread. Closing the job channel ends the thread.
struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Storage thread panicked");
            }
        }
    }
}

#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    db_path: Arc<PathBuf>,
}

fn open_connection(db_path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn run_jobs(mut conn: Connection, jobs: mpsc::Receiver<Job>) {
    for job in jobs {
        job(&mut conn);
    }
    debug!("Storage thread exiting");
}

impl Database {
    /// Opens (or creates) the database and migrates it before any job runs.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = open_connection(&db_path)?;
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let thread = thread::Builder::new()
            .name("flatwatch-db".into())
            .spawn(move || run_jobs(conn, jobs_rx))
            .context("failed to spawn storage thread")?;

        info!("Watch storage ready at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: Some(jobs_tx),
                thread: Some(thread),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Runs `task` on the storage thread and waits for its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let jobs = self
            .worker
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("storage is shutting down"))?;
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: Job = Box::new(move |conn| {
            // A dropped receiver means the caller stopped waiting.
            let _ = reply_tx.send(task(conn));
        });

        jobs.send(job).map_err(|_| anyhow!("storage thread is gone"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("storage thread dropped the job"))?
    }
}
