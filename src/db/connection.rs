use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use crate::db::migrations::run_migrations;

const WORKER_THREAD_NAME: &str = "autofill-store";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type StoreJob = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum WorkerMessage {
    Run(StoreJob),
    Stop,
}

/// Opens the dataset file and brings its schema and field type catalog up to
/// date.
fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open dataset store {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Dataset store stays in rollback journal mode: {err}");
    }
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("failed to enforce field type references")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    run_migrations(&mut conn).context("failed to prepare dataset schema")?;
    Ok(conn)
}

fn serve(mut conn: Connection, inbox: mpsc::Receiver<WorkerMessage>) {
    let mut jobs = 0u64;
    while let Ok(message) = inbox.recv() {
        match message {
            WorkerMessage::Run(job) => {
                job(&mut conn);
                jobs += 1;
            }
            WorkerMessage::Stop => break,
        }
    }
    info!("Dataset store worker stopped after {jobs} jobs");
}

struct StoreWorker {
    inbox: mpsc::Sender<WorkerMessage>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl StoreWorker {
    fn stop(&self) {
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };

        if self.inbox.send(WorkerMessage::Stop).is_err() {
            error!("Dataset store worker already gone");
        }
        if let Err(panic) = handle.join() {
            error!("Dataset store worker panicked: {panic:?}");
        }
    }
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Relational dataset store. One worker thread owns the SQLite connection;
/// every query runs there in submission order.
#[derive(Clone)]
pub struct Database {
    worker: Arc<StoreWorker>,
    path: Arc<PathBuf>,
}

impl Database {
    /// Opens (or creates) the store, runs migrations and seeds the default
    /// field types before returning.
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create dataset directory {}", parent.display())
            })?;
        }

        let (inbox_tx, inbox_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let worker_path = path.clone();

        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || match open_connection(&worker_path) {
                Ok(conn) => {
                    if ready_tx.send(Ok(())).is_ok() {
                        serve(conn, inbox_rx);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn dataset store worker")?;

        ready_rx
            .recv()
            .context("dataset store worker exited during startup")??;
        info!("Dataset store ready at {}", path.display());

        Ok(Self {
            worker: Arc::new(StoreWorker {
                inbox: inbox_tx,
                thread: Mutex::new(Some(thread)),
            }),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Stops the worker thread once queued work has drained. Clones of this
    /// handle fail their next call afterwards.
    pub fn close(self) {
        self.worker.stop();
    }

    /// Runs `job` on the worker thread and waits for its result.
    pub async fn execute<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let message = WorkerMessage::Run(Box::new(move |conn| {
            // The caller may have been cancelled; its result is simply dropped.
            let _ = reply_tx.send(job(conn));
        }));

        self.worker
            .inbox
            .send(message)
            .map_err(|_| anyhow!("dataset store {} is closed", self.path.display()))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("dataset store worker stopped before answering"))?
    }
}
