//! Serializes every write through one connection on a dedicated thread.
//!
//! Each job runs inside an immediate transaction, so a job either commits as a
//! whole or not at all.

use std::any::Any;
use std::sync::Arc;

use diesel::result::Error as DieselError;
use diesel::SqliteConnection;
use expense_ledger_core::{Error, Result};
use log::{debug, error};
use tokio::sync::{mpsc, oneshot};

use super::{get_connection, DbPool};
use crate::errors::StorageError;

type JobOutput = Box<dyn Any + Send>;
type Job = Box<dyn FnOnce(&mut SqliteConnection) -> Result<JobOutput> + Send>;

struct WriteRequest {
    job: Job,
    reply: oneshot::Sender<Result<JobOutput>>,
}

/// Failure inside the transaction closure, kept apart from diesel's own errors.
enum TxError {
    Job(Error),
    Diesel(DieselError),
}

impl From<DieselError> for TxError {
    fn from(err: DieselError) -> Self {
        TxError::Diesel(err)
    }
}

#[derive(Clone)]
pub struct WriteHandle {
    sender: mpsc::UnboundedSender<WriteRequest>,
}

impl WriteHandle {
    /// Runs `job` on the writer connection and returns its result.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();
        let job: Job = Box::new(move |conn| job(conn).map(|value| Box::new(value) as JobOutput));

        self.sender
            .send(WriteRequest { job, reply })
            .map_err(|_| StorageError::WriterUnavailable("writer thread stopped".to_string()))?;

        let output = receiver.await.map_err(|_| {
            StorageError::WriterUnavailable("writer dropped the reply".to_string())
        })??;

        output
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::Unexpected("write job returned an unexpected type".to_string()))
    }

    /// Queues `job` without waiting for it. Jobs still run in submission order,
    /// so anything sent through `exec` afterwards observes its effect.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<()> + Send + 'static,
    {
        let (reply, _) = oneshot::channel();
        let job: Job = Box::new(move |conn| job(conn).map(|value| Box::new(value) as JobOutput));
        self.sender
            .send(WriteRequest { job, reply })
            .map_err(|_| StorageError::WriterUnavailable("writer thread stopped".to_string()))?;
        Ok(())
    }
}

/// Starts the writer thread with its own pooled connection.
pub fn spawn_writer(pool: Arc<DbPool>) -> Result<WriteHandle> {
    let mut conn = get_connection(&pool)?;
    let (sender, mut receiver) = mpsc::unbounded_channel::<WriteRequest>();

    std::thread::Builder::new()
        .name("ledger-db-writer".to_string())
        .spawn(move || {
            while let Some(WriteRequest { job, reply }) = receiver.blocking_recv() {
                let result = conn
                    .immediate_transaction::<_, TxError, _>(|tx| job(tx).map_err(TxError::Job))
                    .map_err(|err| match err {
                        TxError::Job(e) => e,
                        TxError::Diesel(e) => Error::from(StorageError::from(e)),
                    });
                if let Err(e) = &result {
                    debug!("Write job rolled back: {}", e);
                }
                // The caller may have gone away.
                let _ = reply.send(result);
            }
            debug!("Writer thread exiting");
        })
        .map_err(|e| {
            error!("Failed to start writer thread: {}", e);
            StorageError::WriterUnavailable(e.to_string())
        })?;

    Ok(WriteHandle { sender })
}
