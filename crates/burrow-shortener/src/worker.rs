use crate::shutdown::ShutdownSignal;
use burrow_core::{DeletionRequest, Repository, ShortenerError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Producer side of the deletion queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DeletionQueue {
    sender: mpsc::UnboundedSender<DeletionRequest>,
}

/// Consumer side of the deletion queue, handed to exactly one worker.
#[derive(Debug)]
pub struct DeletionReceiver {
    receiver: mpsc::UnboundedReceiver<DeletionRequest>,
}

/// Creates an unbounded deletion queue.
pub fn deletion_queue() -> (DeletionQueue, DeletionReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (DeletionQueue { sender }, DeletionReceiver { receiver })
}

#[cfg(test)]
impl DeletionReceiver {
    pub(crate) fn try_recv(&mut self) -> Option<DeletionRequest> {
        self.receiver.try_recv().ok()
    }
}

impl DeletionQueue {
    /// Enqueues without waiting. Fails only when the worker is gone.
    pub fn enqueue(&self, request: DeletionRequest) -> Result<(), ShortenerError> {
        self.sender
            .send(request)
            .map_err(|_| ShortenerError::QueueClosed)
    }
}

/// Single consumer applying queued deletions to the backend.
///
/// Requests are applied strictly one after another. A failed request is
/// logged and dropped. Once shutdown is triggered the worker stops without
/// reading further items; if the queue closes first it idles until
/// shutdown.
pub struct DeletionWorker<R: ?Sized> {
    repository: Arc<R>,
    queue: DeletionReceiver,
    shutdown: ShutdownSignal,
}

impl<R: Repository + ?Sized> DeletionWorker<R> {
    pub fn new(repository: Arc<R>, queue: DeletionReceiver, shutdown: ShutdownSignal) -> Self {
        Self {
            repository,
            queue,
            shutdown,
        }
    }

    /// Runs the worker on the tokio runtime. The handle completes when the
    /// worker has stopped.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("deletion worker started");
        let mut open = true;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                request = self.queue.receiver.recv(), if open => match request {
                    Some(request) => self.apply(request).await,
                    None => {
                        warn!("deletion queue closed, waiting for shutdown");
                        open = false;
                    }
                },
            }
        }

        info!("deletion worker stopped");
    }

    async fn apply(&self, request: DeletionRequest) {
        let DeletionRequest { owner, codes } = request;
        debug!(owner, count = codes.len(), "applying deletion request");

        match self.repository.delete_batch(&codes, owner).await {
            Ok(affected) => {
                info!(owner, requested = codes.len(), affected, "soft-deleted short urls");
            }
            Err(err) => {
                error!(owner, requested = codes.len(), error = %err, "dropping deletion request");
            }
        }
    }
}
