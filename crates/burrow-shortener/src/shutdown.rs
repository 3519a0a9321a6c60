use std::sync::Arc;
use tokio::sync::watch;

/// Process-wide cancellation trigger.
///
/// Cloning shares the same trigger. Dropping every clone counts as a
/// trigger too, so a worker can never outlive its coordinator.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Fires the signal. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// A new listener for this trigger.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Listening side of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Completes once shutdown has been triggered, immediately if it
    /// already was.
    pub async fn cancelled(&mut self) {
        // an error means the trigger is gone, which is a shutdown as well
        let _ = self.receiver.wait_for(|triggered| *triggered).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_wakes_every_listener() {
        let shutdown = Shutdown::new();
        let mut first = shutdown.signal();
        let mut second = shutdown.signal();

        let waiters = tokio::spawn(async move {
            first.cancelled().await;
            second.cancelled().await;
        });

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiters)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn late_listener_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();

        let mut signal = shutdown.signal();
        tokio::time::timeout(Duration::from_millis(50), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dropping_the_trigger_cancels() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.signal();
        drop(shutdown);

        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn untriggered_signal_stays_pending() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.signal();

        let waited = tokio::time::timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(waited.is_err());
        drop(shutdown);
    }
}
