use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordsChanged;

/// Payload-free "records changed" signal owned by the record store.
///
/// Observers hold a [`ChangeSubscription`] and re-read whatever state they
/// derive from the store. Dropping the subscription unsubscribes.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<RecordsChanged>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn notify(&self) {
        // No subscribers is not an error.
        let _ = self.sender.send(RecordsChanged);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ChangeSubscription {
    receiver: broadcast::Receiver<RecordsChanged>,
}

impl ChangeSubscription {
    /// Waits for the next change. Pending notifications are coalesced so a
    /// burst of writes wakes the observer once. Returns `false` once the
    /// store has gone away.
    pub async fn changed(&mut self) -> bool {
        match self.receiver.recv().await {
            Ok(_) | Err(RecvError::Lagged(_)) => {
                self.drain();
                true
            }
            Err(RecvError::Closed) => false,
        }
    }

    /// Non-blocking variant of [`changed`](Self::changed).
    pub fn try_changed(&mut self) -> bool {
        match self.receiver.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => {
                self.drain();
                true
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
        }
    }

    fn drain(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}
