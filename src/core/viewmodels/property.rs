use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

pub struct PropertySubscriber {
    receiver: broadcast::Receiver<()>,
}

// PropertySubscriber intentionally does not implement Clone.
// Each subscriber should be unique to avoid conflicts.
// To get multiple subscribers, call Property::subscribe() multiple times.

impl PropertySubscriber {
    pub async fn wait_for_change(&mut self) -> bool {
        loop {
            match self.receiver.recv().await {
                Ok(_) => return true,
                // Missed ticks still mean the value changed
                Err(broadcast::error::RecvError::Lagged(_)) => return true,
                // Channel closed: no more updates
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    }

    pub fn try_recv(&mut self) -> bool {
        match self.receiver.try_recv() {
            Ok(_) => true,
            Err(broadcast::error::TryRecvError::Empty) => false,
            // Consider lag as a change signal; the next recv() will align
            Err(broadcast::error::TryRecvError::Lagged(_)) => true,
            Err(broadcast::error::TryRecvError::Closed) => false,
        }
    }
}

/// Observable value. Readers get a snapshot, subscribers get a tick per
/// change.
pub struct Property<T: Clone + Send + Sync> {
    watch_sender: Arc<watch::Sender<T>>,
    watch_receiver: watch::Receiver<T>,
    broadcast_sender: broadcast::Sender<()>,
    name: String,
}

impl<T: Clone + Send + Sync> Property<T> {
    pub fn new(initial_value: T, name: impl Into<String>) -> Self {
        let (watch_sender, watch_receiver) = watch::channel(initial_value);
        let (broadcast_sender, _) = broadcast::channel(100);
        Self {
            watch_sender: Arc::new(watch_sender),
            watch_receiver,
            broadcast_sender,
            name: name.into(),
        }
    }

    pub fn get(&self) -> T {
        self.watch_receiver.borrow().clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.watch_receiver.borrow())
    }

    pub fn set(&self, new_value: T) {
        self.watch_sender.send_replace(new_value);
        let _ = self.broadcast_sender.send(());
    }

    /// Mutate in place. The write happens under the channel lock so
    /// concurrent updaters cannot lose each other's changes.
    pub fn update<F>(&self, updater: F)
    where
        F: FnOnce(&mut T),
    {
        self.watch_sender.send_modify(updater);
        let _ = self.broadcast_sender.send(());
    }

    /// Like [`update`](Self::update) but only notifies when `updater`
    /// reports a change. Returns whether it did.
    pub fn update_if<F>(&self, updater: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        let modified = self.watch_sender.send_if_modified(updater);
        if modified {
            let _ = self.broadcast_sender.send(());
        }
        modified
    }

    pub fn subscribe(&self) -> PropertySubscriber {
        PropertySubscriber {
            receiver: self.broadcast_sender.subscribe(),
        }
    }

    /// A watch receiver that always sees the latest value. Useful for
    /// awaiting a condition with `wait_for`.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.watch_sender.subscribe()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Debug method to show the number of active subscribers
    pub fn debug_subscribers(&self) -> usize {
        self.broadcast_sender.receiver_count()
    }
}

impl<T: Clone + Send + Sync> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            watch_sender: self.watch_sender.clone(),
            watch_receiver: self.watch_receiver.clone(),
            broadcast_sender: self.broadcast_sender.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + Debug> Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Property({})", self.name)
    }
}
