use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::SlideshowConfig;
use crate::core::slideshow::{Slideshow, SlideshowState, Transition};
use crate::core::viewmodels::{Property, PropertySubscriber};

#[derive(Debug)]
pub enum SlideshowInput {
    /// Grid item selected; `len` is the list length at that moment
    Open { index: usize, len: usize },
    Press(f64),
    Release(f64),
    Next,
    Previous,
    LongPress,
    Dismiss,
    ListChanged(usize),
    /// Sent by the auto-advance timer armed under `epoch`
    TimerFired { epoch: u64 },
    /// Replies once every earlier input has been applied
    Snapshot(oneshot::Sender<SlideshowState>),
}

#[derive(Debug, Clone, Copy)]
pub struct SlideshowSettings {
    /// `None` disables auto-advance
    pub interval: Option<Duration>,
    pub swipe_threshold: f64,
}

impl Default for SlideshowSettings {
    fn default() -> Self {
        Self {
            interval: Some(Duration::from_millis(30_000)),
            swipe_threshold: crate::core::slideshow::DEFAULT_SWIPE_THRESHOLD,
        }
    }
}

impl From<&SlideshowConfig> for SlideshowSettings {
    fn from(config: &SlideshowConfig) -> Self {
        Self {
            interval: (config.interval_ms > 0).then(|| config.interval()),
            swipe_threshold: config.swipe_threshold,
        }
    }
}

/// Runs a [`Slideshow`] on its own task. All inputs, including timer
/// ticks, go through one channel, so transitions are applied one at a time.
#[derive(Debug)]
pub struct SlideshowController {
    sender: mpsc::UnboundedSender<SlideshowInput>,
    state: Property<SlideshowState>,
}

impl SlideshowController {
    pub fn spawn(settings: SlideshowSettings) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = Property::new(SlideshowState::default(), "slideshow_state");

        let worker = SlideshowWorker {
            slideshow: Slideshow::new(settings.swipe_threshold),
            interval: settings.interval,
            timer: None,
            sender: sender.downgrade(),
            state: state.clone(),
        };
        tokio::spawn(worker.run(receiver));

        Self { sender, state }
    }

    pub fn send(&self, input: SlideshowInput) {
        if self.sender.send(input).is_err() {
            debug!("Slideshow worker has stopped");
        }
    }

    pub fn open(&self, index: usize, len: usize) {
        self.send(SlideshowInput::Open { index, len });
    }

    pub fn press(&self, x: f64) {
        self.send(SlideshowInput::Press(x));
    }

    pub fn release(&self, x: f64) {
        self.send(SlideshowInput::Release(x));
    }

    pub fn next(&self) {
        self.send(SlideshowInput::Next);
    }

    pub fn previous(&self) {
        self.send(SlideshowInput::Previous);
    }

    pub fn long_press(&self) {
        self.send(SlideshowInput::LongPress);
    }

    pub fn dismiss(&self) {
        self.send(SlideshowInput::Dismiss);
    }

    pub fn list_changed(&self, len: usize) {
        self.send(SlideshowInput::ListChanged(len));
    }

    /// Last published state. Inputs still queued are not reflected.
    pub fn state(&self) -> SlideshowState {
        self.state.get()
    }

    /// State after every input sent so far has been applied.
    pub async fn snapshot(&self) -> SlideshowState {
        let (tx, rx) = oneshot::channel();
        self.send(SlideshowInput::Snapshot(tx));
        rx.await.unwrap_or_else(|_| self.state.get())
    }

    pub fn subscribe(&self) -> PropertySubscriber {
        self.state.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<SlideshowState> {
        self.state.watch()
    }
}

struct SlideshowWorker {
    slideshow: Slideshow,
    interval: Option<Duration>,
    timer: Option<JoinHandle<()>>,
    // Weak so a pending timer does not keep the worker alive
    sender: mpsc::WeakUnboundedSender<SlideshowInput>,
    state: Property<SlideshowState>,
}

impl SlideshowWorker {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<SlideshowInput>) {
        while let Some(input) = receiver.recv().await {
            self.handle(input);
        }
        self.cancel_timer();
        trace!("Slideshow worker stopped");
    }

    fn handle(&mut self, input: SlideshowInput) {
        let transition = match input {
            SlideshowInput::Open { index, len } => self.slideshow.open(index, len),
            SlideshowInput::Press(x) => {
                self.slideshow.press(x);
                Transition::Unchanged
            }
            SlideshowInput::Release(x) => self.slideshow.release(x),
            SlideshowInput::Next => self.slideshow.next(),
            SlideshowInput::Previous => self.slideshow.previous(),
            SlideshowInput::LongPress | SlideshowInput::Dismiss => self.slideshow.close(),
            SlideshowInput::ListChanged(len) => self.slideshow.list_changed(len),
            SlideshowInput::TimerFired { epoch } => self.slideshow.timer_fired(epoch),
            SlideshowInput::Snapshot(reply) => {
                let _ = reply.send(self.slideshow.state());
                return;
            }
        };

        match transition {
            Transition::Moved(index) => {
                debug!("Slideshow at {}", index);
                self.arm_timer();
            }
            Transition::Closed => {
                debug!("Slideshow closed");
                self.cancel_timer();
            }
            Transition::Unchanged => {}
        }

        let next = self.slideshow.state();
        if self.state.with(|current| *current != next) {
            self.state.set(next);
        }
    }

    fn arm_timer(&mut self) {
        self.cancel_timer();
        let Some(interval) = self.interval else {
            return;
        };
        let epoch = self.slideshow.epoch();
        let sender = self.sender.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(sender) = sender.upgrade() {
                let _ = sender.send(SlideshowInput::TimerFired { epoch });
            }
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for SlideshowWorker {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
