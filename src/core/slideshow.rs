//! Full-screen viewer navigation: gestures and an auto-advance timer move
//! an index around a circular list.

use tracing::{debug, trace};

pub const DEFAULT_SWIPE_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlideshowPhase {
    #[default]
    Closed,
    Open(usize),
}

/// Observable snapshot of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SlideshowState {
    pub phase: SlideshowPhase,
    /// Length of the list being viewed
    pub max_index: usize,
    /// Reference x position for the next swipe
    pub last_touch_x: f64,
    /// Bumped on every index change; an armed timer carries the value it
    /// saw and is ignored if it no longer matches.
    pub epoch: u64,
}

impl SlideshowState {
    pub fn is_open(&self) -> bool {
        matches!(self.phase, SlideshowPhase::Open(_))
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            SlideshowPhase::Open(index) => Some(index),
            SlideshowPhase::Closed => None,
        }
    }
}

/// What a transition did, so the driver knows whether to re-arm its timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Moved(usize),
    Closed,
}

#[derive(Debug, Clone)]
pub struct Slideshow {
    state: SlideshowState,
    swipe_threshold: f64,
}

impl Default for Slideshow {
    fn default() -> Self {
        Self::new(DEFAULT_SWIPE_THRESHOLD)
    }
}

impl Slideshow {
    pub fn new(swipe_threshold: f64) -> Self {
        Self {
            state: SlideshowState::default(),
            swipe_threshold: swipe_threshold.abs(),
        }
    }

    pub fn state(&self) -> SlideshowState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.state.epoch
    }

    /// Open at `index` of a list of `len` items. The list length is taken
    /// here so navigation never works against a stale count.
    pub fn open(&mut self, index: usize, len: usize) -> Transition {
        self.state.max_index = len;
        if len == 0 {
            debug!("Ignoring slideshow open on an empty list");
            return self.close();
        }
        let index = index.min(len - 1);
        self.move_to(index)
    }

    pub fn press(&mut self, x: f64) {
        if self.state.is_open() {
            self.state.last_touch_x = x;
        }
    }

    /// Finish a swipe that started at the last press.
    pub fn release(&mut self, x: f64) -> Transition {
        let Some(index) = self.state.current_index() else {
            return Transition::Unchanged;
        };
        let delta = x - self.state.last_touch_x;
        if delta > self.swipe_threshold {
            self.move_to(self.wrap_forward(index))
        } else if delta < -self.swipe_threshold {
            self.move_to(self.wrap_backward(index))
        } else {
            trace!("Swipe of {:.1} below threshold", delta);
            self.state.last_touch_x = x;
            Transition::Unchanged
        }
    }

    pub fn next(&mut self) -> Transition {
        match self.state.current_index() {
            Some(index) => self.move_to(self.wrap_forward(index)),
            None => Transition::Unchanged,
        }
    }

    pub fn previous(&mut self) -> Transition {
        match self.state.current_index() {
            Some(index) => self.move_to(self.wrap_backward(index)),
            None => Transition::Unchanged,
        }
    }

    /// Auto-advance. Only the timer armed for the current index counts.
    pub fn timer_fired(&mut self, epoch: u64) -> Transition {
        if epoch != self.state.epoch {
            trace!("Stale slideshow timer (epoch {} != {})", epoch, self.state.epoch);
            return Transition::Unchanged;
        }
        self.next()
    }

    /// Long-press or an external dismiss.
    pub fn close(&mut self) -> Transition {
        if !self.state.is_open() {
            return Transition::Unchanged;
        }
        self.state.phase = SlideshowPhase::Closed;
        self.state.epoch += 1;
        Transition::Closed
    }

    /// The underlying list changed length.
    pub fn list_changed(&mut self, len: usize) -> Transition {
        self.state.max_index = len;
        match self.state.current_index() {
            Some(_) if len == 0 => self.close(),
            Some(index) if index >= len => self.move_to(len - 1),
            _ => Transition::Unchanged,
        }
    }

    fn wrap_forward(&self, index: usize) -> usize {
        (index + 1) % self.state.max_index
    }

    fn wrap_backward(&self, index: usize) -> usize {
        let n = self.state.max_index;
        (index + n - 1) % n
    }

    fn move_to(&mut self, index: usize) -> Transition {
        self.state.phase = SlideshowPhase::Open(index);
        self.state.epoch += 1;
        Transition::Moved(index)
    }
}
