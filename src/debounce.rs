//! Debounced scheduling for search input.
//!
//! Each [`Debouncer::schedule`] spawns a tokio task that waits out the delay
//! and then runs the action. Scheduling again aborts the previous task if it
//! has not fired yet, so only the last input in a burst takes effect.
//!
//! Both types must be used from within a tokio runtime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default quiet period before search text is committed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Runs only the most recently scheduled action, after a quiet period.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action` after the delay, aborting any earlier pending one.
    pub fn schedule<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }

    /// Abort the pending action. Returns whether one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let live = !handle.is_finished();
                handle.abort();
                live
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Text input whose value is published to subscribers only after it settles.
#[derive(Debug)]
pub struct DebouncedText {
    debouncer: Debouncer,
    committed: Arc<watch::Sender<String>>,
}

impl DebouncedText {
    pub fn new(delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(String::new());
        Self {
            debouncer: Debouncer::new(delay),
            committed: Arc::new(tx),
        }
    }

    /// Record a keystroke; the text is committed once input goes quiet.
    pub fn input(&mut self, text: impl Into<String>) {
        let text = text.into();
        let committed = Arc::clone(&self.committed);
        self.debouncer.schedule(async move {
            committed.send_replace(text);
        });
    }

    /// Commit `text` immediately, dropping any pending input.
    pub fn commit(&mut self, text: impl Into<String>) {
        self.debouncer.cancel();
        self.committed.send_replace(text.into());
    }

    pub fn committed(&self) -> String {
        self.committed.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.committed.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}
