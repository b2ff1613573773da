//! Live-reload notifications.
//!
//! Tasks that change what a browser shows call [`ReloadNotifier::notify`]
//! after writing their output. The dev server subscribes to a
//! [`BroadcastReload`] and forwards each signal to connected pages.

use tokio::sync::broadcast;

/// What a connected page should refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReloadScope {
    /// Re-fetch stylesheets without a navigation
    Styles,
    /// Reload the whole page
    Page,
}

impl ReloadScope {
    /// Event name sent to the browser.
    pub fn as_str(self) -> &'static str {
        match self {
            ReloadScope::Styles => "styles",
            ReloadScope::Page => "page",
        }
    }
}

impl std::fmt::Display for ReloadScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of reload signals.
pub trait ReloadNotifier: Send + Sync {
    /// Signal that output affecting `scope` changed.
    fn notify(&self, scope: ReloadScope);
}

/// Discards every signal. Used for one-shot builds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReload;

impl ReloadNotifier for NoopReload {
    fn notify(&self, _scope: ReloadScope) {}
}

/// Fans signals out to every subscribed dev-server connection.
#[derive(Debug, Clone)]
pub struct BroadcastReload {
    sender: broadcast::Sender<ReloadScope>,
}

impl BroadcastReload {
    /// Create a channel buffering up to `capacity` undelivered signals per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future signals.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadScope> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastReload {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ReloadNotifier for BroadcastReload {
    fn notify(&self, scope: ReloadScope) {
        // send only fails when no page is connected
        let delivered = self.sender.send(scope).unwrap_or(0);
        tracing::debug!(%scope, delivered, "reload");
    }
}

/// Records every signal. Useful in tests.
#[derive(Debug, Default)]
pub struct RecordingReload {
    signals: std::sync::Mutex<Vec<ReloadScope>>,
}

impl RecordingReload {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals received so far, in order.
    pub fn signals(&self) -> Vec<ReloadScope> {
        self.signals.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ReloadNotifier for RecordingReload {
    fn notify(&self, scope: ReloadScope) {
        if let Ok(mut signals) = self.signals.lock() {
            signals.push(scope);
        }
    }
}
