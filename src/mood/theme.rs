use std::sync::Arc;

use tokio::sync::watch;

use crate::models::theme::ThemeTag;

/// Holds the current [`ThemeTag`] for one identity and publishes every change.
///
/// Clones share the same tag. Readers either call [`current`](Self::current)
/// or hold a [`watch::Receiver`] from [`subscribe`](Self::subscribe).
#[derive(Clone)]
pub struct ThemeSynchronizer {
    tx: Arc<watch::Sender<ThemeTag>>,
}

impl ThemeSynchronizer {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ThemeTag::Default);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the current tag unconditionally.
    pub fn set_theme(&self, tag: ThemeTag) {
        let previous = self.tx.send_replace(tag);
        if previous != tag {
            tracing::debug!(from = %previous, to = %tag, "Theme changed");
        }
    }

    pub fn reset(&self) {
        self.set_theme(ThemeTag::Default);
    }

    pub fn current(&self) -> ThemeTag {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeTag> {
        self.tx.subscribe()
    }
}

impl Default for ThemeSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}
