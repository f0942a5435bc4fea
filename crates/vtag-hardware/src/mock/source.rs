//! Mock virtual tag status source for testing and development.
//!
//! The source side is handed to a reader session; the handle side plays the
//! role of whatever selects and toggles the active virtual tag (a menu, an
//! overlay, a test).

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use vtag_core::TagStatus;

use super::MockVirtualTag;
use crate::{
    HardwareError, Result,
    traits::{StatusSource, VirtualTag},
};

/// Current status and selection shared between the source and its handle.
#[derive(Debug, Clone)]
struct SourceState {
    status: TagStatus,
    tag: Option<Arc<MockVirtualTag>>,
}

#[derive(Debug, Default)]
struct Counters {
    samples: AtomicU64,
    pending_failures: AtomicU32,
}

/// Mock status source backed by a `watch` channel.
///
/// # Examples
///
/// ```
/// use vtag_hardware::mock::{MockTagSource, MockVirtualTag};
/// use vtag_hardware::traits::StatusSource;
/// use vtag_core::TagStatus;
///
/// let (source, handle) = MockTagSource::new();
///
/// handle.present(MockVirtualTag::new("Mario", vec![0x04, 0x01, 0x02, 0x03]));
/// assert_eq!(source.sample_status().unwrap(), TagStatus::Connected);
/// assert_eq!(source.active_tag().unwrap().unwrap().name(), "Mario");
///
/// handle.remove();
/// assert_eq!(source.sample_status().unwrap(), TagStatus::Disconnected);
/// ```
#[derive(Debug)]
pub struct MockTagSource {
    state_rx: watch::Receiver<SourceState>,
    counters: Arc<Counters>,
    name: String,
}

impl MockTagSource {
    /// Create a new source with no tag selected and status `Disconnected`.
    ///
    /// Returns a tuple of (MockTagSource, MockTagSourceHandle) where the
    /// handle controls what the source reports.
    pub fn new() -> (Self, MockTagSourceHandle) {
        Self::with_name("Mock Tag Source".to_string())
    }

    /// Create a new source with a custom name.
    pub fn with_name(name: String) -> (Self, MockTagSourceHandle) {
        let (state_tx, state_rx) = watch::channel(SourceState {
            status: TagStatus::Disconnected,
            tag: None,
        });
        let counters = Arc::new(Counters::default());

        let source = Self {
            state_rx,
            counters: Arc::clone(&counters),
            name: name.clone(),
        };

        let handle = MockTagSourceHandle {
            state_tx: Arc::new(state_tx),
            counters,
            name,
        };

        (source, handle)
    }
}

impl StatusSource for MockTagSource {
    fn sample_status(&self) -> Result<TagStatus> {
        if self.state_rx.has_changed().is_err() {
            return Err(HardwareError::disconnected(self.name.clone()));
        }

        self.counters.samples.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .counters
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(HardwareError::communication("injected status failure"));
        }

        Ok(self.state_rx.borrow().status)
    }

    fn active_tag(&self) -> Result<Option<Arc<dyn VirtualTag>>> {
        let tag = self.state_rx.borrow().tag.clone();
        Ok(tag.map(|t| t as Arc<dyn VirtualTag>))
    }
}

/// Handle for controlling a [`MockTagSource`].
///
/// Clones control the same source.
#[derive(Debug, Clone)]
pub struct MockTagSourceHandle {
    state_tx: Arc<watch::Sender<SourceState>>,
    counters: Arc<Counters>,
    name: String,
}

impl MockTagSourceHandle {
    /// Select the active tag without changing the presence status.
    pub fn select_tag(&self, tag: MockVirtualTag) {
        self.state_tx
            .send_modify(|state| state.tag = Some(Arc::new(tag)));
    }

    /// Clear the active tag selection.
    pub fn clear_tag(&self) {
        self.state_tx.send_modify(|state| state.tag = None);
    }

    /// Report the tag as connected.
    pub fn connect(&self) {
        self.set_status(TagStatus::Connected);
    }

    /// Report the tag as disconnected.
    pub fn disconnect(&self) {
        self.set_status(TagStatus::Disconnected);
    }

    /// Select a tag and report it connected.
    pub fn present(&self, tag: MockVirtualTag) {
        self.state_tx.send_modify(|state| {
            state.tag = Some(Arc::new(tag));
            state.status = TagStatus::Connected;
        });
    }

    /// Take the tag off the reader. The selection is kept.
    pub fn remove(&self) {
        self.disconnect();
    }

    /// Make the next `count` status samples fail.
    pub fn fail_next_samples(&self, count: u32) {
        self.counters
            .pending_failures
            .store(count, Ordering::SeqCst);
    }

    /// Current presence status.
    pub fn status(&self) -> TagStatus {
        self.state_tx.borrow().status
    }

    /// Name of the active tag, if any.
    pub fn active_tag_name(&self) -> Option<String> {
        self.state_tx
            .borrow()
            .tag
            .as_ref()
            .map(|t| t.name().to_string())
    }

    /// Number of status samples taken so far, failed ones included.
    pub fn sample_count(&self) -> u64 {
        self.counters.samples.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` more samples have been taken.
    ///
    /// Useful to let a poller observe a status change before asserting.
    pub async fn wait_for_samples(&self, count: u64) {
        let target = self.sample_count() + count;
        while self.sample_count() < target {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Get the source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn set_status(&self, status: TagStatus) {
        self.state_tx.send_modify(|state| state.status = status);
    }
}
