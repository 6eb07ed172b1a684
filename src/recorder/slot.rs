//! One recording session at a time per client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::machine::{Recorder, RecorderDeps, RecorderError};

/// Hands out at most one live [`Recorder`]. Clone it freely; all clones
/// guard the same session.
#[derive(Clone, Default)]
pub struct RecorderSlot {
    busy: Arc<AtomicBool>,
}

impl RecorderSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with [`RecorderError::SessionActive`] while another recorder
    /// from this slot is alive.
    pub fn open(&self, deps: RecorderDeps) -> Result<Recorder, RecorderError> {
        let lease = self.try_lease().ok_or(RecorderError::SessionActive)?;
        Ok(Recorder::new(deps, lease))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn try_lease(&self) -> Option<SlotLease> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SlotLease {
                busy: Arc::clone(&self.busy),
            })
    }
}

/// Frees the slot when dropped.
pub(crate) struct SlotLease {
    busy: Arc<AtomicBool>,
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
