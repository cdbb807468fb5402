use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Liveness token tied to the view that started an async operation.
///
/// Operations check [`ViewLifetime::is_alive`] after every await and drop
/// their results instead of writing them once the view has ended. Clones
/// share the same flag.
#[derive(Debug, Clone)]
pub struct ViewLifetime {
    alive: Arc<AtomicBool>,
}

impl ViewLifetime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Marks the view as gone; irreversible.
    pub fn end(&self) {
        self.alive.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

impl Default for ViewLifetime {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared "request in flight" flag that disables duplicate submission.
///
/// Clones observe the same flag, so a view can poll it while the owning
/// operation runs.
#[derive(Debug, Clone, Default)]
pub struct ProcessingFlag {
    busy: Arc<AtomicBool>,
}

impl ProcessingFlag {
    /// Claims the flag, or returns `None` when another operation holds it.
    #[must_use]
    pub fn try_begin(&self) -> Option<ProcessingGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases its [`ProcessingFlag`] when dropped, including when the owning
/// future is cancelled.
#[derive(Debug)]
pub struct ProcessingGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let view = ViewLifetime::new();
        let task = view.clone();
        assert!(task.is_alive());
        view.end();
        assert!(!task.is_alive());
    }

    #[test]
    fn processing_flag_admits_one_holder() {
        let flag = ProcessingFlag::default();
        let guard = flag.try_begin().unwrap();
        assert!(flag.is_processing());
        assert!(flag.clone().try_begin().is_none());

        drop(guard);
        assert!(!flag.is_processing());
        assert!(flag.try_begin().is_some());
    }
}
