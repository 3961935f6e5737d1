//! Startup session restore, refresh batching and the page-count advisory

use aidock_core::types::PageId;
use aidock_core::AppConfig;

/// Open-page count above which the advisory fires
pub const DEFAULT_PAGE_THRESHOLD: usize = 4;

/// Token for one level of refresh suppression. Hand it back to
/// `RefreshGate::exit` to close the scope.
#[must_use = "a batch scope must be closed with RefreshGate::exit"]
#[derive(Debug)]
pub struct BatchScope {
    _private: (),
}

/// Defers UI refreshes while any batch scope is open, then collapses them
/// into a single trailing refresh.
#[derive(Debug, Default)]
pub struct RefreshGate {
    depth: u32,
    pending: bool,
}

impl RefreshGate {
    pub fn enter(&mut self) -> BatchScope {
        self.depth += 1;
        BatchScope { _private: () }
    }

    /// Close a scope. Returns true when the outermost scope closed with a
    /// refresh pending; the caller refreshes exactly once.
    pub fn exit(&mut self, scope: BatchScope) -> bool {
        let BatchScope { _private: () } = scope;
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 && self.pending {
            self.pending = false;
            return true;
        }
        false
    }

    /// Ask for a refresh. Returns true if it should happen now; otherwise it
    /// is deferred to the end of the batch.
    pub fn request(&mut self) -> bool {
        if self.depth > 0 {
            self.pending = true;
            return false;
        }
        true
    }

    pub fn is_suppressed(&self) -> bool {
        self.depth > 0
    }
}

/// Edge-triggered "too many pages" advisory
#[derive(Debug, Clone)]
pub struct ThresholdNotifier {
    threshold: usize,
    armed: bool,
}

impl ThresholdNotifier {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            armed: true,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }

    /// True exactly when the count crosses from `<= threshold` to above it
    /// while armed. Dropping back to `<= threshold` re-arms.
    pub fn notify_page_count_changed(&mut self, old: usize, new: usize) -> bool {
        if new <= self.threshold {
            self.armed = true;
            return false;
        }

        if self.armed && old <= self.threshold {
            self.armed = false;
            return true;
        }
        false
    }

    /// Sync the arm state to a count reached without notifications
    /// (e.g. after a silent restore)
    pub fn prime(&mut self, count: usize) {
        self.armed = count <= self.threshold;
    }
}

impl Default for ThresholdNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_THRESHOLD)
    }
}

/// One persisted page to bring back at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreEntry {
    pub platform_id: String,
    pub page_id: PageId,
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum RestorePhase {
    #[default]
    Pending,
    Running,
    Done,
}

/// One-shot guard around the startup restore
#[derive(Debug, Default)]
pub struct SessionRestorer {
    phase: RestorePhase,
}

impl SessionRestorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages to restore, in platform order then creation order
    pub fn plan(config: &AppConfig) -> Vec<RestoreEntry> {
        config
            .persisted_windows()
            .into_iter()
            .map(|(platform_id, page_id, created_at)| RestoreEntry {
                platform_id,
                page_id,
                created_at,
            })
            .collect()
    }

    /// Returns false if a restore already ran or is running
    pub fn start(&mut self) -> bool {
        if self.phase != RestorePhase::Pending {
            return false;
        }
        self.phase = RestorePhase::Running;
        true
    }

    pub fn finish(&mut self) {
        self.phase = RestorePhase::Done;
    }

    pub fn is_running(&self) -> bool {
        self.phase == RestorePhase::Running
    }

    pub fn is_done(&self) -> bool {
        self.phase == RestorePhase::Done
    }
}
