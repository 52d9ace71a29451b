//! Scroll spy: tracks which outline entry matches the part of the document
//! in view.
//!
//! The viewport plays the role of an intersection observer. A
//! [`HeadingObserver`] is created per outline and stamps every report with
//! its generation; reports from an observer that has since been torn down
//! are dropped by [`ScrollSpy::on_intersections`].

use std::ops::Range;

use tracing::debug;

/// Whether viewport updates move the highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpyMode {
    /// The topmost heading in view is highlighted
    #[default]
    Following,
    /// A manual selection is pinned; viewport updates are ignored
    Locked,
}

/// One observed heading's relation to the viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intersection {
    pub id: String,
    /// Rendered line of the heading
    pub top: usize,
    pub intersecting: bool,
}

/// Batch of intersections produced by one observer pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntersectionReport {
    pub generation: u64,
    pub entries: Vec<Intersection>,
}

/// Watches a fixed set of heading lines against a viewport line range.
#[derive(Debug, Clone)]
pub struct HeadingObserver {
    generation: u64,
    targets: Vec<(String, usize)>,
}

impl HeadingObserver {
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn targets(&self) -> &[(String, usize)] {
        &self.targets
    }

    /// Report every target against the visible line range.
    pub fn observe(&self, visible: Range<usize>) -> IntersectionReport {
        IntersectionReport {
            generation: self.generation,
            entries: self
                .targets
                .iter()
                .map(|(id, line)| Intersection {
                    id: id.clone(),
                    top: *line,
                    intersecting: visible.contains(line),
                })
                .collect(),
        }
    }
}

/// Active-entry tracking for the page outline.
#[derive(Debug, Default)]
pub struct ScrollSpy {
    mode: SpyMode,
    active: Option<String>,
    observer: Option<HeadingObserver>,
    next_generation: u64,
}

impl ScrollSpy {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn mode(&self) -> SpyMode {
        self.mode
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub const fn observer(&self) -> Option<&HeadingObserver> {
        self.observer.as_ref()
    }

    pub const fn is_mounted(&self) -> bool {
        self.observer.is_some()
    }

    /// Start observing `targets`, replacing any previous observer.
    ///
    /// Returns the new observer's generation, or `None` when there is
    /// nothing to observe (no observer is created then).
    pub fn mount(&mut self, targets: Vec<(String, usize)>) -> Option<u64> {
        self.teardown();
        if targets.is_empty() {
            return None;
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        debug!(generation, targets = targets.len(), "scroll spy mounted");
        self.observer = Some(HeadingObserver {
            generation,
            targets,
        });
        Some(generation)
    }

    /// Drop the current observer. Reports it produced become stale.
    pub fn teardown(&mut self) {
        if let Some(old) = self.observer.take() {
            debug!(generation = old.generation, "scroll spy torn down");
        }
    }

    /// Forget everything about the previous outline: observer, highlight and
    /// any pin.
    pub fn reset(&mut self) {
        self.teardown();
        self.active = None;
        self.set_mode(SpyMode::Following);
    }

    /// Apply a viewport report.
    ///
    /// Returns true when the active entry changed.
    pub fn on_intersections(&mut self, report: &IntersectionReport) -> bool {
        let current = self.observer.as_ref().map(HeadingObserver::generation);
        if current != Some(report.generation) {
            debug!(
                generation = report.generation,
                ?current,
                "ignoring report from stale observer"
            );
            return false;
        }
        if self.mode == SpyMode::Locked {
            return false;
        }
        let Some(topmost) = report
            .entries
            .iter()
            .filter(|entry| entry.intersecting)
            .min_by_key(|entry| entry.top)
        else {
            return false;
        };
        if self.active.as_deref() == Some(topmost.id.as_str()) {
            return false;
        }
        self.active = Some(topmost.id.clone());
        true
    }

    /// Pin `id` as the active entry and stop following the viewport.
    pub fn pin(&mut self, id: &str) {
        self.active = Some(id.to_string());
        self.set_mode(SpyMode::Locked);
    }

    /// Resume following the viewport. The current highlight stays until the
    /// next report moves it.
    pub fn unlock(&mut self) {
        self.set_mode(SpyMode::Following);
    }

    fn set_mode(&mut self, mode: SpyMode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "scroll spy mode");
            self.mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> Vec<(String, usize)> {
        vec![
            ("a".to_string(), 0),
            ("b".to_string(), 10),
            ("c".to_string(), 20),
            ("d".to_string(), 40),
        ]
    }

    fn report(spy: &ScrollSpy, visible: Range<usize>) -> IntersectionReport {
        spy.observer().unwrap().observe(visible)
    }

    #[test]
    fn test_following_highlights_topmost_intersecting() {
        let mut spy = ScrollSpy::new();
        spy.mount(targets()).unwrap();

        let r = report(&spy, 18..45);
        assert!(spy.on_intersections(&r));
        assert_eq!(spy.active(), Some("c"));
    }

    #[test]
    fn test_no_intersection_keeps_previous_active() {
        let mut spy = ScrollSpy::new();
        spy.mount(targets()).unwrap();
        spy.on_intersections(&report(&spy, 5..15));
        assert_eq!(spy.active(), Some("b"));

        assert!(!spy.on_intersections(&report(&spy, 25..35)));
        assert_eq!(spy.active(), Some("b"));
    }

    #[test]
    fn test_pin_locks_until_reset() {
        let mut spy = ScrollSpy::new();
        spy.mount(targets()).unwrap();
        spy.on_intersections(&report(&spy, 20..30));
        assert_eq!(spy.active(), Some("c"));

        spy.pin("b");
        assert_eq!(spy.mode(), SpyMode::Locked);
        assert_eq!(spy.active(), Some("b"));
        assert!(!spy.on_intersections(&report(&spy, 35..50)));
        assert_eq!(spy.active(), Some("b"));

        spy.reset();
        assert_eq!(spy.mode(), SpyMode::Following);
        assert_eq!(spy.active(), None);
        assert!(!spy.is_mounted());
    }

    #[test]
    fn test_unlock_resumes_following() {
        let mut spy = ScrollSpy::new();
        spy.mount(targets()).unwrap();
        spy.pin("a");
        spy.unlock();
        assert_eq!(spy.active(), Some("a"));
        spy.on_intersections(&report(&spy, 39..41));
        assert_eq!(spy.active(), Some("d"));
    }

    #[test]
    fn test_stale_observer_reports_are_dropped() {
        let mut spy = ScrollSpy::new();
        spy.mount(targets()).unwrap();
        let stale = report(&spy, 0..5);

        let generation = spy.mount(vec![("x".to_string(), 3)]).unwrap();
        assert_ne!(generation, stale.generation);
        assert!(!spy.on_intersections(&stale));
        assert_eq!(spy.active(), None);

        spy.teardown();
        assert!(!spy.on_intersections(&stale));
    }

    #[test]
    fn test_mount_without_targets_creates_no_observer() {
        let mut spy = ScrollSpy::new();
        spy.mount(targets()).unwrap();
        assert_eq!(spy.mount(Vec::new()), None);
        assert!(!spy.is_mounted());
    }
}
