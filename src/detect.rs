//! Change detection for values mirrored onto display surfaces.

/// `true` when `current` differs from `previous`, or when nothing was seen yet.
pub fn should_update<T: PartialEq>(previous: Option<&T>, current: &T) -> bool {
    previous != Some(current)
}

/// Remembers the last value that was pushed downstream.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector<T> {
    last: Option<T>,
}

impl<T: PartialEq + Clone> ChangeDetector<T> {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }

    /// `true` when `current` would count as a change, without recording it.
    pub fn differs(&self, current: &T) -> bool {
        should_update(self.last.as_ref(), current)
    }

    /// Compare against the last value and remember `current` when it changed.
    pub fn observe(&mut self, current: &T) -> bool {
        if !should_update(self.last.as_ref(), current) {
            return false;
        }
        self.last = Some(current.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatsSnapshot;

    fn snap(subscribers: u64, views: u64, video_count: u64) -> StatsSnapshot {
        StatsSnapshot {
            subscribers,
            views,
            video_count,
        }
    }

    #[test]
    fn first_observation_is_a_change() {
        assert!(should_update(None, &snap(0, 0, 0)));
    }

    #[test]
    fn identical_tuple_is_not_a_change() {
        let s = snap(100, 200, 5);
        assert!(!should_update(Some(&s), &s));
        assert!(should_update(Some(&s), &snap(101, 200, 5)));
        assert!(should_update(Some(&s), &snap(100, 200, 6)));
    }

    #[test]
    fn differs_leaves_last_value_alone() {
        let mut detector = ChangeDetector::new();
        assert!(detector.differs(&snap(1, 1, 1)));
        assert!(detector.last().is_none());
        detector.observe(&snap(1, 1, 1));
        assert!(!detector.differs(&snap(1, 1, 1)));
    }

    #[test]
    fn detector_reports_repeat_as_unchanged() {
        let mut detector = ChangeDetector::new();
        assert!(detector.observe(&snap(100, 200, 5)));
        assert!(!detector.observe(&snap(100, 200, 5)));
        assert!(detector.observe(&snap(101, 200, 5)));
        assert_eq!(detector.last(), Some(&snap(101, 200, 5)));
    }
}
