//! Live-broadcast status detection from the channel's `/live` page markup.
//!
//! Matching relies on undocumented page structure and breaks when the page
//! changes; callers only see the [`LiveClassifier`] trait so the strategy can
//! be replaced.
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::error::FetchError;
use crate::model::LiveState;

static CANONICAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<link[^>]+rel=["']canonical["'][^>]+href=["']([^"']+)["']"#)
        .expect("valid canonical link regex")
});

const LIVE_MARKERS: [&str; 2] = [r#""isLiveBroadcast":true"#, r#""status":"LIVE""#];
const OFFLINE_MARKERS: [&str; 2] = [r#""isLiveBroadcast":false"#, r#""status":"OFFLINE""#];
const UPCOMING_MARKERS: [&str; 2] = [r#""isUpcoming":true"#, r#""upcomingEventData""#];

/// Fetches a secondary page (the canonical watch page).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
pub trait LiveClassifier: Send + Sync {
    async fn classify(&self, markup: &str) -> LiveState;
}

pub struct MarkupClassifier {
    fetcher: Arc<dyn PageFetcher>,
    dump_path: Option<PathBuf>,
}

impl MarkupClassifier {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            dump_path: None,
        }
    }

    /// Write inconclusive markup to `path` for later inspection.
    pub fn with_dump_path(mut self, path: PathBuf) -> Self {
        self.dump_path = Some(path);
        self
    }

    async fn dump(&self, markup: &str) {
        let Some(path) = &self.dump_path else {
            return;
        };
        match tokio::fs::write(path, markup).await {
            Ok(()) => info!(path = %path.display(), "dumped inconclusive live page"),
            Err(err) => warn!(error = %err, path = %path.display(), "failed to dump live page"),
        }
    }
}

#[async_trait]
impl LiveClassifier for MarkupClassifier {
    async fn classify(&self, markup: &str) -> LiveState {
        if let Some(target) = canonical_target(markup) {
            if target.contains("/watch") {
                return match self.fetcher.fetch_page(target).await {
                    Ok(watch) => classify_watch_page(&watch),
                    Err(err) => {
                        warn!(error = %err, url = target, "failed to follow canonical watch URL");
                        LiveState::Live
                    }
                };
            }
            if target.contains("/channel/") {
                return LiveState::Offline;
            }
        }

        let state = classify_page(markup);
        if state == LiveState::Unknown {
            self.dump(markup).await;
        }
        state
    }
}

pub fn canonical_target(markup: &str) -> Option<&str> {
    CANONICAL_RE
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn contains_any(markup: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| markup.contains(m))
}

/// A canonical link pointing at a watch page is itself a strong live signal, so
/// an inconclusive watch page still counts as live.
pub fn classify_watch_page(markup: &str) -> LiveState {
    if contains_any(markup, &LIVE_MARKERS) {
        LiveState::Live
    } else if contains_any(markup, &UPCOMING_MARKERS) {
        LiveState::Upcoming
    } else if contains_any(markup, &OFFLINE_MARKERS) {
        LiveState::Offline
    } else {
        LiveState::Live
    }
}

/// Flags in the `/live` page itself; upcoming markers are checked last.
pub fn classify_page(markup: &str) -> LiveState {
    if contains_any(markup, &LIVE_MARKERS) {
        LiveState::Live
    } else if contains_any(markup, &OFFLINE_MARKERS) {
        LiveState::Offline
    } else if contains_any(markup, &UPCOMING_MARKERS) {
        LiveState::Upcoming
    } else {
        LiveState::Unknown
    }
}

/// Tracks the last resolved live state.
#[derive(Debug, Clone, Default)]
pub struct LiveTracker {
    last: Option<LiveState>,
}

impl LiveTracker {
    pub fn last(&self) -> Option<LiveState> {
        self.last
    }

    pub fn is_transition(&self, state: LiveState) -> bool {
        state.is_resolved() && self.last != Some(state)
    }

    /// Returns the new state when `state` is resolved and differs from the last
    /// resolved one. `Unknown` is ignored.
    pub fn observe(&mut self, state: LiveState) -> Option<LiveState> {
        if !self.is_transition(state) {
            return None;
        }
        self.last = Some(state);
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct StubFetcher {
        page: Option<String>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn returning(page: &str) -> Arc<Self> {
            Arc::new(Self {
                page: Some(page.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                page: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch_page(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.page.clone().ok_or_else(|| FetchError::NoItems("stub".into()))
        }
    }

    const WATCH_CANONICAL: &str =
        r#"<html><link rel="canonical" href="https://www.youtube.com/watch?v=xyz"></html>"#;
    const CHANNEL_CANONICAL: &str =
        r#"<html><link rel="canonical" href="https://www.youtube.com/channel/UC1"></html>"#;

    #[tokio::test]
    async fn watch_canonical_follows_secondary_page() {
        let fetcher = StubFetcher::returning(r#"{"isUpcoming":true}"#);
        let classifier = MarkupClassifier::new(fetcher.clone());
        assert_eq!(classifier.classify(WATCH_CANONICAL).await, LiveState::Upcoming);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let classifier = MarkupClassifier::new(StubFetcher::returning(r#""status":"OFFLINE""#));
        assert_eq!(classifier.classify(WATCH_CANONICAL).await, LiveState::Offline);

        let classifier =
            MarkupClassifier::new(StubFetcher::returning(r#""isLiveBroadcast":true"#));
        assert_eq!(classifier.classify(WATCH_CANONICAL).await, LiveState::Live);
    }

    #[tokio::test]
    async fn failed_watch_fetch_falls_back_to_live() {
        let classifier = MarkupClassifier::new(StubFetcher::failing());
        assert_eq!(classifier.classify(WATCH_CANONICAL).await, LiveState::Live);
    }

    #[tokio::test]
    async fn channel_canonical_is_offline_without_fetching() {
        let fetcher = StubFetcher::failing();
        let classifier = MarkupClassifier::new(fetcher.clone());
        let markup = format!(r#"{CHANNEL_CANONICAL}"isLiveBroadcast":true"#);
        assert_eq!(classifier.classify(&markup).await, LiveState::Offline);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn raw_page_priority() {
        assert_eq!(classify_page(r#""status":"LIVE" "isUpcoming":true"#), LiveState::Live);
        assert_eq!(
            classify_page(r#""isLiveBroadcast":false "upcomingEventData""#),
            LiveState::Offline
        );
        assert_eq!(classify_page(r#""upcomingEventData":{}"#), LiveState::Upcoming);
        assert_eq!(classify_page("<html></html>"), LiveState::Unknown);
    }

    #[test]
    fn inconclusive_watch_page_counts_as_live() {
        assert_eq!(classify_watch_page("<html>no flags here</html>"), LiveState::Live);
        assert_eq!(classify_watch_page(""), LiveState::Live);
        assert_eq!(
            classify_watch_page(r#""isLiveBroadcast":false"#),
            LiveState::Offline
        );
    }

    #[test]
    fn transition_check_does_not_record() {
        let mut tracker = LiveTracker::default();
        assert!(tracker.is_transition(LiveState::Live));
        assert!(!tracker.is_transition(LiveState::Unknown));
        assert_eq!(tracker.last(), None);
        tracker.observe(LiveState::Live);
        assert!(!tracker.is_transition(LiveState::Live));
    }

    #[test]
    fn canonical_regex_is_case_insensitive() {
        let markup = r#"<LINK REL='canonical' HREF='https://x/watch?v=1'>"#;
        assert_eq!(canonical_target(markup), Some("https://x/watch?v=1"));
        assert_eq!(canonical_target("<link rel=\"alternate\" href=\"x\">"), None);
    }

    #[tokio::test]
    async fn unknown_dumps_markup_and_is_stable() {
        let td = tempdir().unwrap();
        let path = td.path().join("debug_live.html");
        let classifier =
            MarkupClassifier::new(StubFetcher::failing()).with_dump_path(path.clone());
        let markup = "<html><body>consent wall</body></html>";
        assert_eq!(classifier.classify(markup).await, LiveState::Unknown);
        assert_eq!(classifier.classify(markup).await, LiveState::Unknown);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), markup);
    }

    #[test]
    fn tracker_ignores_unknown_and_repeats() {
        let mut tracker = LiveTracker::default();
        assert_eq!(tracker.observe(LiveState::Unknown), None);
        assert_eq!(tracker.observe(LiveState::Offline), Some(LiveState::Offline));
        assert_eq!(tracker.observe(LiveState::Offline), None);
        assert_eq!(tracker.observe(LiveState::Unknown), None);
        assert_eq!(tracker.last(), Some(LiveState::Offline));
        assert_eq!(tracker.observe(LiveState::Live), Some(LiveState::Live));
    }
}
