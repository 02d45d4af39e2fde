//! Live Stream Session
//!
//! Idle/Streaming state machine for the live detection feed. While streaming
//! the UI is bound to the server's continuously updating image resource and a
//! ticker refreshes live statistics once per period.

pub mod recent;
pub mod source;
pub mod ticker;

pub use recent::{RecentEvent, RecentLog};
pub use source::{LiveStatsSource, PlaceholderSource};
pub use ticker::Ticker;

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::client::DetectionService;
use crate::pipeline::DetectionStats;
use crate::shared::{UiSink, UiUpdate};

/// Default statistics refresh period
pub const DEFAULT_REFRESH: Duration = Duration::from_millis(1000);

/// Streaming state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
}

struct SessionShared {
    state: StreamState,
    /// Bumped on every start; ticks from an older run are ignored
    epoch: u64,
    ticker: Option<Ticker>,
    source_url: Option<String>,
    live: DetectionStats,
    recent: RecentLog,
    stats_source: Box<dyn LiveStatsSource>,
}

/// Live stream controller
///
/// At most one ticker runs per session. `stop` only cancels the local ticker;
/// the feed's own transport errors belong to whatever displays it.
pub struct StreamSession {
    service: Arc<dyn DetectionService>,
    sink: UiSink,
    refresh: Duration,
    shared: Arc<Mutex<SessionShared>>,
}

impl StreamSession {
    pub fn new(
        service: Arc<dyn DetectionService>,
        sink: UiSink,
        refresh: Duration,
        recent_capacity: usize,
        stats_source: Box<dyn LiveStatsSource>,
    ) -> Self {
        Self {
            service,
            sink,
            refresh,
            shared: Arc::new(Mutex::new(SessionShared {
                state: StreamState::Idle,
                epoch: 0,
                ticker: None,
                source_url: None,
                live: DetectionStats::default(),
                recent: RecentLog::with_capacity(recent_capacity),
                stats_source,
            })),
        }
    }

    /// Bind the live feed and start refreshing statistics; no-op while streaming
    pub fn start(&self) -> bool {
        let mut shared = self.shared.lock();
        if shared.state == StreamState::Streaming {
            debug!("Stream already running");
            return false;
        }

        shared.state = StreamState::Streaming;
        shared.epoch += 1;
        let epoch = shared.epoch;

        let url = self.service.stream_url(cache_bust());
        info!("Live stream started: {}", url);
        shared.source_url = Some(url.clone());
        self.sink.send(UiUpdate::StreamSource(Some(url)));

        let weak = Arc::downgrade(&self.shared);
        let sink = self.sink.clone();
        shared.ticker = Some(Ticker::spawn(self.refresh, move || {
            refresh_live_statistics(&weak, epoch, &sink)
        }));
        true
    }

    /// Unbind the feed and cancel the ticker; no-op while idle
    ///
    /// The recent-events log is kept for reference.
    pub fn stop(&self) -> bool {
        let mut shared = self.shared.lock();
        if shared.state == StreamState::Idle {
            debug!("Stream already stopped");
            return false;
        }

        shared.state = StreamState::Idle;
        if let Some(ticker) = shared.ticker.take() {
            ticker.cancel();
        }
        let url = shared.source_url.take().unwrap_or_default();
        self.sink.send(UiUpdate::StreamSource(None));
        info!("Live stream stopped: {}", url);
        true
    }
}

#[cfg(test)]
impl StreamSession {
    pub fn state(&self) -> StreamState {
        self.shared.lock().state
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == StreamState::Streaming
    }

    /// Feed URL currently bound, if streaming
    pub fn source_url(&self) -> Option<String> {
        self.shared.lock().source_url.clone()
    }

    /// Counts from the latest refresh
    pub fn live_stats(&self) -> DetectionStats {
        self.shared.lock().live
    }

    /// Recent events, newest first
    pub fn recent_events(&self) -> Vec<RecentEvent> {
        self.shared.lock().recent.snapshot()
    }
}

fn refresh_live_statistics(shared: &Weak<Mutex<SessionShared>>, epoch: u64, sink: &UiSink) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let mut shared = shared.lock();
    if shared.state != StreamState::Streaming || shared.epoch != epoch {
        return;
    }

    let sample = shared.stats_source.sample();
    shared.live = sample.stats();
    sink.send(UiUpdate::LiveStatistics(shared.live));

    if let Some(strongest) = sample.strongest() {
        shared.recent.push(RecentEvent::now(strongest));
        sink.send(UiUpdate::RecentEvents(shared.recent.snapshot()));
    }
    debug!("Live refresh: {} detections", shared.live.total);
}

fn cache_bust() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::source::LiveSample;
    use super::*;
    use crate::client::fake::FakeService;
    use crate::client::Detection;
    use crossbeam_channel::Receiver;

    /// Always reports one detection
    struct Steady;

    impl LiveStatsSource for Steady {
        fn sample(&mut self) -> LiveSample {
            LiveSample::new(vec![Detection::new("Helmet", 0.85)])
        }
    }

    /// Never reports anything
    struct Quiet;

    impl LiveStatsSource for Quiet {
        fn sample(&mut self) -> LiveSample {
            LiveSample::default()
        }
    }

    fn session(source: Box<dyn LiveStatsSource>) -> (StreamSession, Receiver<UiUpdate>) {
        let (sink, rx) = UiSink::channel();
        let session = StreamSession::new(
            Arc::new(FakeService::new()),
            sink,
            DEFAULT_REFRESH,
            recent::DEFAULT_CAPACITY,
            source,
        );
        (session, rx)
    }

    fn live_refreshes(rx: &Receiver<UiUpdate>) -> usize {
        rx.try_iter()
            .filter(|u| matches!(u, UiUpdate::LiveStatistics(_)))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_binds_feed() {
        let (session, rx) = session(Box::new(Steady));
        assert!(session.start());
        assert!(session.is_streaming());

        let url = session.source_url().unwrap();
        assert!(url.starts_with("http://fake/api/stream?t="));
        assert!(matches!(rx.try_recv(), Ok(UiUpdate::StreamSource(Some(u))) if u == url));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_stop_before_first_tick() {
        let (session, rx) = session(Box::new(Steady));
        session.start();
        session.stop();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(session.recent_events().is_empty());
        assert_eq!(session.live_stats(), DetectionStats::default());
        assert_eq!(live_refreshes(&rx), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_once_per_period() {
        let (session, rx) = session(Box::new(Steady));
        session.start();

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(live_refreshes(&rx), 3);
        assert_eq!(session.recent_events().len(), 3);
        assert_eq!(session.live_stats().helmets, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_noop() {
        let (session, rx) = session(Box::new(Steady));
        assert!(session.start());
        assert!(!session.start());

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(live_refreshes(&rx), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_keeps_recent_events() {
        let (session, rx) = session(Box::new(Steady));
        session.start();
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        assert!(session.stop());
        assert!(!session.stop());
        assert!(session.source_url().is_none());
        assert_eq!(session.recent_events().len(), 2);

        rx.try_iter().count();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(live_refreshes(&rx), 0);
        assert_eq!(session.recent_events().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_log_is_bounded() {
        let (session, _rx) = session(Box::new(Steady));
        session.start();
        tokio::time::sleep(Duration::from_millis(15_500)).await;
        assert_eq!(session.recent_events().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_samples_add_no_events() {
        let (session, rx) = session(Box::new(Quiet));
        session.start();
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        assert_eq!(live_refreshes(&rx), 3);
        assert!(session.recent_events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let (session, rx) = session(Box::new(Steady));
        session.start();
        session.stop();
        session.start();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(live_refreshes(&rx), 1);
        assert_eq!(session.state(), StreamState::Streaming);
    }
}
