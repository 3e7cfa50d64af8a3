//! 指标采样
//!
//! 路由计数器在每次成功的 `route()` 后加一。清零与发布由两个独立的定时器
//! 驱动：发布的吞吐量只反映最近一个清零窗口内的计数，窗口可能短于发布间隔，
//! 因此快照里同时带上窗口长度。

use domain::{MetricSnapshot, Timestamp};

#[derive(Debug)]
pub struct MetricsSampler {
    routed_in_window: u64,
    total_routed: u64,
    window_started_at: Timestamp,
    latest: Option<MetricSnapshot>,
}

impl MetricsSampler {
    pub fn new(now: Timestamp) -> Self {
        Self {
            routed_in_window: 0,
            total_routed: 0,
            window_started_at: now,
            latest: None,
        }
    }

    pub fn record_routed(&mut self) {
        self.routed_in_window += 1;
        self.total_routed += 1;
    }

    /// 开启新的计数窗口
    pub fn reset_window(&mut self, now: Timestamp) {
        self.routed_in_window = 0;
        self.window_started_at = now;
    }

    pub fn sample(
        &mut self,
        now: Timestamp,
        active_sessions: usize,
        active_users: usize,
    ) -> MetricSnapshot {
        let window_ms = (now - self.window_started_at).num_milliseconds().max(0) as u64;
        let snapshot = MetricSnapshot {
            timestamp: now,
            active_sessions,
            active_users,
            throughput: self.routed_in_window,
            window_ms,
        };
        self.latest = Some(snapshot.clone());
        snapshot
    }

    pub fn latest(&self) -> Option<&MetricSnapshot> {
        self.latest.as_ref()
    }

    pub fn total_routed(&self) -> u64 {
        self.total_routed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn throughput_reflects_latest_window_only() {
        let start = Utc::now();
        let mut sampler = MetricsSampler::new(start);

        for _ in 0..5 {
            sampler.record_routed();
        }
        sampler.reset_window(start + Duration::milliseconds(1000));
        sampler.record_routed();
        sampler.record_routed();

        let snapshot = sampler.sample(start + Duration::milliseconds(2000), 3, 2);
        assert_eq!(snapshot.throughput, 2);
        assert_eq!(snapshot.window_ms, 1000);
        assert_eq!(snapshot.active_sessions, 3);
        assert_eq!(snapshot.active_users, 2);
        assert_eq!(sampler.total_routed(), 7);
        assert_eq!(sampler.latest(), Some(&snapshot));
    }

    #[test]
    fn sampling_does_not_reset_counter() {
        let start = Utc::now();
        let mut sampler = MetricsSampler::new(start);
        sampler.record_routed();

        let first = sampler.sample(start + Duration::milliseconds(500), 1, 1);
        let second = sampler.sample(start + Duration::milliseconds(900), 1, 1);
        assert_eq!(first.throughput, 1);
        assert_eq!(second.throughput, 1);
        assert_eq!(second.window_ms, 900);
    }
}
