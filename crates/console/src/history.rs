use bitmeter_core::ThroughputSample;
use std::collections::VecDeque;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Fixed-length ring of recent values, oldest first
#[derive(Debug, Clone)]
pub struct History {
    values: VecDeque<f64>,
    capacity: usize,
}

impl History {
    /// A full window of zeros, so the sparkline starts flat
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: std::iter::repeat(0.0).take(capacity).collect(),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn latest(&self) -> f64 {
        self.values.back().copied().unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Smoothed y-axis maximum for a sparkline.
///
/// Grows as soon as the window maximum exceeds the scale by 20%, and only
/// shrinks once the window maximum falls under half of it, to twice that
/// maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTracker {
    current: f64,
}

impl Default for ScaleTracker {
    fn default() -> Self {
        Self { current: 1.0 }
    }
}

impl ScaleTracker {
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn update(&mut self, window_max: f64) -> f64 {
        let max = if window_max > 0.0 { window_max } else { 1.0 };

        if max > self.current * 1.2 {
            self.current = max;
        } else if max < self.current * 0.5 {
            self.current = (max * 2.0).max(1.0);
        }

        self.current
    }
}

/// Download and upload histories with their scales
#[derive(Debug, Clone)]
pub struct ThroughputHistory {
    pub download: History,
    pub upload: History,
    pub download_scale: ScaleTracker,
    pub upload_scale: ScaleTracker,
}

impl ThroughputHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            download: History::new(capacity),
            upload: History::new(capacity),
            download_scale: ScaleTracker::default(),
            upload_scale: ScaleTracker::default(),
        }
    }

    pub fn push(&mut self, sample: ThroughputSample) {
        self.download.push(sample.download_bps);
        self.upload.push(sample.upload_bps);
        self.download_scale.update(self.download.max());
        self.upload_scale.update(self.upload.max());
    }

    /// Forget everything, e.g. after the interface scope changed
    pub fn clear(&mut self) {
        *self = Self::new(self.download.capacity);
    }
}

/// One block character per value, scaled against `scale`
pub fn sparkline(values: impl Iterator<Item = f64>, scale: f64) -> String {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let top = (SPARK_LEVELS.len() - 1) as f64;

    values
        .map(|value| {
            let ratio = (value / scale).clamp(0.0, 1.0);
            SPARK_LEVELS[(ratio * top).round() as usize]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keeps_capacity() {
        let mut history = History::new(3);
        assert_eq!(history.len(), 3);
        assert_eq!(history.max(), 0.0);

        for value in [1.0, 5.0, 2.0, 4.0] {
            history.push(value);
        }

        assert_eq!(history.values().collect::<Vec<_>>(), vec![5.0, 2.0, 4.0]);
        assert_eq!(history.latest(), 4.0);
        assert_eq!(history.max(), 5.0);
    }

    #[test]
    fn test_scale_grows_past_twenty_percent() {
        let mut scale = ScaleTracker::default();
        assert_eq!(scale.update(100.0), 100.0);
        assert_eq!(scale.update(115.0), 100.0);
        assert_eq!(scale.update(130.0), 130.0);
    }

    #[test]
    fn test_scale_shrinks_below_half() {
        let mut scale = ScaleTracker::default();
        scale.update(1000.0);
        assert_eq!(scale.update(600.0), 1000.0);
        assert_eq!(scale.update(400.0), 800.0);
    }

    #[test]
    fn test_scale_never_below_one() {
        let mut scale = ScaleTracker::default();
        scale.update(1000.0);
        assert_eq!(scale.update(0.0), 2.0);
        scale.update(0.1);
        assert!(scale.current() >= 1.0);
    }

    #[test]
    fn test_sparkline_levels() {
        let line = sparkline([0.0, 50.0, 100.0, 250.0].into_iter(), 100.0);
        assert_eq!(line.chars().collect::<Vec<_>>(), vec!['▁', '▅', '█', '█']);
    }

    #[test]
    fn test_throughput_history_push_and_clear() {
        let mut history = ThroughputHistory::new(4);
        history.push(ThroughputSample {
            download_bps: 8000.0,
            upload_bps: 800.0,
        });

        assert_eq!(history.download.latest(), 8000.0);
        assert_eq!(history.download_scale.current(), 8000.0);
        assert_eq!(history.upload_scale.current(), 800.0);

        history.clear();
        assert_eq!(history.download.max(), 0.0);
        assert_eq!(history.download.len(), 4);
    }
}
