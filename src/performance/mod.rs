//! # Performance Metrics
//!
//! Frame-time and draw statistics gathered by the frame driver.
//!
//! ```rust
//! use std::time::Duration;
//! use lumen3d::performance::PerformanceMonitor;
//!
//! let mut monitor = PerformanceMonitor::new();
//! monitor.record_frame(Duration::from_millis(16));
//! monitor.record_frame(Duration::from_millis(18));
//!
//! let metrics = monitor.metrics();
//! assert_eq!(metrics.frames, 2);
//! assert!((metrics.frame_time_ms - 17.0).abs() < 1e-3);
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::gfx::engine::DrawStats;

/// Snapshot of the monitor's sample window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceMetrics {
    /// Frames recorded since creation or the last reset
    pub frames: u64,
    pub fps: f32,
    /// Mean frame time over the window, in milliseconds
    pub frame_time_ms: f32,
    pub min_frame_time_ms: f32,
    pub max_frame_time_ms: f32,
    /// Draw calls submitted during the most recent frame
    pub draw_calls: u32,
    /// Vertices (or indices) submitted during the most recent frame
    pub vertex_count: u64,
}

/// Rolling window over the most recent frame times
pub struct PerformanceMonitor {
    window: VecDeque<Duration>,
    capacity: usize,
    frames: u64,
    last_draws: DrawStats,
    pending: Option<Instant>,
}

impl PerformanceMonitor {
    /// Default window of 120 frames
    pub fn new() -> Self {
        Self::with_window(120)
    }

    pub fn with_window(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            frames: 0,
            last_draws: DrawStats::default(),
            pending: None,
        }
    }

    pub fn begin_frame(&mut self) {
        self.pending = Some(Instant::now());
    }

    /// Records the time since [`PerformanceMonitor::begin_frame`]; ignored
    /// without a matching begin
    pub fn end_frame(&mut self) {
        if let Some(start) = self.pending.take() {
            self.record_frame(start.elapsed());
        }
    }

    pub fn record_frame(&mut self, frame_time: Duration) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(frame_time);
        self.frames += 1;
    }

    pub fn record_draws(&mut self, stats: DrawStats) {
        self.last_draws = stats;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        let to_ms = |d: &Duration| d.as_secs_f32() * 1000.0;
        let mut metrics = PerformanceMetrics {
            frames: self.frames,
            draw_calls: self.last_draws.draw_calls,
            vertex_count: self.last_draws.vertices,
            ..PerformanceMetrics::default()
        };
        if self.window.is_empty() {
            return metrics;
        }

        let total: Duration = self.window.iter().sum();
        metrics.frame_time_ms = to_ms(&total) / self.window.len() as f32;
        if metrics.frame_time_ms > 0.0 {
            metrics.fps = 1000.0 / metrics.frame_time_ms;
        }
        metrics.min_frame_time_ms = self.window.iter().min().map_or(0.0, to_ms);
        metrics.max_frame_time_ms = self.window.iter().max().map_or(0.0, to_ms);
        metrics
    }

    /// Frame times in the window, oldest first, in milliseconds
    pub fn history_ms(&self) -> Vec<f32> {
        self.window.iter().map(|d| d.as_secs_f32() * 1000.0).collect()
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.frames = 0;
        self.last_draws = DrawStats::default();
        self.pending = None;
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_drops_oldest_frames() {
        let mut monitor = PerformanceMonitor::with_window(3);
        for ms in [10, 20, 30, 40] {
            monitor.record_frame(Duration::from_millis(ms));
        }

        let metrics = monitor.metrics();
        assert_eq!(metrics.frames, 4);
        assert_eq!(monitor.history_ms().len(), 3);
        assert!((metrics.frame_time_ms - 30.0).abs() < 1e-3);
        assert!((metrics.min_frame_time_ms - 20.0).abs() < 1e-3);
        assert!((metrics.max_frame_time_ms - 40.0).abs() < 1e-3);
        assert!((metrics.fps - 1000.0 / 30.0).abs() < 1e-2);
    }

    #[test]
    fn test_draw_stats_and_reset() {
        let mut monitor = PerformanceMonitor::new();
        monitor.record_draws(DrawStats {
            draw_calls: 3,
            vertices: 78,
        });
        monitor.begin_frame();
        monitor.end_frame();

        let metrics = monitor.metrics();
        assert_eq!((metrics.draw_calls, metrics.vertex_count, metrics.frames), (3, 78, 1));

        monitor.reset();
        assert_eq!(monitor.metrics(), PerformanceMetrics::default());
        assert!(monitor.history_ms().is_empty());
    }

    #[test]
    fn test_end_without_begin_is_ignored() {
        let mut monitor = PerformanceMonitor::new();
        monitor.end_frame();
        assert_eq!(monitor.frames(), 0);
        assert_eq!(monitor.metrics().fps, 0.0);
    }
}
