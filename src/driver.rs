//! Frame driver
//!
//! Calls a [`FrameHandler`] once per frame until its [`RunHandle`] is
//! stopped, a frame limit is reached or the handler fails. Teardown always
//! runs afterwards, releasing every GPU resource the engine still tracks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::gfx::engine::GraphicsEngine;
use crate::gpu::GpuContext;
use crate::performance::{PerformanceMetrics, PerformanceMonitor};

/// Shared run/stop flag, checked before each frame is scheduled
#[derive(Debug, Clone)]
pub struct RunHandle {
    running: Arc<AtomicBool>,
}

impl RunHandle {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Ends the loop before the next frame; the current frame completes
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-frame application callback
pub trait FrameHandler<C: GpuContext> {
    /// Renders one frame; `dt` is the time since the previous frame in seconds
    fn frame(&mut self, engine: &mut GraphicsEngine<C>, dt: f32) -> anyhow::Result<()>;

    /// Runs once after the last frame, before the engine releases its resources
    fn teardown(&mut self, _engine: &mut GraphicsEngine<C>) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<C, F> FrameHandler<C> for F
where
    C: GpuContext,
    F: FnMut(&mut GraphicsEngine<C>, f32) -> anyhow::Result<()>,
{
    fn frame(&mut self, engine: &mut GraphicsEngine<C>, dt: f32) -> anyhow::Result<()> {
        self(engine, dt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// Minimum wall time per frame; `None` runs frames back to back
    pub frame_interval: Option<Duration>,
    /// How often frame statistics are logged at `info`
    pub stats_log_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            frame_interval: None,
            stats_log_interval: Duration::from_secs(5),
        }
    }
}

impl DriverConfig {
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Paces the loop at roughly `fps` frames per second
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.frame_interval = (fps > 0).then(|| Duration::from_secs(1) / fps);
        self
    }

    pub fn with_stats_log_interval(mut self, interval: Duration) -> Self {
        self.stats_log_interval = interval;
        self
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    pub frames: u64,
    pub elapsed: Duration,
    pub metrics: PerformanceMetrics,
}

pub struct FrameDriver {
    config: DriverConfig,
    handle: RunHandle,
    monitor: PerformanceMonitor,
}

impl FrameDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            handle: RunHandle::new(),
            monitor: PerformanceMonitor::new(),
        }
    }

    /// Handle that stops this driver, usable from any thread or from inside
    /// a frame handler
    pub fn handle(&self) -> RunHandle {
        self.handle.clone()
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Runs frames until stopped, then tears down the handler and the engine.
    ///
    /// A handler error ends the loop; teardown still runs and the frame
    /// error is returned.
    ///
    /// # Arguments
    /// * `engine` - Engine passed to every frame, torn down after the loop
    /// * `handler` - Per-frame callback
    ///
    /// # Returns
    /// Frame count, wall time and the final [`PerformanceMetrics`]
    pub fn run<C, H>(&mut self, engine: &mut GraphicsEngine<C>, handler: &mut H) -> anyhow::Result<FrameSummary>
    where
        C: GpuContext,
        H: FrameHandler<C> + ?Sized,
    {
        log::info!("Frame driver started");
        let started = Instant::now();
        let mut last_stats_log = started;
        let mut frames = 0u64;
        let mut outcome = Ok(());

        engine.clock_mut().reset();
        engine.take_draw_stats();

        while self.handle.is_running() {
            if self.config.max_frames.is_some_and(|max| frames >= max) {
                break;
            }

            let frame_start = Instant::now();
            self.monitor.begin_frame();
            let dt = engine.delta_time();
            let result = handler.frame(engine, dt);
            self.monitor.record_draws(engine.take_draw_stats());
            self.monitor.end_frame();

            if let Err(error) = result {
                log::error!("Frame {frames} failed: {error:#}");
                outcome = Err(error.context(format!("frame {frames} failed")));
                break;
            }
            frames += 1;

            if last_stats_log.elapsed() >= self.config.stats_log_interval {
                let metrics = self.monitor.metrics();
                log::info!(
                    "{frames} frames, {:.1} fps, {:.2}ms/frame, {} draw calls",
                    metrics.fps,
                    metrics.frame_time_ms,
                    metrics.draw_calls
                );
                last_stats_log = Instant::now();
            }

            if let Some(interval) = self.config.frame_interval {
                let spent = frame_start.elapsed();
                if spent < interval {
                    thread::sleep(interval - spent);
                }
            }
        }

        let teardown = handler.teardown(engine);
        engine.teardown();
        log::info!("Frame driver stopped after {frames} frames");

        outcome?;
        teardown.context("frame handler teardown failed")?;

        Ok(FrameSummary {
            frames,
            elapsed: started.elapsed(),
            metrics: self.monitor.metrics(),
        })
    }
}
