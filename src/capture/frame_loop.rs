// SPDX-License-Identifier: GPL-3.0-only

//! Capture to conversion loop
//!
//! One cooperative loop per stream: acquire with a bounded wait, convert,
//! periodically validate the converted output, and report throughput on a
//! fixed interval. The loop keeps running across transient conditions
//! (display-mode changes, momentary driver hiccups) and stops only on fatal
//! resource failures or an explicit stop request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::capture::{CaptureEvent, CaptureSource};
use crate::config::LoopConfig;
use crate::errors::ConvertError;
use crate::shaders::yuy2_encode;
use crate::validate;

/// Action returned by one loop iteration to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Cumulative throughput figures for a running loop
///
/// Frame time covers acquisition through conversion, excluding the cadence
/// sleep, so the reported rate reflects conversion throughput rather than
/// the loop tick.
#[derive(Debug, Clone)]
pub struct ThroughputStats {
    frames: u64,
    skipped: u64,
    total_frame_time: Duration,
    last_report: Instant,
}

impl Default for ThroughputStats {
    fn default() -> Self {
        Self {
            frames: 0,
            skipped: 0,
            total_frame_time: Duration::ZERO,
            last_report: Instant::now(),
        }
    }
}

impl ThroughputStats {
    fn record(&mut self, elapsed: Duration) {
        self.frames += 1;
        self.total_frame_time += elapsed;
    }

    fn skip(&mut self) {
        self.skipped += 1;
    }

    fn maybe_report(&mut self, interval: Duration) {
        if self.frames == 0 || self.last_report.elapsed() < interval {
            return;
        }
        let avg_ms = self.total_frame_time.as_secs_f64() * 1000.0 / self.frames as f64;
        let fps = self.frames as f64 / self.total_frame_time.as_secs_f64();
        info!(
            frames = self.frames,
            skipped = self.skipped,
            avg_frame_time_ms = format_args!("{:.2}", avg_ms),
            fps = format_args!("{:.1}", fps),
            "conversion throughput"
        );
        self.last_report = Instant::now();
    }

    /// Converted frame count so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Skipped iteration count so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Mean time spent per converted frame
    pub fn average_frame_time(&self) -> Duration {
        if self.frames == 0 {
            Duration::ZERO
        } else {
            self.total_frame_time / self.frames as u32
        }
    }
}

/// Drives acquisition, conversion and periodic validation for one stream
///
/// Each iteration walks Idle -> Acquire -> Convert -> (periodic) Validate
/// and returns to Idle. At most one conversion is in flight at a time.
pub struct ConvertLoop {
    source: Box<dyn CaptureSource>,
    config: LoopConfig,
    stats: ThroughputStats,
}

impl ConvertLoop {
    pub fn new(source: Box<dyn CaptureSource>, config: LoopConfig) -> Self {
        let (width, height) = source.resolution();
        info!(width, height, "convert loop ready");
        Self {
            source,
            config,
            stats: ThroughputStats::default(),
        }
    }

    /// Throughput figures accumulated so far
    pub fn stats(&self) -> &ThroughputStats {
        &self.stats
    }

    /// Run one loop iteration
    pub fn run_iteration(&mut self) -> LoopAction {
        let started = Instant::now();

        let event = match self.source.acquire_next_frame(self.config.acquire_timeout()) {
            Ok(event) => event,
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "frame acquisition failed, retrying next tick");
                self.stats.skip();
                thread::sleep(self.config.frame_interval());
                return LoopAction::Continue;
            }
            Err(e) => {
                error!(error = %e, "capture source unusable, stopping loop");
                return LoopAction::Stop;
            }
        };

        let frame = match event {
            CaptureEvent::Frame(frame) => frame,
            // Nothing new inside the wait window; not an error
            CaptureEvent::NoNewFrame => return LoopAction::Continue,
        };

        match pollster::block_on(yuy2_encode::encode_frame(&frame)) {
            Ok(yuy2) => {
                self.stats.record(started.elapsed());
                if self.config.validate_every > 0
                    && self.stats.frames() % self.config.validate_every == 0
                {
                    self.validate_output(&yuy2, frame.width, frame.height);
                }
            }
            Err(ConvertError::RejectedInput(reason)) => {
                // Commonly a transient resolution or display-mode change;
                // skip quietly and keep the loop alive
                debug!(%reason, "conversion skipped");
                self.stats.skip();
            }
            Err(e @ ConvertError::TransientResource(_)) => {
                warn!(error = %e, "transient conversion failure, retrying next tick");
                self.stats.skip();
            }
            Err(e @ ConvertError::FatalResource(_)) => {
                error!(error = %e, "stopping capture loop");
                return LoopAction::Stop;
            }
        }

        self.stats.maybe_report(self.config.stats_interval());

        // Fixed cadence; keeps an idle desktop from spinning the CPU
        thread::sleep(self.config.frame_interval());
        LoopAction::Continue
    }

    fn validate_output(&self, yuy2: &[u8], width: u32, height: u32) {
        match validate::check_yuy2(yuy2, width, height) {
            Ok(stats) => debug!(
                luma_in_range = format_args!("{:.3}", stats.luma_in_range),
                chroma_in_range = format_args!("{:.3}", stats.chroma_in_range),
                mean_luma = format_args!("{:.1}", stats.mean_luma),
                "output validation passed"
            ),
            Err(reason) => warn!(%reason, "output validation failed"),
        }
    }
}

/// Controller for a convert loop running in a separate thread
///
/// Provides a standardized interface for starting, stopping, and joining
/// the loop thread.
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Start a loop with initialization inside the thread
    ///
    /// The `init_fn` runs once at thread start to set up state (capture
    /// source, GPU pipeline); if it fails the thread exits immediately.
    /// The `loop_fn` is then called repeatedly until it returns
    /// `LoopAction::Stop` or `stop()` is called.
    pub fn start_with_init<S, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> Self
    where
        S: Send + 'static,
        I: FnOnce() -> Result<S, ConvertError> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, "starting capture loop");

        let thread_handle = thread::spawn(move || {
            let mut state = match init_fn() {
                Ok(state) => state,
                Err(e) => {
                    warn!(name = %name_clone, error = %e, "loop initialization failed");
                    return;
                }
            };

            loop {
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "stop signal received");
                    break;
                }

                match loop_fn(&mut state) {
                    LoopAction::Continue => {}
                    LoopAction::Stop => {
                        debug!(name = %name_clone, "loop requested stop");
                        break;
                    }
                }
            }

            info!(name = %name_clone, "capture loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for the thread
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending a stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "capture loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "controller dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start_with_init(
            "test-loop",
            || Ok(()),
            move |_: &mut ()| {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                if count >= 10 {
                    LoopAction::Stop
                } else {
                    LoopAction::Continue
                }
            },
        );

        controller.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start_with_init(
            "test-loop",
            || Ok(()),
            move |_: &mut ()| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                LoopAction::Continue
            },
        );

        thread::sleep(Duration::from_millis(50));
        controller.stop();
        assert!(counter.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_init_failure_skips_loop() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let mut controller = CaptureLoopController::start_with_init(
            "test-fail-init",
            || Err::<(), _>(ConvertError::FatalResource("no device".into())),
            move |_: &mut ()| {
                ran_clone.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
        );

        controller.join();
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_throughput_stats() {
        let mut stats = ThroughputStats::default();
        assert_eq!(stats.average_frame_time(), Duration::ZERO);

        stats.record(Duration::from_millis(4));
        stats.record(Duration::from_millis(8));
        stats.skip();

        assert_eq!(stats.frames(), 2);
        assert_eq!(stats.skipped(), 1);
        assert_eq!(stats.average_frame_time(), Duration::from_millis(6));
    }
}
