// SPDX-License-Identifier: GPL-3.0-only

//! Capture source abstraction
//!
//! The conversion engine consumes packed-color frames from a capture
//! collaborator behind the [`CaptureSource`] trait. Real desktop or camera
//! acquisition lives outside this crate; [`TestPatternSource`] stands in
//! with the same timing contract.

mod frame_loop;

pub use frame_loop::{CaptureLoopController, ConvertLoop, LoopAction, ThroughputStats};

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::ConvertResult;
use crate::formats::PixelFormat;

/// One captured frame
///
/// Exclusively owned by the caller for its lifetime; the conversion engine
/// never retains a frame past the call that consumed it.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Packed pixel data, `stride` bytes per row
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Row stride in bytes, at least `width * 4`
    pub stride: u32,
    pub captured_at: Instant,
}

/// Result of one acquisition attempt
///
/// An empty wait window is a normal "nothing to do yet" signal, not an
/// error; the loop skips the iteration and keeps running.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Frame(CapturedFrame),
    NoNewFrame,
}

/// Source of packed-color frames at a fixed, runtime-discovered resolution
pub trait CaptureSource: Send {
    /// (width, height) of the frames this source produces
    fn resolution(&self) -> (u32, u32);

    /// Wait up to `timeout` for the next frame
    fn acquire_next_frame(&mut self, timeout: Duration) -> ConvertResult<CaptureEvent>;
}

/// Animated-gradient stand-in for a desktop capture source
///
/// Produces BGRA frames at a fixed cadence. Acquiring before the next frame
/// is due blocks for at most the requested timeout and reports `NoNewFrame`
/// when the window closes empty, mirroring how a real capture collaborator
/// signals an idle desktop.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_interval: Duration,
    next_due: Instant,
    sequence: u64,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32, frame_interval: Duration) -> Self {
        Self {
            width,
            height,
            frame_interval,
            next_due: Instant::now(),
            sequence: 0,
        }
    }

    fn render(&self) -> Arc<[u8]> {
        let w = self.width as usize;
        let h = self.height as usize;
        let shift = self.sequence as usize;
        let mut data = vec![0u8; w * h * 4];
        for y in 0..h {
            for x in 0..w {
                let px = (y * w + x) * 4;
                data[px] = ((x * 256 / w.max(1) + shift) % 256) as u8; // B
                data[px + 1] = (y * 256 / h.max(1)) as u8; // G
                data[px + 2] = ((x + y) * 128 / (w + h).max(1)) as u8; // R
                data[px + 3] = 255;
            }
        }
        Arc::from(data)
    }
}

impl CaptureSource for TestPatternSource {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn acquire_next_frame(&mut self, timeout: Duration) -> ConvertResult<CaptureEvent> {
        let now = Instant::now();
        if self.next_due > now {
            let wait = self.next_due - now;
            if wait > timeout {
                // The next frame will not arrive inside the wait window
                std::thread::sleep(timeout);
                return Ok(CaptureEvent::NoNewFrame);
            }
            std::thread::sleep(wait);
        }

        self.sequence += 1;
        self.next_due = Instant::now() + self.frame_interval;

        Ok(CaptureEvent::Frame(CapturedFrame {
            data: self.render(),
            width: self.width,
            height: self.height,
            format: PixelFormat::Bgra8,
            stride: self.width * 4,
            captured_at: Instant::now(),
        }))
    }
}
