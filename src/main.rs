// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use capture_convert::shaders::nv12_decode;
use capture_convert::{
    CaptureLoopController, ConvertLoop, ConversionParams, LoopAction, LoopConfig,
    TestPatternSource, formats, validate,
};
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "capture-convert")]
#[command(about = "GPU pixel-format conversion engine for live capture")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture packed-color frames and convert them to YUY2
    Encode {
        /// Frame width in pixels
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Frame height in pixels
        #[arg(long, default_value = "1080")]
        height: u32,

        /// Stop after N converted frames (0 = run until interrupted)
        #[arg(short, long, default_value = "0")]
        frames: u64,

        /// Loop configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Decode an NV12 gradient test frame to RGBA
    Decode {
        /// Frame width in pixels (must be even)
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Frame height in pixels (must be even)
        #[arg(long, default_value = "1080")]
        height: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=capture_convert=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            width,
            height,
            frames,
            config,
        } => run_encode(width, height, frames, config),
        Commands::Decode { width, height } => run_decode(width, height),
    }
}

fn run_encode(
    width: u32,
    height: u32,
    frames: u64,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => LoopConfig::load(&path)?,
        None => LoopConfig::default(),
    };

    info!(width, height, "starting capture to YUY2 conversion");

    if frames > 0 {
        // Bounded run on the current thread
        let source = TestPatternSource::new(width, height, config.frame_interval());
        let mut convert = ConvertLoop::new(Box::new(source), config);
        while convert.stats().frames() < frames {
            if convert.run_iteration() == LoopAction::Stop {
                error!("conversion loop stopped early");
                break;
            }
        }
        info!(
            converted = convert.stats().frames(),
            skipped = convert.stats().skipped(),
            "conversion run finished"
        );
        return Ok(());
    }

    // Open-ended run on a loop thread, stopped by Ctrl+C
    let interval = config.frame_interval();
    let mut controller = CaptureLoopController::start_with_init(
        "capture-convert",
        move || {
            let source = TestPatternSource::new(width, height, interval);
            Ok(ConvertLoop::new(Box::new(source), config))
        },
        ConvertLoop::run_iteration,
    );

    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_clone.store(true, Ordering::SeqCst);
    })?;

    info!("press Ctrl+C to stop");
    while !stop.load(Ordering::SeqCst) && controller.is_running() {
        std::thread::sleep(Duration::from_millis(100));
    }
    controller.stop();
    Ok(())
}

fn run_decode(width: u32, height: u32) -> Result<(), Box<dyn std::error::Error>> {
    info!(width, height, "starting NV12 to RGBA conversion test");

    let data = formats::nv12::test_pattern(width, height);
    let params = ConversionParams::planar(width, height);

    let started = Instant::now();
    let rgba = pollster::block_on(nv12_decode::decode_nv12_frame(&data, &params))?;
    let elapsed = started.elapsed();

    info!(
        conversion_time_ms = format_args!("{:.2}", elapsed.as_secs_f64() * 1000.0),
        "NV12 to RGBA conversion completed"
    );

    match validate::check_rgba_alpha(&rgba, width, height) {
        Ok(()) => info!("RGBA output validation passed"),
        Err(reason) => {
            error!(%reason, "RGBA output validation failed");
            return Err(reason.into());
        }
    }

    // A few sample pixels from the first row for eyeballing the gradient
    for x in (0..width.min(4) as usize).map(|i| i * (width as usize / 4).max(1)) {
        let px = &rgba[x * 4..x * 4 + 4];
        info!(x, r = px[0], g = px[1], b = px[2], "sample pixel");
    }

    Ok(())
}
