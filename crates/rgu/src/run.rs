use anyhow::{Context, Result};
use compositor::{
    Collaborators, Compositor, CompositorConfig, GpuOptions, GpuPowerPreference, HeadlessBackend,
    ManualClock, RequestFlags, SignalLatch, Size, WgpuBackend, WindowOptions, WindowRuntime,
};
use engineconfig::{EngineConfig, GpuPower, ScreenSize};
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckConfigArgs, RunArgs};
use crate::demo;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    match args.headless {
        Some(frames) => run_headless(&config, frames),
        None => run_windowed(&config),
    }
}

pub fn check_config(args: CheckConfigArgs) -> Result<()> {
    let config = EngineConfig::load(&args.path)
        .with_context(|| format!("configuration at {} is not valid", args.path.display()))?;
    let rendered = if args.json {
        serde_json::to_string_pretty(&config).context("failed to render configuration as JSON")?
    } else {
        toml::to_string_pretty(&config).context("failed to render configuration as TOML")?
    };
    println!("{rendered}");
    println!(
        "# resolved: resolution {} window {} frame_rate {}",
        config.resolution(),
        config.window_size(),
        config.frame_rate()
    );
    Ok(())
}

/// Loads the configuration file (or defaults) and applies CLI overrides.
fn resolve_config(args: &RunArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(size) = args.size {
        config.resolution = Some(size);
    }
    if let Some(fps) = args.fps {
        config.frame_rate = Some(fps);
    }
    if args.frame_skip {
        config.allow_frame_skip = true;
    }
    config.validate().context("command-line overrides are not valid")?;
    Ok(config)
}

fn compositor_config(config: &EngineConfig) -> CompositorConfig {
    CompositorConfig {
        resolution: to_size(config.resolution()),
        content_version: match config.content_version {
            engineconfig::ContentVersion::Rgss1 => compositor::ContentVersion::Rgss1,
            engineconfig::ContentVersion::Rgss2 => compositor::ContentVersion::Rgss2,
            engineconfig::ContentVersion::Rgss3 => compositor::ContentVersion::Rgss3,
        },
        allow_frame_skip: config.allow_frame_skip,
        frame_rate: config.frame_rate.map(|_| config.frame_rate()),
    }
}

fn gpu_options(config: &EngineConfig) -> GpuOptions {
    GpuOptions {
        power: match config.gpu_power {
            GpuPower::Low => GpuPowerPreference::Low,
            GpuPower::High => GpuPowerPreference::High,
        },
        vsync: config.vsync,
    }
}

fn window_options(config: &EngineConfig) -> WindowOptions {
    WindowOptions {
        title: config.title.clone(),
        window_size: to_size(config.window_size()),
        show_fps: config.show_fps,
        fps_report_interval: config.fps_report_interval,
    }
}

fn to_size(size: ScreenSize) -> Size {
    Size::new(size.width, size.height)
}

fn run_windowed(config: &EngineConfig) -> Result<()> {
    let runtime = WindowRuntime::spawn(window_options(config))?;
    let backend = WgpuBackend::new(runtime.window(), gpu_options(config))
        .context("failed to initialise GPU backend")?;
    tracing::info!(adapter = backend.adapter_name(), "GPU backend ready");

    let latch = SignalLatch::new();
    let collaborators = Collaborators::new(runtime.flags(), Box::new(latch.clone()))
        .with_events(runtime.event_sink());
    let mut compositor = Compositor::new(backend, &compositor_config(config), collaborators)?;

    let result = demo::run(&mut compositor, &latch, None);
    drop(compositor);
    runtime.shutdown()?;
    result
}

fn run_headless(config: &EngineConfig, frames: i64) -> Result<()> {
    let backend = HeadlessBackend::new(to_size(config.window_size()));
    let latch = SignalLatch::new();
    let collaborators = Collaborators::new(RequestFlags::new(), Box::new(latch.clone()))
        .with_clock(Box::new(ManualClock::new()));
    let mut compositor = Compositor::new(backend, &compositor_config(config), collaborators)?;

    demo::run(&mut compositor, &latch, Some(frames))?;
    tracing::info!(
        frames = compositor.frame_count(),
        presents = compositor.backend().present_count(),
        average_fps = compositor.average_fps(),
        "headless run finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_file_values() {
        let args = RunArgs {
            config: None,
            size: Some(ScreenSize::new(320, 240)),
            fps: Some(30),
            frame_skip: true,
            headless: None,
        };
        let config = resolve_config(&args).unwrap();
        let mapped = compositor_config(&config);
        assert_eq!(mapped.resolution, Size::new(320, 240));
        assert_eq!(mapped.frame_rate, Some(30));
        assert!(mapped.allow_frame_skip);
        assert_eq!(window_options(&config).window_size, Size::new(320, 240));
    }

    #[test]
    fn low_fps_override_is_clamped() {
        let args = RunArgs {
            config: None,
            size: None,
            fps: Some(0),
            frame_skip: false,
            headless: None,
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.frame_rate(), engineconfig::MIN_FRAME_RATE);
        assert_eq!(
            compositor_config(&config).frame_rate,
            Some(engineconfig::MIN_FRAME_RATE)
        );
    }

    #[test]
    fn headless_demo_runs_requested_frames() {
        let config = EngineConfig {
            resolution: Some(ScreenSize::new(64, 48)),
            ..EngineConfig::default()
        };
        run_headless(&config, 30).unwrap();
    }
}
