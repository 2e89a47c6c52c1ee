use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Sender};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::cancel::{EngineEvent, EventSink, RequestFlags};
use crate::types::Size;

/// How the driver thread sets up and decorates the window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOptions {
    pub title: String,
    pub window_size: Size,
    /// Append the rolling FPS to the title.
    pub show_fps: bool,
    /// Minimum time between title refreshes.
    pub fps_report_interval: Duration,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "rgu".into(),
            window_size: Size::new(544, 416),
            show_fps: true,
            fps_report_interval: Duration::from_secs(1),
        }
    }
}

type Ready = (EventLoopProxy<EngineEvent>, Arc<Window>);

/// Driver thread owning the winit event loop and the native window.
///
/// The thread that calls [`WindowRuntime::spawn`] is expected to become the
/// compositor thread: it builds the GPU backend from [`WindowRuntime::window`]
/// and drives the scene, while the driver only flips request flags and
/// refreshes the title.
pub struct WindowRuntime {
    proxy: EventLoopProxy<EngineEvent>,
    window: Arc<Window>,
    flags: Arc<RequestFlags>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    pub fn spawn(options: WindowOptions) -> Result<Self> {
        let flags = RequestFlags::new();
        let (ready_tx, ready_rx) = bounded(1);
        let thread_flags = Arc::clone(&flags);
        let handle = thread::Builder::new()
            .name("rgu-driver".into())
            .spawn(move || run_driver_thread(options, thread_flags, ready_tx))
            .map_err(|err| anyhow!("failed to spawn driver thread: {err}"))?;

        let (proxy, window) = ready_rx
            .recv()
            .map_err(|err| anyhow!("driver thread failed to initialise: {err}"))??;

        Ok(Self {
            proxy,
            window,
            flags,
            join_handle: Some(handle),
        })
    }

    pub fn window(&self) -> Arc<Window> {
        Arc::clone(&self.window)
    }

    pub fn flags(&self) -> Arc<RequestFlags> {
        Arc::clone(&self.flags)
    }

    /// Sink the compositor uses to push FPS updates to the driver.
    pub fn event_sink(&self) -> Box<dyn EventSink> {
        Box::new(self.proxy.clone())
    }

    /// Tells the driver the compositor is done and waits for it to exit.
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(EngineEvent::ShutdownComplete);
            handle
                .join()
                .map_err(|err| anyhow!("driver thread panicked: {err:?}"))??;
            tracing::info!("driver thread stopped");
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(EngineEvent::ShutdownComplete);
            let _ = handle.join();
        }
    }
}

fn run_driver_thread(
    options: WindowOptions,
    flags: Arc<RequestFlags>,
    ready_tx: Sender<Result<Ready, anyhow::Error>>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<EngineEvent>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }

    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let message = format!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    let proxy = event_loop.create_proxy();

    let window = match WindowBuilder::new()
        .with_title(options.title.as_str())
        .with_inner_size(PhysicalSize::new(
            options.window_size.width,
            options.window_size.height,
        ))
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(err) => {
            let message = format!("failed to create window: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    tracing::info!(
        width = options.window_size.width,
        height = options.window_size.height,
        "window created"
    );

    let _ = ready_tx.send(Ok((proxy, Arc::clone(&window))));

    let mut title = TitleUpdater::new(&options);
    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            match event {
                Event::UserEvent(EngineEvent::FpsUpdated(fps)) => {
                    if let Some(text) = title.refresh(fps, Instant::now()) {
                        window.set_title(&text);
                    }
                }
                Event::UserEvent(EngineEvent::ShutdownComplete) => {
                    elwt.exit();
                }
                Event::WindowEvent { window_id, event } if window_id == window.id() => {
                    match event {
                        WindowEvent::CloseRequested => {
                            tracing::debug!("close requested");
                            flags.request_quit();
                        }
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.state == ElementState::Pressed
                                && !event.repeat
                                && matches!(event.logical_key, Key::Named(NamedKey::F12))
                            {
                                tracing::debug!("reset key pressed");
                                flags.request_reset();
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("driver event loop error: {err}"))
}

/// Throttles FPS title refreshes to the configured interval.
struct TitleUpdater {
    base: String,
    enabled: bool,
    interval: Duration,
    last: Option<Instant>,
}

impl TitleUpdater {
    fn new(options: &WindowOptions) -> Self {
        Self {
            base: options.title.clone(),
            enabled: options.show_fps,
            interval: options.fps_report_interval,
            last: None,
        }
    }

    fn refresh(&mut self, fps: f32, now: Instant) -> Option<String> {
        if !self.enabled {
            return None;
        }
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        self.last = Some(now);
        Some(format!("{} - {:.1} FPS", self.base, fps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_refresh_is_throttled() {
        let options = WindowOptions {
            title: "demo".into(),
            fps_report_interval: Duration::from_millis(500),
            ..WindowOptions::default()
        };
        let mut title = TitleUpdater::new(&options);
        let start = Instant::now();
        assert_eq!(title.refresh(59.94, start).as_deref(), Some("demo - 59.9 FPS"));
        assert_eq!(title.refresh(60.0, start + Duration::from_millis(100)), None);
        assert_eq!(
            title.refresh(60.0, start + Duration::from_millis(600)).as_deref(),
            Some("demo - 60.0 FPS")
        );
    }

    #[test]
    fn hidden_fps_never_touches_title() {
        let options = WindowOptions {
            show_fps: false,
            ..WindowOptions::default()
        };
        let mut title = TitleUpdater::new(&options);
        assert_eq!(title.refresh(60.0, Instant::now()), None);
    }
}
