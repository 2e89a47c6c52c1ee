//! Cross-thread request flags and the events pushed back to the driver.
//!
//! The driver thread only ever sets flags; the compositor thread polls them
//! at fixed checkpoints and tells the binding layer about each request once.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use winit::event_loop::EventLoopProxy;

/// Quit and reset requests shared between the driver and compositor threads.
#[derive(Debug, Default)]
pub struct RequestFlags {
    quit: AtomicBool,
    reset: AtomicBool,
}

impl RequestFlags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Release);
    }

    pub fn request_reset(&self) {
        self.reset.store(true, Ordering::Release);
    }

    /// Only [`Cancellation::clear_reset`] may clear the request, so the
    /// notification is re-armed together with the flag.
    pub(crate) fn clear_reset(&self) {
        self.reset.store(false, Ordering::Release);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    pub fn reset_requested(&self) -> bool {
        self.reset.load(Ordering::Acquire)
    }
}

/// Receives the notifications raised by [`Cancellation::raise`].
pub trait BindingNotifier {
    fn quit_required(&mut self);
    fn reset_required(&mut self);
}

/// Compositor-side view of the request flags.
pub struct Cancellation {
    flags: Arc<RequestFlags>,
    notifier: Box<dyn BindingNotifier>,
    quit_notified: bool,
    reset_notified: bool,
}

impl Cancellation {
    pub fn new(flags: Arc<RequestFlags>, notifier: Box<dyn BindingNotifier>) -> Self {
        Self {
            flags,
            notifier,
            quit_notified: false,
            reset_notified: false,
        }
    }

    pub fn flags(&self) -> &Arc<RequestFlags> {
        &self.flags
    }

    /// True when either request is pending.
    pub fn check(&self) -> bool {
        self.flags.quit_requested() || self.flags.reset_requested()
    }

    /// Notifies the binding layer about pending requests it has not yet been
    /// told about.
    pub fn raise(&mut self) {
        if self.flags.quit_requested() && !self.quit_notified {
            self.quit_notified = true;
            tracing::info!("quit requested");
            self.notifier.quit_required();
        }
        if self.flags.reset_requested() && !self.reset_notified {
            self.reset_notified = true;
            tracing::info!("reset requested");
            self.notifier.reset_required();
        }
    }

    /// Clears the reset request and re-arms its notification.
    pub fn clear_reset(&mut self) {
        self.flags.clear_reset();
        self.reset_notified = false;
    }
}

/// Notifier that latches requests for a script loop to poll.
#[derive(Debug, Clone, Default)]
pub struct SignalLatch {
    quit: Rc<Cell<bool>>,
    reset: Rc<Cell<u32>>,
}

impl SignalLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quit(&self) -> bool {
        self.quit.get()
    }

    /// Reset notifications received and not yet taken.
    pub fn take_reset(&self) -> bool {
        let pending = self.reset.get();
        if pending > 0 {
            self.reset.set(pending - 1);
            true
        } else {
            false
        }
    }

    pub fn reset_count(&self) -> u32 {
        self.reset.get()
    }
}

impl BindingNotifier for SignalLatch {
    fn quit_required(&mut self) {
        self.quit.set(true);
    }

    fn reset_required(&mut self) {
        self.reset.set(self.reset.get() + 1);
    }
}

/// Notifications sent from the compositor thread to the driver thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    FpsUpdated(f32),
    ShutdownComplete,
}

/// Fire-and-forget delivery of [`EngineEvent`]s. Implementations must not
/// block.
pub trait EventSink {
    fn emit(&self, event: EngineEvent);
}

impl EventSink for EventLoopProxy<EngineEvent> {
    fn emit(&self, event: EngineEvent) {
        // The driver may already be gone during shutdown.
        let _ = self.send_event(event);
    }
}

impl EventSink for Sender<EngineEvent> {
    fn emit(&self, event: EngineEvent) {
        let _ = self.try_send(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EngineEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_request_notifies_once() {
        let flags = RequestFlags::new();
        let latch = SignalLatch::new();
        let mut cancel = Cancellation::new(Arc::clone(&flags), Box::new(latch.clone()));
        assert!(!cancel.check());

        flags.request_reset();
        assert!(cancel.check());
        cancel.raise();
        cancel.raise();
        assert_eq!(latch.reset_count(), 1);

        cancel.clear_reset();
        assert!(!cancel.check());
        flags.request_reset();
        cancel.raise();
        assert_eq!(latch.reset_count(), 2);
    }

    #[test]
    fn quit_is_sticky() {
        let flags = RequestFlags::new();
        let latch = SignalLatch::new();
        let mut cancel = Cancellation::new(Arc::clone(&flags), Box::new(latch.clone()));
        flags.request_quit();
        cancel.raise();
        cancel.raise();
        assert!(latch.quit());
        assert!(cancel.check());
    }

    #[test]
    fn bounded_sender_never_blocks() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.emit(EngineEvent::FpsUpdated(60.0));
        tx.emit(EngineEvent::FpsUpdated(59.0));
        assert_eq!(rx.try_recv(), Ok(EngineEvent::FpsUpdated(60.0)));
        assert!(rx.try_recv().is_err());
    }
}
