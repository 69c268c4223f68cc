//! Host collaborator contracts.
//!
//! ## Usage
//!
//! The host widget layer implements [`BlurTarget`] for the content behind
//! the blur and [`BlurRegion`] for the widget displaying the blurred
//! result, and drives a [`PreDrawRegistry`] once per frame before its
//! draw pass. Controllers own the subscribe/unsubscribe lifecycle of
//! their listeners.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;

use crate::{
    error::CaptureError,
    node::SharedRenderNode,
    px::{PxPosition, PxSize},
    surface::Surface,
};

/// The content region being blurred (the "behind" layer).
///
/// Drawing happens in the target's local coordinate space; its on-screen
/// location anchors that space in the containing coordinate system.
pub trait BlurTarget: Send + Sync {
    /// Current size of the target region.
    fn size(&self) -> PxSize;

    /// Current on-screen location of the target region's origin.
    fn location_on_screen(&self) -> PxPosition;

    /// Draws the target's content, and everything behind it, onto
    /// `surface`.
    ///
    /// Errors indicate an unsupported backing resource; controllers log
    /// and continue with partial content.
    fn draw(&self, surface: &mut dyn Surface) -> Result<(), CaptureError>;

    /// The target's recorded draw output, when the host backend maintains
    /// one. Returning `Some` selects the effect-graph strategy at
    /// controller construction.
    fn render_node(&self) -> Option<SharedRenderNode> {
        None
    }

    /// The pre-draw registry of the window hosting this target.
    fn pre_draw_registry(&self) -> Arc<PreDrawRegistry>;
}

/// The region that displays the blurred result.
pub trait BlurRegion: Send + Sync {
    /// Current measured size of the region.
    fn size(&self) -> PxSize;

    /// Current on-screen location of the region's origin.
    fn location_on_screen(&self) -> PxPosition;

    /// Asks the host to redraw the region on the next frame.
    fn request_redraw(&self);

    /// The pre-draw registry of the window hosting this region. May be
    /// the same allocation as the target's registry; controllers compare
    /// with [`Arc::ptr_eq`] before double-subscribing.
    fn pre_draw_registry(&self) -> Arc<PreDrawRegistry>;
}

/// A callback invoked once per frame before the host draws.
pub type PreDrawListener = Arc<dyn Fn() + Send + Sync>;

/// Handle for a registered pre-draw listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Per-window pre-draw callback registry.
///
/// The host calls [`PreDrawRegistry::dispatch`] at the start of every
/// frame, before rendering any surface, which is what guarantees
/// capture-then-draw ordering within a frame.
#[derive(Default)]
pub struct PreDrawRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, PreDrawListener)>>,
}

impl PreDrawRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` and returns the handle needed to remove it.
    pub fn subscribe(&self, listener: PreDrawListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Removes a listener. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Invokes every registered listener.
    ///
    /// Listeners are snapshotted before invocation so they may
    /// subscribe/unsubscribe from within the callback.
    pub fn dispatch(&self) {
        let snapshot: Vec<PreDrawListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener();
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_subscribe_dispatch_unsubscribe() {
        let registry = PreDrawRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_listener = calls.clone();
        let id = registry.subscribe(Arc::new(move || {
            calls_in_listener.fetch_add(1, Ordering::SeqCst);
        }));

        registry.dispatch();
        registry.dispatch();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(registry.unsubscribe(id));
        registry.dispatch();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!registry.unsubscribe(id));
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let registry = Arc::new(PreDrawRegistry::new());
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        let registry_in_listener = registry.clone();
        let slot_in_listener = slot.clone();
        let id = registry.subscribe(Arc::new(move || {
            if let Some(id) = slot_in_listener.lock().take() {
                registry_in_listener.unsubscribe(id);
            }
        }));
        *slot.lock() = Some(id);
        registry.dispatch();
        assert!(registry.is_empty());
    }
}
