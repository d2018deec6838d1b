//! Horizontal scroll synchronization between the grid body and its frozen
//! header/footer strips.
//!
//! The body's offset is the only source of truth. Scroll and resize events
//! record the latest value and ask the host for a frame; subscribers are
//! notified once per frame with whatever value is current by then.

/// Latest-value-wins buffer that asks for at most one frame at a time.
#[derive(Debug, Clone, Default)]
pub struct FrameCoalescer<T> {
    pending: Option<T>,
    frame_requested: bool,
}

impl<T> FrameCoalescer<T> {
    pub fn new() -> Self {
        Self {
            pending: None,
            frame_requested: false,
        }
    }

    /// Store `value`; returns true when the caller must schedule a frame.
    pub fn push(&mut self, value: T) -> bool {
        self.pending = Some(value);
        if self.frame_requested {
            false
        } else {
            self.frame_requested = true;
            true
        }
    }

    /// Take the value accumulated since the last frame.
    pub fn take(&mut self) -> Option<T> {
        self.frame_requested = false;
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.frame_requested
    }
}

pub type SubscriberId = usize;

type Subscriber = Box<dyn FnMut(f64)>;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    content: f64,
    viewport: f64,
}

pub struct ScrollSynchronizer {
    offset: f64,
    applied: Option<f64>,
    extent: Option<Extent>,
    scrolls: FrameCoalescer<f64>,
    resizes: FrameCoalescer<Extent>,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    next_id: SubscriberId,
}

impl Default for ScrollSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollSynchronizer {
    pub fn new() -> Self {
        Self {
            offset: 0.0,
            applied: None,
            extent: None,
            scrolls: FrameCoalescer::new(),
            resizes: FrameCoalescer::new(),
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Current body offset, clamped to the known extent.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Register a decoration that must follow the body. It receives the
    /// current offset on the next frame.
    pub fn subscribe(&mut self, subscriber: impl FnMut(f64) + 'static) -> SubscriberId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        self.applied = None;
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Body scroll event. Returns true when a frame must be requested.
    pub fn on_body_scroll(&mut self, offset: f64) -> bool {
        self.scrolls.push(offset)
    }

    /// Body or content resize event. Returns true when a frame must be
    /// requested.
    pub fn on_resize(&mut self, content_width: f64, viewport_width: f64) -> bool {
        self.resizes.push(Extent {
            content: content_width,
            viewport: viewport_width,
        })
    }

    /// Programmatic scroll (e.g. scroll-into-view from the navigator).
    /// Applied on the next frame like any body scroll.
    pub fn scroll_body_to(&mut self, offset: f64) -> bool {
        self.on_body_scroll(offset)
    }

    /// Display-refresh callback: fold pending events into the offset and
    /// notify subscribers if it changed. Returns the offset when subscribers
    /// were notified.
    pub fn on_frame(&mut self) -> Option<f64> {
        if let Some(extent) = self.resizes.take() {
            self.extent = Some(extent);
        }
        if let Some(offset) = self.scrolls.take() {
            self.offset = offset;
        }
        self.offset = self.clamp(self.offset);

        if self.applied == Some(self.offset) {
            return None;
        }
        for (_, subscriber) in &mut self.subscribers {
            subscriber(self.offset);
        }
        self.applied = Some(self.offset);
        Some(self.offset)
    }

    pub fn needs_frame(&self) -> bool {
        self.scrolls.is_pending() || self.resizes.is_pending()
    }

    fn clamp(&self, offset: f64) -> f64 {
        let max = match self.extent {
            Some(Extent { content, viewport }) => (content - viewport).max(0.0),
            None => f64::INFINITY,
        };
        if offset.is_finite() {
            offset.clamp(0.0, max)
        } else {
            0.0
        }
    }
}
