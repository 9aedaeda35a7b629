use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reactive::subject::{PublishSubject, Subscription};

/// The visible pixel area tiles are rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ViewportSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ViewportSize {
    /// Creates a viewport size from signed input, clamping negative
    /// dimensions to zero
    pub fn new(width: i32, height: i32) -> Self {
        if width < 0 || height < 0 {
            log::warn!(
                "negative viewport size {}x{} clamped to zero",
                width,
                height
            );
        }
        Self {
            width: width.max(0) as u32,
            height: height.max(0) as u32,
        }
    }

    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for ViewportSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Fire-and-forget broadcast of viewport sizes
///
/// Only subscribers attached at publication time see a size; nothing is
/// retained for later subscribers.
#[derive(Clone, Default)]
pub struct ViewportSizeChannel {
    subject: PublishSubject<ViewportSize>,
}

impl ViewportSizeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, size: ViewportSize) {
        if self.subject.subscriber_count() == 0 {
            log::debug!("viewport size {} dropped: no subscribers", size);
        }
        self.subject.next(size);
    }

    pub fn subscribe(&self) -> Subscription<ViewportSize> {
        self.subject.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subject.subscriber_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_dimensions_are_clamped() {
        assert_eq!(ViewportSize::new(-10, 480), ViewportSize::from_pixels(0, 480));
        assert_eq!(ViewportSize::new(320, -1), ViewportSize::from_pixels(320, 0));
        assert!(ViewportSize::new(-1, -1).is_empty());
    }

    #[test]
    fn test_channel_does_not_replay() {
        let channel = ViewportSizeChannel::new();
        channel.publish(ViewportSize::from_pixels(100, 100));

        let mut sub = channel.subscribe();
        assert!(sub.try_recv().is_none());

        let size = ViewportSize::from_pixels(320, 480);
        channel.publish(size);
        assert_eq!(sub.try_recv(), Some(Ok(size)));
        assert_eq!(channel.subscriber_count(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(ViewportSize::from_pixels(320, 480).to_string(), "320x480");
    }
}
