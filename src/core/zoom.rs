use crate::core::constants::MIN_ZOOM;
use crate::reactive::subject::{BehaviorSubject, Subscription};

/// Observable zoom level cell
///
/// Holds no bounds of its own: callers clamp before calling [`ZoomLevel::set`].
/// Subscribers always receive the current level first.
#[derive(Clone)]
pub struct ZoomLevel {
    subject: BehaviorSubject<u8>,
}

impl ZoomLevel {
    pub fn new(initial: u8) -> Self {
        Self {
            subject: BehaviorSubject::with_value(initial),
        }
    }

    pub fn get(&self) -> u8 {
        self.subject.value().unwrap_or(MIN_ZOOM)
    }

    /// Publish `level` if it differs from the current one. Returns whether
    /// anything was published.
    pub fn set(&self, level: u8) -> bool {
        self.subject.next_if_changed(level)
    }

    /// Replace the level with `f(current)` in one step, publishing if it
    /// changed. Returns the old and new level when something was published.
    pub fn update<F>(&self, f: F) -> Option<(u8, u8)>
    where
        F: FnOnce(u8) -> u8,
    {
        self.subject.update(|level| f(*level))
    }

    pub fn subscribe(&self) -> Subscription<u8> {
        self.subject.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_subscriber_gets_current_level() {
        let zoom = ZoomLevel::new(3);
        zoom.set(4);

        let mut sub = zoom.subscribe();
        assert_eq!(sub.drain(), vec![Ok(4)]);
        assert_eq!(zoom.get(), 4);
    }

    #[test]
    fn test_setting_same_level_publishes_nothing() {
        let zoom = ZoomLevel::new(2);
        let mut sub = zoom.subscribe();
        sub.drain();

        assert!(!zoom.set(2));
        assert!(sub.try_recv().is_none());

        assert!(zoom.set(25), "the cell itself does not clamp");
        assert_eq!(sub.try_recv(), Some(Ok(25)));
    }

    #[test]
    fn test_update_reports_old_and_new_level() {
        let zoom = ZoomLevel::new(7);
        assert_eq!(zoom.update(|level| level + 1), Some((7, 8)));
        assert_eq!(zoom.update(|level| level), None);
        assert_eq!(zoom.get(), 8);
    }
}
