//! Runtime abstraction layer for async operations
//!
//! The combinator, the load pipeline and every tile fetch run as tasks handed
//! to an [`AsyncSpawner`]. The core never creates threads of its own; which
//! executor runs the tasks is up to the embedding application.

use crate::prelude::{Future, Pin};
use crate::{MapError, Result};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Convenience for spawning unboxed futures on any spawner, including
/// `dyn AsyncSpawner`
pub trait SpawnerExt {
    fn spawn<F>(&self, future: F) -> Box<dyn AsyncHandle>
    where
        F: Future<Output = ()> + Send + 'static;
}

impl<S: AsyncSpawner + ?Sized> SpawnerExt for S {
    fn spawn<F>(&self, future: F) -> Box<dyn AsyncHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_boxed(Box::pin(future))
    }
}

/// Tokio-based async spawner
///
/// Holds a runtime handle, so tasks can be spawned from threads that are not
/// themselves inside the runtime (a UI thread, for instance).
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller is running in
    pub fn current() -> Result<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| MapError::Runtime(e.to_string()))
    }
}

impl AsyncSpawner for TokioSpawner {
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle> {
        let handle = self.handle.spawn(future);
        Box::new(TokioHandle(handle))
    }
}

struct TokioHandle(tokio::task::JoinHandle<()>);

impl AsyncHandle for TokioHandle {
    fn is_finished(&self) -> bool {
        self.0.is_finished()
    }

    fn cancel(&self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_tokio_spawner() {
        let spawner = TokioSpawner::current().unwrap();
        let handle = spawner.spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
        });

        // Should not be finished immediately
        assert!(!handle.is_finished());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_cancel_stops_task() {
        let spawner = TokioSpawner::current().unwrap();
        let handle = spawner.spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        handle.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_finished());
    }

    #[test]
    fn test_current_outside_runtime_fails() {
        assert!(matches!(TokioSpawner::current(), Err(MapError::Runtime(_))));
    }
}
