//! Runtime abstraction layer for async operations
//!
//! This module hides the async runtime behind an object-safe spawner trait so
//! the tile loader, the data loader and the overlay generator can queue work
//! without naming tokio directly.

use std::future::Future;
use std::pin::Pin;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle>;

    /// Spawn a future that returns a value
    fn spawn_with_result_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = Box<dyn std::any::Any + Send>> + Send + 'static>>,
    ) -> Box<dyn AsyncHandleWithResult>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Handle to a spawned async task that returns a result
pub trait AsyncHandleWithResult: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Try to get the result if available
    fn try_result(&mut self) -> Option<Box<dyn std::any::Any + Send>>;

    /// Cancel the task
    fn cancel(&self);
}

/// Convenience functions for spawning with type safety
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime().spawn_boxed(Box::pin(future))
}

pub fn spawn_with_result<F, T>(future: F) -> Box<dyn AsyncHandleWithResult>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let boxed_future = Box::pin(async move {
        let result = future.await;
        Box::new(result) as Box<dyn std::any::Any + Send>
    });
    runtime().spawn_with_result_boxed(boxed_future)
}

/// Default spawner implementations
pub mod spawners {
    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::super::{AsyncHandle, AsyncHandleWithResult, AsyncSpawner};
        use ::tokio::task::JoinHandle;
        use futures::future::FutureExt;
        use std::future::Future;
        use std::pin::Pin;
        use std::sync::{Arc, Mutex};

        /// Type alias for tokio handle with result
        type TokioHandleResult = Arc<Mutex<Option<JoinHandle<Box<dyn std::any::Any + Send>>>>>;

        /// Tokio-based async spawner
        pub struct TokioSpawner;

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Box<dyn AsyncHandle> {
                let handle = ::tokio::spawn(future);
                Box::new(TokioHandle(handle))
            }

            fn spawn_with_result_boxed(
                &self,
                future: Pin<
                    Box<dyn Future<Output = Box<dyn std::any::Any + Send>> + Send + 'static>,
                >,
            ) -> Box<dyn AsyncHandleWithResult> {
                let handle = ::tokio::spawn(future);
                Box::new(TokioHandleWithResult(Arc::new(Mutex::new(Some(handle)))))
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }

        struct TokioHandleWithResult(TokioHandleResult);

        impl AsyncHandleWithResult for TokioHandleWithResult {
            fn is_finished(&self) -> bool {
                if let Ok(guard) = self.0.lock() {
                    if let Some(handle) = guard.as_ref() {
                        return handle.is_finished();
                    }
                }
                true
            }

            fn try_result(&mut self) -> Option<Box<dyn std::any::Any + Send>> {
                if let Ok(mut guard) = self.0.lock() {
                    if let Some(handle) = guard.take() {
                        if handle.is_finished() {
                            return handle.now_or_never().and_then(|r| r.ok());
                        } else {
                            *guard = Some(handle);
                        }
                    }
                }
                None
            }

            fn cancel(&self) {
                if let Ok(guard) = self.0.lock() {
                    if let Some(handle) = guard.as_ref() {
                        handle.abort();
                    }
                }
            }
        }
    }
}

/// Shared async utilities used by the loaders
pub mod async_utils {
    /// Counting semaphore for bounding concurrent downloads
    #[derive(Debug, Clone)]
    pub struct Semaphore {
        permits: std::sync::Arc<std::sync::Mutex<usize>>,
        max_permits: usize,
    }

    impl Semaphore {
        pub fn new(permits: usize) -> Self {
            Self {
                permits: std::sync::Arc::new(std::sync::Mutex::new(permits)),
                max_permits: permits,
            }
        }

        pub fn try_acquire(&self) -> bool {
            if let Ok(mut permits) = self.permits.lock() {
                if *permits > 0 {
                    *permits -= 1;
                    return true;
                }
            }
            false
        }

        pub fn release(&self) {
            if let Ok(mut permits) = self.permits.lock() {
                if *permits < self.max_permits {
                    *permits += 1;
                }
            }
        }

        pub fn available_permits(&self) -> usize {
            self.permits.lock().map(|permits| *permits).unwrap_or(0)
        }
    }

    /// Async delay that works with or without the tokio runtime
    pub async fn async_delay(duration: std::time::Duration) {
        #[cfg(feature = "tokio-runtime")]
        {
            tokio::time::sleep(duration).await;
        }

        #[cfg(not(feature = "tokio-runtime"))]
        {
            let start = std::time::Instant::now();
            while start.elapsed() < duration {
                std::hint::spin_loop();
            }
        }
    }
}

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Initialize the runtime with a specific spawner
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) {
    let _ = RUNTIME.set(spawner);
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| {
            #[cfg(feature = "tokio-runtime")]
            {
                Box::new(spawners::tokio_impl::TokioSpawner)
            }

            #[cfg(not(feature = "tokio-runtime"))]
            {
                panic!("No async runtime available. Enable the 'tokio-runtime' feature.");
            }
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semaphore_permits() {
        let sem = async_utils::Semaphore::new(2);
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
        sem.release();
        assert_eq!(sem.available_permits(), 1);
    }

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test]
    async fn test_tokio_spawner() {
        let handle = spawn(async {
            ::tokio::time::sleep(::tokio::time::Duration::from_millis(10)).await;
        });

        // Should not be finished immediately
        assert!(!handle.is_finished());

        // Wait a bit and check again
        ::tokio::time::sleep(::tokio::time::Duration::from_millis(20)).await;
        assert!(handle.is_finished());
    }

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test]
    async fn test_spawn_with_result_roundtrip() {
        let mut handle = spawn_with_result(async { 21u32 * 2 });

        let mut result = None;
        for _ in 0..100 {
            if let Some(boxed) = handle.try_result() {
                result = boxed.downcast::<u32>().ok().map(|value| *value);
                break;
            }
            ::tokio::time::sleep(::tokio::time::Duration::from_millis(5)).await;
        }

        assert_eq!(result, Some(42));
    }
}
