use crate::core::geo::TileCoord;
use crate::prelude::HashSet;
use crate::runtime::async_utils::{async_delay, Semaphore};
use crate::tiles::source::TileSource;
use once_cell::sync::Lazy;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared async HTTP client with a custom User-Agent so that public tile
/// servers (e.g. OpenStreetMap) don't reject the request. The GeoJSON and
/// Gemini clients reuse it as well.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent("notomap/0.1.0")
        .timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Configuration for the tile loader
#[derive(Debug, Clone)]
pub struct TileLoaderConfig {
    /// Maximum number of downloads in flight at once
    pub max_concurrent: usize,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for TileLoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl TileLoaderConfig {
    /// Small limits and a short timeout for tests
    pub fn for_testing() -> Self {
        Self {
            max_concurrent: 2,
            request_timeout: Duration::from_secs(2),
        }
    }
}

/// A queued download. Tasks drain in submission order, so callers control
/// priority by ordering the coordinates they queue.
#[derive(Debug, Clone)]
struct TileTask {
    source: String,
    coord: TileCoord,
    url: String,
    sequence: u64,
}

impl PartialEq for TileTask {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for TileTask {}

impl PartialOrd for TileTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TileTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap pops the maximum, so earlier sequence numbers compare greater
        other.sequence.cmp(&self.sequence)
    }
}

/// A finished download, successful or not
#[derive(Debug)]
pub struct TileResult {
    pub source: String,
    pub coord: TileCoord,
    pub data: crate::Result<Vec<u8>>,
}

/// Async tile loader shared by all raster sources of a map.
///
/// Downloads run on the global runtime, bounded by a semaphore; completed
/// tiles come back over a channel drained by [`TileLoader::try_recv_results`].
/// Must be created inside an async runtime.
#[derive(Debug)]
pub struct TileLoader {
    task_tx: crossbeam_channel::Sender<TileTask>,
    result_rx: crossbeam_channel::Receiver<TileResult>,
    pending: Arc<Mutex<HashSet<(String, TileCoord)>>>,
    sequence: AtomicU64,
}

impl TileLoader {
    pub fn new(config: TileLoaderConfig) -> Self {
        let (task_tx, task_rx) = crossbeam_channel::unbounded();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        let worker = TileWorker {
            task_rx,
            result_tx,
            queue: BinaryHeap::new(),
            semaphore: Semaphore::new(config.max_concurrent),
            config,
        };
        crate::runtime::spawn(async move {
            worker.run().await;
        });

        Self {
            task_tx,
            result_rx,
            pending: Arc::new(Mutex::new(HashSet::default())),
            sequence: AtomicU64::new(0),
        }
    }

    /// Queues downloads for a source, skipping coordinates already in flight.
    /// Returns how many tasks were actually queued.
    pub fn queue_tiles(
        &self,
        source_id: &str,
        source: &dyn TileSource,
        coords: &[TileCoord],
    ) -> usize {
        let mut queued = 0;
        for &coord in coords {
            let key = (source_id.to_string(), coord);
            {
                let mut pending = match self.pending.lock() {
                    Ok(pending) => pending,
                    Err(_) => return queued,
                };
                if pending.contains(&key) {
                    continue;
                }
                pending.insert(key);
            }

            let task = TileTask {
                source: source_id.to_string(),
                coord,
                url: source.url(coord),
                sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            };
            if self.task_tx.send(task).is_err() {
                log::warn!("tile worker is gone, dropping queued tiles");
                return queued;
            }
            queued += 1;
        }
        queued
    }

    /// Drains completed downloads without blocking
    pub fn try_recv_results(&self) -> Vec<TileResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            if let Ok(mut pending) = self.pending.lock() {
                pending.remove(&(result.source.clone(), result.coord));
            }
            results.push(result);
        }
        results
    }

    /// Number of downloads queued or in flight
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }
}

/// Worker task that owns the queue and fans downloads out to the runtime
struct TileWorker {
    task_rx: crossbeam_channel::Receiver<TileTask>,
    result_tx: crossbeam_channel::Sender<TileResult>,
    queue: BinaryHeap<TileTask>,
    semaphore: Semaphore,
    config: TileLoaderConfig,
}

impl TileWorker {
    async fn run(mut self) {
        loop {
            // Drain everything waiting on the channel into the queue
            while let Ok(task) = self.task_rx.try_recv() {
                self.queue.push(task);
            }

            if let Some(task) = self.queue.pop() {
                if self.semaphore.try_acquire() {
                    let result_tx = self.result_tx.clone();
                    let semaphore = self.semaphore.clone();
                    let timeout = self.config.request_timeout;

                    crate::runtime::spawn(async move {
                        let started = instant::Instant::now();
                        let data = TileWorker::download_tile(&task.url, timeout).await;

                        if let Ok(bytes) = &data {
                            log::debug!(
                                "tile {}/{}/{} from '{}' fetched in {}ms ({} bytes)",
                                task.coord.z,
                                task.coord.x,
                                task.coord.y,
                                task.source,
                                started.elapsed().as_millis(),
                                bytes.len()
                            );
                        }

                        let _ = result_tx.send(TileResult {
                            source: task.source,
                            coord: task.coord,
                            data,
                        });
                        semaphore.release();
                    });
                } else {
                    // No capacity, put the task back and yield
                    self.queue.push(task);
                    async_delay(Duration::from_millis(10)).await;
                }
            } else {
                // Idle: wait briefly for new tasks, exit when the loader is dropped
                match self.task_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(task) => self.queue.push(task),
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                }
            }

            async_delay(Duration::from_millis(10)).await;
        }
    }

    async fn download_tile(url: &str, timeout: Duration) -> crate::Result<Vec<u8>> {
        let response = HTTP_CLIENT
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
