//! Background fetching for GeoJSON sources.
//!
//! Fetches run on the shared async runtime and results come back over a
//! channel, so the map can keep rendering while documents download.

use crate::data::geojson::GeoJson;
use crate::runtime;
use crate::tiles::loader::HTTP_CLIENT;

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Outcome of one GeoJSON fetch
#[derive(Debug)]
pub struct DataResult {
    pub source: String,
    pub data: crate::Result<GeoJson>,
}

/// Fetches GeoJSON documents without blocking the caller
#[derive(Debug)]
pub struct DataLoader {
    result_tx: Sender<DataResult>,
    result_rx: Receiver<DataResult>,
}

impl DataLoader {
    pub fn new() -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            result_tx,
            result_rx,
        }
    }

    /// Starts fetching `url` for the given source.
    ///
    /// Must be called from within the async runtime. The result arrives
    /// through [`try_recv_results`](Self::try_recv_results).
    pub fn fetch(&self, source_id: &str, url: &str) {
        let source = source_id.to_string();
        let url = url.to_string();
        let result_tx = self.result_tx.clone();

        runtime::spawn(async move {
            let start = instant::Instant::now();
            let data = fetch_document(&url).await;

            if data.is_ok() {
                log::debug!(
                    "Fetched GeoJSON for '{}' from {} in {:?}",
                    source,
                    url,
                    start.elapsed()
                );
            }

            let _ = result_tx.send(DataResult { source, data });
        });
    }

    /// Drains every fetch result that has arrived so far
    pub fn try_recv_results(&self) -> Vec<DataResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            results.push(result);
        }
        results
    }
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch_document(url: &str) -> crate::Result<GeoJson> {
    let body = HTTP_CLIENT
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    GeoJson::from_str(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_fetch_surfaces_error() {
        let loader = DataLoader::new();
        // Port 9 (discard) refuses connections immediately
        loader.fetch("shelter", "http://127.0.0.1:9/data/shelter.geojson");

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        let mut results = Vec::new();
        while results.is_empty() && std::time::Instant::now() < deadline {
            results = loader.try_recv_results();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "shelter");
        assert!(results[0].data.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_results_start_empty() {
        let loader = DataLoader::new();
        assert!(loader.try_recv_results().is_empty());
    }
}
