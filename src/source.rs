use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

use crate::constants::TELEMETRY_PATH;
use crate::telemetry::TelemetryReading;

/// Where the drone view gets its readings from.
pub trait TelemetrySource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<TelemetryReading>> + Send;
}

/// Reads telemetry from a dashboard server over HTTP.
#[derive(Clone)]
pub struct HttpTelemetrySource {
    client: reqwest::Client,
    url: String,
}

impl HttpTelemetrySource {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), TELEMETRY_PATH),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TelemetrySource for HttpTelemetrySource {
    async fn fetch(&self) -> Result<TelemetryReading> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?
            .error_for_status()?;
        let reading = response
            .json::<TelemetryReading>()
            .await
            .context("Malformed telemetry body")?;
        Ok(reading)
    }
}

/// One telemetry read. Failures are logged and come back as `None`.
pub async fn fetch_drone_data<T: TelemetrySource>(source: &T) -> Option<TelemetryReading> {
    match source.fetch().await {
        Ok(reading) => Some(reading),
        Err(e) => {
            tracing::error!("Error fetching drone data: {:#}", e);
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed script of results, then keeps failing.
    pub(crate) struct ScriptedSource {
        script: Mutex<VecDeque<Result<TelemetryReading>>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn new(script: Vec<Result<TelemetryReading>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TelemetrySource for ScriptedSource {
        async fn fetch(&self) -> Result<TelemetryReading> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(anyhow!("connection refused")))
        }
    }

    #[tokio::test]
    async fn failures_become_none() {
        let source = ScriptedSource::new(vec![Err(anyhow!("timed out"))]);
        assert!(fetch_drone_data(&source).await.is_none());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn successes_pass_through() {
        let reading = crate::telemetry::tests::reading(40.0, 24.0);
        let source = ScriptedSource::new(vec![Ok(reading.clone())]);
        assert_eq!(fetch_drone_data(&source).await, Some(reading));
    }

    #[test]
    fn url_is_joined_to_the_telemetry_path() {
        let source = HttpTelemetrySource::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(source.url(), "http://127.0.0.1:5000/api/drone_telemetry");
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        // Port 9 (discard) is closed on test machines
        let source = HttpTelemetrySource::new("http://127.0.0.1:9").unwrap();
        assert!(fetch_drone_data(&source).await.is_none());
    }
}
