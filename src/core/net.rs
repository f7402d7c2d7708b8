use std::time::Duration;

use reqwest::Client;
use tracing::info;

pub const DEFAULT_ADDRESS_ENDPOINT: &str = "https://ifconfig.me/ip";
/// Shown instead of an address when the lookup fails.
pub const UNAVAILABLE_ADDRESS: &str = "unknown (unavailable)";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort lookup of this host's public address, for display only.
#[derive(Clone)]
pub struct PublicAddressProbe {
    client: Client,
    endpoint: String,
}

impl PublicAddressProbe {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// One GET to the lookup endpoint. Never fails: any problem yields
    /// `UNAVAILABLE_ADDRESS` and an info log line.
    pub async fn probe(&self) -> String {
        match self.fetch().await {
            Ok(address) => address,
            Err(reason) => {
                info!("Public address lookup via {} failed: {}", self.endpoint, reason);
                UNAVAILABLE_ADDRESS.to_string()
            }
        }
    }

    async fn fetch(&self) -> Result<String, String> {
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(format!("HTTP {status}"));
        }

        let address = response.text().await.map_err(|e| e.to_string())?;
        let address = address.trim();
        if address.is_empty() {
            return Err("empty response".into());
        }
        Ok(address.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{local_client, serve};

    #[tokio::test]
    async fn returns_trimmed_address() {
        let url = serve(200, "OK", b"203.0.113.7\n".to_vec(), true).await;
        let probe = PublicAddressProbe::new(local_client(), format!("{url}ip"));
        assert_eq!(probe.probe().await, "203.0.113.7");
    }

    #[tokio::test]
    async fn non_200_falls_back() {
        let url = serve(503, "Service Unavailable", b"busy".to_vec(), true).await;
        let probe = PublicAddressProbe::new(local_client(), format!("{url}ip"));
        assert_eq!(probe.probe().await, UNAVAILABLE_ADDRESS);
    }

    #[tokio::test]
    async fn unreachable_endpoint_falls_back() {
        let probe = PublicAddressProbe::new(local_client(), "http://127.0.0.1:1/ip");
        assert_eq!(probe.probe().await, UNAVAILABLE_ADDRESS);
    }
}
