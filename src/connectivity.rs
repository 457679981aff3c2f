//! Connectivity pre-check.
//!
//! A single TCP connect to a well-known host gates every submission. There
//! is no retry: a failed probe blocks the submission before any API call.

use crate::config::Settings;
use crate::error::{ResearchError, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// TCP reachability probe
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    addr: String,
    timeout: Duration,
}

impl ConnectivityProbe {
    /// Create a probe for `host:port`
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.probe_addr.clone(), settings.probe_timeout)
    }

    /// Open and immediately drop one TCP connection.
    pub async fn check(&self) -> Result<()> {
        debug!(addr = %self.addr, "Probing connectivity");

        match tokio::time::timeout(self.timeout, TcpStream::connect(self.addr.as_str())).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => {
                warn!(addr = %self.addr, error = %e, "Connectivity probe failed");
                Err(ResearchError::Connectivity(format!(
                    "cannot reach {}: {}",
                    self.addr, e
                )))
            }
            Err(_) => {
                warn!(addr = %self.addr, timeout_secs = self.timeout.as_secs(), "Connectivity probe timed out");
                Err(ResearchError::Connectivity(format!(
                    "timed out reaching {} after {}s",
                    self.addr,
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_succeeds_against_listener() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let probe = ConnectivityProbe::new(addr.to_string(), Duration::from_secs(2));
        probe.check().await
    }

    #[tokio::test]
    async fn test_probe_fails_on_closed_port() -> Result<()> {
        // Bind then drop to get a port nothing listens on
        let addr = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;

        let probe = ConnectivityProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(matches!(
            probe.check().await,
            Err(ResearchError::Connectivity(_))
        ));
        Ok(())
    }
}
