use crate::error::{Error, Result};
use std::time::Duration;

/// Per-probe wait used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Raw sockets cannot wait for less than this; shorter waits block forever.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingConfig {
    /// Number of echo requests, each attempted once.
    pub count: u16,
    pub timeout: Duration,
    pub ttl: u8,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self { count: 4, timeout: DEFAULT_TIMEOUT, ttl: 255 }
    }
}

impl PingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(Error::Config("count must be at least 1".to_string()));
        }
        if self.ttl == 0 {
            return Err(Error::Config("ttl must be at least 1".to_string()));
        }
        validate_timeout(self.timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig {
    pub max_hops: u8,
    pub timeout: Duration,
    /// Reverse-resolve hop addresses to hostnames.
    pub resolve_hops: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { max_hops: 30, timeout: DEFAULT_TIMEOUT, resolve_hops: true }
    }
}

impl TraceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_hops == 0 {
            return Err(Error::Config("max hops must be at least 1".to_string()));
        }
        validate_timeout(self.timeout)
    }
}

fn validate_timeout(timeout: Duration) -> Result<()> {
    if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&timeout) {
        return Err(Error::Config(format!(
            "timeout must be between {:?} and {:?}, got {:?}",
            MIN_TIMEOUT, MAX_TIMEOUT, timeout
        )));
    }
    Ok(())
}
