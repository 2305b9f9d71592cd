//! Gateway configuration.
//!
//! The only external knob is `HTTP_ADDR`, read once at startup. Timeouts and
//! the list page size are fixed contract values carried here so the pipeline
//! and lifecycle read them from one place.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use eventsink_core::error::{EventSinkError, Result};

pub const ENV_HTTP_ADDR: &str = "HTTP_ADDR";
pub const DEFAULT_HTTP_ADDR: &str = ":8080";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
pub const LIST_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen: SocketAddr,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
    pub list_page_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: REQUEST_TIMEOUT,
            shutdown_grace: SHUTDOWN_GRACE,
            list_page_size: LIST_PAGE_SIZE,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(EventSinkError::InvalidConfig("request_timeout must be non-zero".into()));
        }
        if self.shutdown_grace.is_zero() {
            return Err(EventSinkError::InvalidConfig("shutdown_grace must be non-zero".into()));
        }
        if self.list_page_size == 0 {
            return Err(EventSinkError::InvalidConfig("list_page_size must be non-zero".into()));
        }
        Ok(())
    }
}

pub fn load_from_env() -> Result<GatewayConfig> {
    load_with(|key| std::env::var(key).ok())
}

/// Build the config from an arbitrary variable lookup.
pub fn load_with<F>(lookup: F) -> Result<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(ENV_HTTP_ADDR)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());

    let cfg = GatewayConfig {
        listen: parse_listen(&raw)?,
        ..GatewayConfig::default()
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Accepts `:PORT` (all interfaces), `IP:PORT`, or `HOST:PORT`.
pub fn parse_listen(raw: &str) -> Result<SocketAddr> {
    let raw = raw.trim();
    if let Some(port) = raw.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .map_err(|e| EventSinkError::InvalidConfig(format!("{ENV_HTTP_ADDR}={raw}: {e}")))?;
        return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
    }
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Ok(addr);
    }
    raw.to_socket_addrs()
        .map_err(|e| EventSinkError::InvalidConfig(format!("{ENV_HTTP_ADDR}={raw}: {e}")))?
        .next()
        .ok_or_else(|| {
            EventSinkError::InvalidConfig(format!("{ENV_HTTP_ADDR}={raw}: no address resolved"))
        })
}
