//! Relay configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::audio::{FrameLayout, SampleSpec};
use crate::error::{Error, Result};
use crate::registry::RegistryConfig;

/// Default TCP port for PCM clients
pub const DEFAULT_PORT: u16 = 5903;

/// Default buffer length in milliseconds
pub const DEFAULT_BUFFER_MS: u32 = 50;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,

    /// Capture server address (empty = default server)
    pub capture_server: String,

    /// Capture device name (empty = default source)
    pub capture_device: String,

    /// Format, rate and channel count of the captured stream
    pub sample_spec: SampleSpec,

    /// Audio per broadcast frame in milliseconds
    pub buffer_ms: u32,

    /// Enable TCP_NODELAY on client sockets
    pub tcp_nodelay: bool,

    /// First delay after a transient accept error
    pub accept_backoff: Duration,

    /// Longest delay between accept retries
    pub accept_backoff_max: Duration,

    /// Client registry options
    pub registry: RegistryConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            capture_server: String::new(),
            capture_device: String::new(),
            sample_spec: SampleSpec::default(),
            buffer_ms: DEFAULT_BUFFER_MS,
            tcp_nodelay: true, // Keeps per-frame latency down
            accept_backoff: Duration::from_secs(1),
            accept_backoff_max: Duration::from_secs(8),
            registry: RegistryConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the capture server
    pub fn capture_server(mut self, server: impl Into<String>) -> Self {
        self.capture_server = server.into();
        self
    }

    /// Set the capture device
    pub fn capture_device(mut self, device: impl Into<String>) -> Self {
        self.capture_device = device.into();
        self
    }

    /// Set the channel count
    pub fn channels(mut self, channels: u8) -> Self {
        self.sample_spec.channels = channels;
        self
    }

    /// Set the sample rate
    pub fn rate(mut self, rate: u32) -> Self {
        self.sample_spec.rate = rate;
        self
    }

    /// Set the buffer length
    pub fn buffer_ms(mut self, ms: u32) -> Self {
        self.buffer_ms = ms;
        self
    }

    /// Bound each client write
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.registry = self.registry.write_timeout(timeout);
        self
    }

    /// Set accept retry delays
    pub fn accept_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.accept_backoff = initial;
        self.accept_backoff_max = max.max(initial);
        self
    }

    /// Validate settings that must hold before anything is started
    pub fn validate(&self) -> Result<()> {
        self.sample_spec.validate()?;
        FrameLayout::try_new(&self.sample_spec, self.buffer_ms)?;
        Ok(())
    }

    /// Byte layout of one broadcast frame
    pub fn frame_layout(&self) -> FrameLayout {
        FrameLayout::new(&self.sample_spec, self.buffer_ms)
    }
}

/// Resolve a listen address
///
/// Accepts `IP:PORT`, `HOST:PORT`, a bare IP or host name (default port),
/// and `:PORT`. The `:PORT` form binds the IPv4 wildcard `0.0.0.0`; pass
/// `[::]:PORT` to listen on IPv6. Host names are looked up and the first
/// address returned is used.
pub async fn resolve_listen_addr(arg: &str) -> Result<SocketAddr> {
    let arg = arg.trim();
    let invalid = || Error::InvalidListenAddr(arg.to_string());

    if let Some(port) = arg.strip_prefix(':') {
        return port
            .parse::<u16>()
            .map(|port| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
            .map_err(|_| invalid());
    }

    if let Ok(addr) = arg.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = arg.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    let (host, port) = match arg.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
        None => (arg, DEFAULT_PORT),
    };

    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid());
    }

    if host.eq_ignore_ascii_case("localhost") {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
    }

    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| {
            tracing::debug!(host = %host, error = %e, "Listen host lookup failed");
            invalid()
        })?;

    addrs.next().ok_or_else(invalid)
}
