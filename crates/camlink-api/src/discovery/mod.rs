// WS-Discovery engine
//
// Sends one multicast Probe and collects ProbeMatches replies until a
// deadline. The engine owns its UDP socket for the duration of a run and
// releases it (leaving the multicast group first) when the run ends, when
// `stop()` is called, or when the engine is dropped.

mod probe;
mod reply;
mod scopes;
mod vendor;

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::types::DiscoveredDevice;

pub use probe::Probe;
pub use scopes::ScopeInfo;

/// Standard WS-Discovery multicast group.
pub const MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
/// Standard WS-Discovery port.
pub const DISCOVERY_PORT: u16 = 3702;

type ErrorHook = Box<dyn Fn(&Error) + Send + Sync>;

/// Socket and addressing settings for a discovery engine.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Local address to bind. Defaults to `0.0.0.0:3702`.
    pub bind_addr: SocketAddr,
    /// Where the probe is sent. When this is not a multicast address the
    /// group join is skipped and the probe goes out as plain unicast.
    pub target: SocketAddr,
    /// Interface used for the multicast join (`0.0.0.0` lets the OS pick).
    pub interface: Ipv4Addr,
    /// Multicast TTL for the outbound probe.
    pub multicast_ttl: u32,
    /// Receive buffer size per datagram.
    pub recv_buffer: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DISCOVERY_PORT)),
            target: SocketAddr::V4(SocketAddrV4::new(MULTICAST_GROUP, DISCOVERY_PORT)),
            interface: Ipv4Addr::UNSPECIFIED,
            multicast_ttl: 4,
            recv_buffer: 65_535,
        }
    }
}

/// One-shot WS-Discovery prober.
///
/// `discover` takes `&mut self`, so a single engine can only run one probe
/// at a time.
pub struct DiscoveryEngine {
    config: DiscoveryConfig,
    socket: Option<UdpSocket>,
    joined: Option<(Ipv4Addr, Ipv4Addr)>,
    on_error: Option<ErrorHook>,
}

impl DiscoveryEngine {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config,
            socket: None,
            joined: None,
            on_error: None,
        }
    }

    /// Install a hook for non-fatal transport errors (e.g. a failed
    /// multicast join after the socket is already listening).
    pub fn on_error(mut self, hook: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Whether a socket is currently open.
    pub fn is_active(&self) -> bool {
        self.socket.is_some()
    }

    /// Probe the network and collect replies for `timeout`.
    ///
    /// Zero replies is not an error. Fails only when the socket cannot be
    /// bound or the probe cannot be sent.
    pub async fn discover(&mut self, timeout: Duration) -> Result<Vec<DiscoveredDevice>, Error> {
        // A previous run that was cancelled mid-flight may have left a socket.
        self.stop();

        let deadline = Instant::now() + timeout;
        let socket = UdpSocket::bind(self.config.bind_addr)
            .await
            .map_err(|source| Error::DiscoveryTransport {
                message: format!("cannot bind {}", self.config.bind_addr),
                source,
            })?;
        self.join_group(&socket);
        let socket = self.socket.insert(socket);

        let probe = Probe::new();
        debug!(message_id = %probe.message_id(), target = %self.config.target, "sending probe");
        if let Err(source) = socket.send_to(probe.to_xml().as_bytes(), self.config.target).await {
            self.stop();
            return Err(Error::DiscoveryTransport {
                message: format!("cannot send probe to {}", self.config.target),
                source,
            });
        }

        let found = collect(socket, deadline, self.config.recv_buffer).await;
        self.stop();

        info!(count = found.len(), "discovery finished");
        Ok(found)
    }

    /// Leave the multicast group and close the socket. Safe to call at any
    /// time, including before any run.
    pub fn stop(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };
        if let Some((group, interface)) = self.joined.take() {
            if let Err(e) = socket.leave_multicast_v4(group, interface) {
                debug!(error = %e, "leave multicast group failed");
            }
        }
        drop(socket);
    }

    fn join_group(&mut self, socket: &UdpSocket) {
        let SocketAddr::V4(target) = self.config.target else {
            return;
        };
        let group = *target.ip();
        if !group.is_multicast() {
            return;
        }

        if let Err(e) = socket.set_multicast_ttl_v4(self.config.multicast_ttl) {
            debug!(error = %e, "set multicast TTL failed");
        }
        match socket.join_multicast_v4(group, self.config.interface) {
            Ok(()) => self.joined = Some((group, self.config.interface)),
            Err(source) => self.report(&Error::DiscoveryTransport {
                message: format!("cannot join multicast group {group}"),
                source,
            }),
        }
    }

    fn report(&self, err: &Error) {
        warn!(error = %err, "discovery continuing without multicast membership");
        if let Some(hook) = &self.on_error {
            hook(err);
        }
    }
}

impl Default for DiscoveryEngine {
    fn default() -> Self {
        Self::new(DiscoveryConfig::default())
    }
}

impl Drop for DiscoveryEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for DiscoveryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryEngine")
            .field("config", &self.config)
            .field("active", &self.socket.is_some())
            .field("joined", &self.joined)
            .finish_non_exhaustive()
    }
}

/// Consecutive receive failures tolerated before a run ends early.
const MAX_RECV_ERRORS: u32 = 8;
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Pause after the `consecutive`-th failed receive, or `None` to give up.
fn recv_backoff(consecutive: u32) -> Option<Duration> {
    (consecutive < MAX_RECV_ERRORS).then(|| RECV_ERROR_BACKOFF * consecutive)
}

async fn collect(socket: &UdpSocket, deadline: Instant, buf_len: usize) -> Vec<DiscoveredDevice> {
    let mut buf = vec![0_u8; buf_len];
    let mut found: Vec<DiscoveredDevice> = Vec::new();
    let mut recv_errors = 0_u32;

    loop {
        let (len, from) = match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
            Err(_) => break,
            Ok(Ok(received)) => {
                recv_errors = 0;
                received
            }
            Ok(Err(e)) => {
                recv_errors += 1;
                let Some(delay) = recv_backoff(recv_errors) else {
                    warn!(error = %e, failures = recv_errors, "receive keeps failing; ending discovery early");
                    break;
                };
                debug!(error = %e, "recv failed");
                tokio::time::sleep_until(deadline.min(Instant::now() + delay)).await;
                continue;
            }
        };

        let datagram = String::from_utf8_lossy(buf.get(..len).unwrap_or_default());
        match reply::parse_reply(&datagram, from.ip()) {
            Ok(devices) => {
                for device in devices {
                    debug!(id = %device.id, ip = %device.ip, "probe match");
                    merge_into(&mut found, device);
                }
            }
            Err(e) => debug!(%from, error = %e, "discarding datagram"),
        }
    }

    found
}

/// Same id or same IP updates the earlier entry in place.
fn merge_into(found: &mut Vec<DiscoveredDevice>, device: DiscoveredDevice) {
    match found
        .iter_mut()
        .find(|d| d.id == device.id || d.ip == device.ip)
    {
        Some(existing) => existing.merge_from(device),
        None => found.push(device),
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use super::*;

    #[test]
    fn duplicate_ip_merges_in_place() {
        let ip = IpAddr::from([192, 168, 1, 50]);
        let mut found = Vec::new();

        let mut first = DiscoveredDevice::manual(ip, 80);
        first.id = "a".into();
        merge_into(&mut found, first);

        let mut second = DiscoveredDevice::manual(ip, 8000);
        second.id = "b".into();
        merge_into(&mut found, second);

        merge_into(&mut found, DiscoveredDevice::manual(IpAddr::from([192, 168, 1, 51]), 80));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "a");
        assert_eq!(found[0].port, 8000);
    }

    #[test]
    fn repeated_receive_failures_back_off_then_stop() {
        assert_eq!(recv_backoff(1), Some(Duration::from_millis(50)));
        assert_eq!(recv_backoff(3), Some(Duration::from_millis(150)));
        assert!(recv_backoff(MAX_RECV_ERRORS - 1).is_some());
        assert_eq!(recv_backoff(MAX_RECV_ERRORS), None);
    }

    #[test]
    fn join_failures_reach_the_error_hook() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let engine = DiscoveryEngine::default().on_error(move |err| {
            assert!(matches!(err, Error::DiscoveryTransport { .. }));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        engine.report(&Error::DiscoveryTransport {
            message: "cannot join multicast group".into(),
            source: std::io::Error::other("no such device"),
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_is_safe_before_any_run() {
        let mut engine = DiscoveryEngine::default();
        engine.stop();
        engine.stop();
        assert!(!engine.is_active());
    }
}
