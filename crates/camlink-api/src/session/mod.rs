// ONVIF multi-service session
//
// One `SessionClient` per camera. `initialize()` binds the mandatory device
// service, reads identification and capabilities, binds whichever optional
// services the device advertises, and caches media profiles. Per-service
// operations live in sibling modules as inherent methods.

mod device;
mod imaging;
mod media;
mod ptz;

use std::fmt;
use std::net::IpAddr;

use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Credentials, UsernameToken};
use crate::error::Error;
use crate::soap::SoapClient;
use crate::transport::TransportConfig;
use crate::types::{Capabilities, DeviceInformation, MediaProfile, ServiceKind};

/// Canonical device-service path, tried after any advertised address.
pub const CANONICAL_DEVICE_PATH: &str = "/onvif/device_service";
/// Paths some firmwares use instead of the canonical one.
pub const ALTERNATE_DEVICE_PATHS: [&str; 3] = ["/onvif/device", "/onvif/services", "/device_service"];

const OPTIONAL_SERVICES: [ServiceKind; 4] = [
    ServiceKind::Media,
    ServiceKind::Ptz,
    ServiceKind::Imaging,
    ServiceKind::Events,
];

/// Where a session connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub ip: IpAddr,
    pub port: u16,
    /// Device-service address advertised during discovery, if any.
    pub service_url: Option<Url>,
}

impl SessionTarget {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self {
            ip,
            port,
            service_url: None,
        }
    }

    pub fn with_service_url(mut self, url: Url) -> Self {
        self.service_url = Some(url);
        self
    }

    /// `ip:port` as used in error context.
    pub fn address(&self) -> String {
        match self.ip {
            IpAddr::V4(v4) => format!("{v4}:{}", self.port),
            IpAddr::V6(v6) => format!("[{v6}]:{}", self.port),
        }
    }

    /// Device-service candidates in connection order, without duplicates:
    /// the canonical path, the alternates, then the advertised URL.
    pub fn device_candidates(&self) -> Result<Vec<Url>, Error> {
        let base = Url::parse(&format!("http://{}", self.address()))?;
        let mut out = Vec::with_capacity(ALTERNATE_DEVICE_PATHS.len() + 2);
        for path in std::iter::once(CANONICAL_DEVICE_PATH).chain(ALTERNATE_DEVICE_PATHS) {
            out.push(base.join(path)?);
        }
        // An advertised URL off the known paths is the last resort.
        if let Some(ref url) = self.service_url {
            if !out.contains(url) {
                out.push(url.clone());
            }
        }
        Ok(out)
    }
}

/// Authenticated ONVIF session against one camera.
///
/// Each bound service holds its own SOAP client and its own UsernameToken.
/// Operations against an unbound service fail with
/// `Error::ServiceUnavailable` before any network I/O.
pub struct SessionClient {
    http: reqwest::Client,
    target: SessionTarget,
    credentials: Credentials,
    device: Option<SoapClient>,
    media: Option<SoapClient>,
    ptz: Option<SoapClient>,
    imaging: Option<SoapClient>,
    events: Option<SoapClient>,
    capabilities: Capabilities,
    device_info: Option<DeviceInformation>,
    profiles: Vec<MediaProfile>,
}

impl SessionClient {
    pub fn new(
        target: SessionTarget,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, target, credentials))
    }

    /// Build a session around an existing HTTP client.
    pub fn with_client(http: reqwest::Client, target: SessionTarget, credentials: Credentials) -> Self {
        Self {
            http,
            target,
            credentials,
            device: None,
            media: None,
            ptz: None,
            imaging: None,
            events: None,
            capabilities: Capabilities::default(),
            device_info: None,
            profiles: Vec::new(),
        }
    }

    pub fn target(&self) -> &SessionTarget {
        &self.target
    }

    pub fn address(&self) -> String {
        self.target.address()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn device_info(&self) -> Option<&DeviceInformation> {
        self.device_info.as_ref()
    }

    pub fn profiles(&self) -> &[MediaProfile] {
        &self.profiles
    }

    /// Whether the device service is bound.
    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    /// Endpoint a bound service talks to.
    pub fn endpoint(&self, kind: ServiceKind) -> Option<&Url> {
        self.slot(kind).map(SoapClient::endpoint)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Establish the session. Only a device-service failure is fatal;
    /// every later step degrades gracefully.
    pub async fn initialize(&mut self) -> Result<(), Error> {
        self.disconnect();
        self.device_info = None;
        self.profiles.clear();

        let device = self.connect_device_service().await?;
        info!(address = %self.address(), endpoint = %device.endpoint(), "device service bound");
        self.device = Some(device);
        self.capabilities = Capabilities::device_only();

        self.device_info = match self.get_device_information().await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(address = %self.address(), error = %e, "device information unavailable");
                None
            }
        };

        let advertised = match self.get_capabilities().await {
            Ok(services) => services,
            Err(e) => {
                warn!(address = %self.address(), error = %e, "capability query failed; device service only");
                Vec::new()
            }
        };

        for kind in OPTIONAL_SERVICES {
            let Some((_, url)) = advertised.iter().find(|(k, _)| *k == kind) else {
                continue;
            };
            match self.bind_service(kind, url.clone()).await {
                Ok(client) => {
                    debug!(service = %kind, endpoint = %url, "service bound");
                    *self.slot_mut(kind) = Some(client);
                    self.capabilities.set(kind, true);
                }
                Err(e) => warn!(
                    address = %self.address(),
                    service = %kind,
                    error = %e,
                    "service unavailable; continuing with reduced capabilities"
                ),
            }
        }

        if self.capabilities.media {
            match self.get_profiles().await {
                Ok(profiles) => self.profiles = profiles,
                Err(e) => warn!(address = %self.address(), error = %e, "cannot list media profiles"),
            }
        }

        info!(
            address = %self.address(),
            capabilities = %self.capabilities,
            profiles = self.profiles.len(),
            "session initialized"
        );
        Ok(())
    }

    /// Drop every service client. Idempotent.
    pub fn disconnect(&mut self) {
        self.device = None;
        self.media = None;
        self.ptz = None;
        self.imaging = None;
        self.events = None;
        self.capabilities = Capabilities::default();
    }

    async fn connect_device_service(&self) -> Result<SoapClient, Error> {
        let mut last_reason = String::from("no candidate endpoints");
        for url in self.target.device_candidates()? {
            let client = self.sub_client(url.clone(), ServiceKind::Device);
            match client.call("GetSystemDateAndTime", "").await {
                // A non-auth fault still came from a SOAP endpoint.
                Ok(_) | Err(Error::SoapFault { .. }) => return Ok(client),
                Err(e) if e.is_auth_failure() => return Err(e),
                Err(e) => {
                    debug!(endpoint = %url, error = %e, "device service candidate rejected");
                    last_reason = format!("{url}: {e}");
                }
            }
        }
        Err(Error::ServiceConnection {
            service: ServiceKind::Device,
            address: self.address(),
            reason: last_reason,
        })
    }

    /// Confirm an optional service with `GetServiceCapabilities`. A SOAP
    /// fault still proves a SOAP endpoint is listening, so it counts as
    /// bound; authentication and transport failures do not.
    async fn bind_service(&self, kind: ServiceKind, url: Url) -> Result<SoapClient, Error> {
        let client = self.sub_client(url, kind);
        match client.call("GetServiceCapabilities", "").await {
            Ok(_) | Err(Error::SoapFault { .. }) => Ok(client),
            Err(e) => Err(Error::ServiceConnection {
                service: kind,
                address: self.address(),
                reason: e.to_string(),
            }),
        }
    }

    /// A SOAP client with a freshly generated UsernameToken. Empty
    /// usernames produce anonymous clients.
    fn sub_client(&self, url: Url, kind: ServiceKind) -> SoapClient {
        let token = (!self.credentials.username.is_empty())
            .then(|| UsernameToken::generate(&self.credentials));
        SoapClient::new(self.http.clone(), url, kind, token)
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    fn slot(&self, kind: ServiceKind) -> Option<&SoapClient> {
        match kind {
            ServiceKind::Device => self.device.as_ref(),
            ServiceKind::Media => self.media.as_ref(),
            ServiceKind::Ptz => self.ptz.as_ref(),
            ServiceKind::Imaging => self.imaging.as_ref(),
            ServiceKind::Events => self.events.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: ServiceKind) -> &mut Option<SoapClient> {
        match kind {
            ServiceKind::Device => &mut self.device,
            ServiceKind::Media => &mut self.media,
            ServiceKind::Ptz => &mut self.ptz,
            ServiceKind::Imaging => &mut self.imaging,
            ServiceKind::Events => &mut self.events,
        }
    }

    /// Run one remote operation on a bound service, wrapping failures with
    /// the operation name and device address. Never retries.
    pub(crate) async fn invoke(
        &self,
        kind: ServiceKind,
        operation: &'static str,
        inner: &str,
    ) -> Result<String, Error> {
        let client = self
            .slot(kind)
            .ok_or(Error::ServiceUnavailable { service: kind })?;
        client
            .call(operation, inner)
            .await
            .map_err(|e| Error::operation(operation, &self.address(), e))
    }

    /// Parse the reply to `operation`, with the same error context as
    /// `invoke`.
    pub(crate) fn parse_reply<T>(
        &self,
        operation: &'static str,
        body: &str,
        f: impl FnOnce(roxmltree::Node<'_, '_>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        with_body(body, f).map_err(|e| Error::operation(operation, &self.address(), e))
    }
}

impl fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClient")
            .field("target", &self.target)
            .field("username", &self.credentials.username)
            .field("capabilities", &self.capabilities)
            .field("profiles", &self.profiles.len())
            .finish_non_exhaustive()
    }
}

/// Parse a reply body and run `f` over its first Body element.
pub(crate) fn with_body<T>(
    body: &str,
    f: impl FnOnce(roxmltree::Node<'_, '_>) -> Result<T, Error>,
) -> Result<T, Error> {
    let doc = crate::xml::parse(body)?;
    let node = crate::soap::body_element(&doc)?;
    f(node)
}
