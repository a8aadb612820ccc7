// ProbeMatches decoding
//
// Turns one inbound datagram into zero or more `DiscoveredDevice` values.
// Errors here never leave the discovery engine: a datagram that is not a
// ProbeMatches reply is noise on a shared multicast group.

use std::net::IpAddr;

use chrono::Utc;
use url::{Host, Url};

use super::scopes::ScopeInfo;
use super::vendor::classify_device;
use crate::types::{Capabilities, DiscoveredDevice, fallback_id};
use crate::xml;

const DEFAULT_PORT: u16 = 80;
const ENDPOINT_PREFIXES: &[&str] = &["urn:uuid:", "uuid:", "urn:"];

#[derive(Debug, thiserror::Error)]
pub(crate) enum ParseError {
    #[error("datagram is not XML: {0}")]
    NotXml(String),
    #[error("no ProbeMatch element")]
    NotProbeMatch,
}

/// Decode every ProbeMatch in a reply. `source` is the datagram's sender,
/// used when the advertised address carries no usable host.
pub(crate) fn parse_reply(datagram: &str, source: IpAddr) -> Result<Vec<DiscoveredDevice>, ParseError> {
    let doc = roxmltree::Document::parse(datagram).map_err(|e| ParseError::NotXml(e.to_string()))?;

    let devices: Vec<DiscoveredDevice> = xml::find_all(doc.root_element(), "ProbeMatch")
        .map(|m| from_match(m, source))
        .collect();

    if devices.is_empty() {
        return Err(ParseError::NotProbeMatch);
    }
    Ok(devices)
}

fn from_match(node: roxmltree::Node<'_, '_>, source: IpAddr) -> DiscoveredDevice {
    let service_urls: Vec<String> = xml::find_text(node, "XAddrs")
        .map(|x| x.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default();
    let primary = service_urls.first().and_then(|u| Url::parse(u).ok());

    let ip = primary
        .as_ref()
        .and_then(|u| match u.host() {
            Some(Host::Ipv4(v4)) => Some(IpAddr::V4(v4)),
            Some(Host::Ipv6(v6)) => Some(IpAddr::V6(v6)),
            _ => None,
        })
        .unwrap_or(source);
    let port = primary
        .as_ref()
        .and_then(Url::port_or_known_default)
        .unwrap_or(DEFAULT_PORT);

    let id = xml::path_text(node, &["EndpointReference", "Address"])
        .map(|addr| strip_endpoint_prefix(&addr).to_owned())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| fallback_id(ip));

    let scopes = xml::find_text(node, "Scopes").unwrap_or_default();
    let info = ScopeInfo::parse(&scopes);

    let name = info.name.clone().unwrap_or_else(|| {
        match (info.hardware.as_deref(), info.model.as_deref()) {
            (Some(m), Some(model)) => format!("{m} {model}"),
            (Some(m), None) => m.to_owned(),
            (None, Some(model)) => model.to_owned(),
            (None, None) => ip.to_string(),
        }
    });
    let vendor = classify_device(info.hardware.as_deref(), &name);

    DiscoveredDevice {
        id,
        name,
        ip,
        port,
        manufacturer: info.hardware,
        model: info.model,
        location: info.location,
        vendor,
        service_url: service_urls.first().cloned(),
        service_urls,
        scopes,
        discovered_at: Utc::now(),
        capabilities: Capabilities::device_only(),
    }
}

fn strip_endpoint_prefix(address: &str) -> &str {
    ENDPOINT_PREFIXES
        .iter()
        .find_map(|p| address.strip_prefix(p))
        .unwrap_or(address)
        .trim()
}
