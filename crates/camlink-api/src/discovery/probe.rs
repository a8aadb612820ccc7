// WS-Discovery Probe message

use uuid::Uuid;

pub const WSA_NS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
pub const WSD_NS: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery";
pub const NETWORK_WSDL_NS: &str = "http://www.onvif.org/ver10/network/wsdl";

const PROBE_ACTION: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe";
const DISCOVERY_TO: &str = "urn:schemas-xmlsoap-org:ws:2005:04:discovery";
const ANONYMOUS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// A single Probe for `dn:NetworkVideoTransmitter` devices.
#[derive(Debug, Clone)]
pub struct Probe {
    message_id: Uuid,
}

impl Probe {
    /// A probe with a fresh `urn:uuid:` MessageID.
    pub fn new() -> Self {
        Self {
            message_id: Uuid::new_v4(),
        }
    }

    pub fn message_id(&self) -> String {
        format!("urn:uuid:{}", self.message_id)
    }

    pub fn to_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><s:Envelope xmlns:s="{env}" xmlns:a="{WSA_NS}" xmlns:d="{WSD_NS}" xmlns:dn="{NETWORK_WSDL_NS}"><s:Header><a:Action s:mustUnderstand="1">{PROBE_ACTION}</a:Action><a:MessageID>{id}</a:MessageID><a:ReplyTo><a:Address>{ANONYMOUS}</a:Address></a:ReplyTo><a:To s:mustUnderstand="1">{DISCOVERY_TO}</a:To></s:Header><s:Body><d:Probe><d:Types>dn:NetworkVideoTransmitter</d:Types></d:Probe></s:Body></s:Envelope>"#,
            env = crate::soap::SOAP_ENV_NS,
            id = self.message_id(),
        )
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_names_video_transmitter() {
        let probe = Probe::new();
        let xml = probe.to_xml();
        assert!(xml.contains("<d:Types>dn:NetworkVideoTransmitter</d:Types>"));
        assert!(xml.contains(&probe.message_id()));
        assert!(roxmltree::Document::parse(&xml).is_ok());
    }

    #[test]
    fn each_probe_gets_a_new_message_id() {
        assert_ne!(Probe::new().message_id(), Probe::new().message_id());
    }
}
