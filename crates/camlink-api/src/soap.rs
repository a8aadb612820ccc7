// SOAP 1.2 transport for one ONVIF service endpoint
//
// Wraps `reqwest::Client` with envelope construction, the WS-Security
// header, and fault decoding. Operation modules (device, media, ptz,
// imaging) build request bodies and parse replies; this module only
// moves envelopes and turns failures into `Error` values.

use roxmltree::Node;
use tracing::{debug, trace};
use url::Url;

use crate::auth::UsernameToken;
use crate::error::Error;
use crate::types::ServiceKind;
use crate::xml;

pub const SOAP_ENV_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const SCHEMA_NS: &str = "http://www.onvif.org/ver10/schema";

/// Raw SOAP client bound to one service endpoint.
///
/// The UsernameToken is computed once when the client is built and sent
/// unchanged with every request.
#[derive(Debug, Clone)]
pub struct SoapClient {
    http: reqwest::Client,
    endpoint: Url,
    service: ServiceKind,
    token: Option<UsernameToken>,
}

impl SoapClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: Url,
        service: ServiceKind,
        token: Option<UsernameToken>,
    ) -> Self {
        Self {
            http,
            endpoint,
            service,
            token,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    /// Invoke `operation` with `inner` as the request element's content.
    ///
    /// Returns the raw response body on success. The caller parses it.
    pub async fn call(&self, operation: &str, inner: &str) -> Result<String, Error> {
        let ns = self.service.namespace();
        let prefix = self.service.prefix();
        let body = format!("<{prefix}:{operation} xmlns:{prefix}=\"{ns}\">{inner}</{prefix}:{operation}>");
        let envelope = self.envelope(&body);

        debug!(service = %self.service, %operation, endpoint = %self.endpoint, "SOAP request");
        trace!(%envelope);

        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("application/soap+xml; charset=utf-8; action=\"{ns}/{operation}\""),
            )
            .body(envelope)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: format!("HTTP 401 from {}", self.endpoint),
            });
        }

        let text = resp.text().await.map_err(Error::Transport)?;
        trace!(status = status.as_u16(), body = %text, "SOAP response");

        if let Some(fault) = parse_fault(&text) {
            return Err(fault);
        }

        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: self.endpoint.to_string(),
            });
        }

        Ok(text)
    }

    fn envelope(&self, body: &str) -> String {
        let header = self
            .token
            .as_ref()
            .map(UsernameToken::to_header)
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><s:Envelope xmlns:s="{SOAP_ENV_NS}" xmlns:tt="{SCHEMA_NS}"><s:Header>{header}</s:Header><s:Body>{body}</s:Body></s:Envelope>"#
        )
    }
}

/// Locate the SOAP Body's first element child in a parsed response.
pub(crate) fn body_element<'a, 'i>(doc: &'a roxmltree::Document<'i>) -> Result<Node<'a, 'i>, Error> {
    xml::find(doc.root_element(), "Body")
        .and_then(|b| b.children().find(Node::is_element))
        .ok_or(Error::MissingField { element: "Body" })
}

/// Decode a SOAP fault (1.2 or 1.1 layout) if the body carries one.
///
/// A `NotAuthorized` subcode becomes `Error::Authentication`.
fn parse_fault(body: &str) -> Option<Error> {
    let doc = roxmltree::Document::parse(body).ok()?;
    let fault = xml::find(doc.root_element(), "Fault")?;

    let code = xml::path_text(fault, &["Code", "Value"])
        .or_else(|| xml::find_text(fault, "faultcode"))
        .unwrap_or_else(|| "Unknown".into());
    let subcode = xml::path(fault, &["Code", "Subcode"]).and_then(|s| {
        // Innermost subcode is the most specific one.
        xml::find_all(s, "Value").last().and_then(xml::text)
    });
    let reason = xml::path_text(fault, &["Reason", "Text"])
        .or_else(|| xml::find_text(fault, "faultstring"))
        .unwrap_or_default();

    let not_authorized = subcode
        .as_deref()
        .is_some_and(|s| s.ends_with("NotAuthorized"));
    if not_authorized {
        return Some(Error::Authentication {
            message: if reason.is_empty() {
                "sender not authorized".into()
            } else {
                reason
            },
        });
    }

    Some(Error::SoapFault {
        code,
        subcode,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOT_AUTHORIZED: &str = r#"<?xml version="1.0"?>
<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope" xmlns:ter="http://www.onvif.org/ver10/error">
  <env:Body><env:Fault>
    <env:Code><env:Value>env:Sender</env:Value>
      <env:Subcode><env:Value>ter:NotAuthorized</env:Value></env:Subcode></env:Code>
    <env:Reason><env:Text xml:lang="en">The action requested requires authorization</env:Text></env:Reason>
  </env:Fault></env:Body></env:Envelope>"#;

    const ACTION_NOT_SUPPORTED: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  <s:Body><s:Fault>
    <s:Code><s:Value>s:Receiver</s:Value>
      <s:Subcode><s:Value>ter:ActionNotSupported</s:Value>
        <s:Subcode><s:Value>ter:NoImagingForSource</s:Value></s:Subcode></s:Subcode></s:Code>
    <s:Reason><s:Text>no imaging</s:Text></s:Reason>
  </s:Fault></s:Body></s:Envelope>"#;

    #[test]
    fn not_authorized_fault_maps_to_authentication() {
        let err = parse_fault(NOT_AUTHORIZED);
        assert!(matches!(err, Some(Error::Authentication { .. })));
    }

    #[test]
    fn fault_reports_innermost_subcode() {
        let err = parse_fault(ACTION_NOT_SUPPORTED);
        match err {
            Some(Error::SoapFault {
                code,
                subcode,
                reason,
            }) => {
                assert_eq!(code, "s:Receiver");
                assert_eq!(subcode.as_deref(), Some("ter:NoImagingForSource"));
                assert_eq!(reason, "no imaging");
            }
            other => panic!("expected SoapFault, got {other:?}"),
        }
    }

    #[test]
    fn ordinary_responses_are_not_faults() {
        let ok = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><x/></s:Body></s:Envelope>"#;
        assert!(parse_fault(ok).is_none());
        assert!(parse_fault("<html>not soap</html>").is_none());
    }
}
