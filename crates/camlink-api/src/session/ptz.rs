// PTZ service (tptz) operations

use std::time::Duration;

use roxmltree::Node;
use tracing::debug;

use super::SessionClient;
use crate::error::Error;
use crate::types::{PtzStatus, PtzVector, ServiceKind};
use crate::xml::{self, escape};

impl SessionClient {
    /// Start moving at `velocity` until stopped or `timeout` elapses.
    ///
    /// `tptz:ContinuousMove`
    pub async fn continuous_move(
        &self,
        profile_token: &str,
        velocity: PtzVector,
        timeout: Option<Duration>,
    ) -> Result<(), Error> {
        debug!(profile_token, ?velocity, "continuous move");
        let mut inner = format!(
            r#"<tptz:ProfileToken>{}</tptz:ProfileToken><tptz:Velocity><tt:PanTilt x="{}" y="{}"/><tt:Zoom x="{}"/></tptz:Velocity>"#,
            escape(profile_token),
            velocity.pan,
            velocity.tilt,
            velocity.zoom,
        );
        if let Some(timeout) = timeout {
            inner.push_str(&format!("<tptz:Timeout>{}</tptz:Timeout>", xsd_duration(timeout)));
        }
        self.invoke(ServiceKind::Ptz, "ContinuousMove", &inner).await?;
        Ok(())
    }

    /// Stop pan/tilt and/or zoom motion.
    ///
    /// `tptz:Stop`
    pub async fn stop_ptz(&self, profile_token: &str, pan_tilt: bool, zoom: bool) -> Result<(), Error> {
        debug!(profile_token, pan_tilt, zoom, "stop");
        let inner = format!(
            "<tptz:ProfileToken>{}</tptz:ProfileToken><tptz:PanTilt>{pan_tilt}</tptz:PanTilt><tptz:Zoom>{zoom}</tptz:Zoom>",
            escape(profile_token),
        );
        self.invoke(ServiceKind::Ptz, "Stop", &inner).await?;
        Ok(())
    }

    /// `tptz:GetStatus`
    pub async fn get_ptz_status(&self, profile_token: &str) -> Result<PtzStatus, Error> {
        let inner = format!(
            "<tptz:ProfileToken>{}</tptz:ProfileToken>",
            escape(profile_token)
        );
        let body = self.invoke(ServiceKind::Ptz, "GetStatus", &inner).await?;
        self.parse_reply("GetStatus", &body, |node| Ok(parse_status(node)))
    }
}

/// `xs:duration` for a PTZ timeout, e.g. `PT5S` or `PT1.500S`.
fn xsd_duration(d: Duration) -> String {
    let millis = d.subsec_millis();
    if millis == 0 {
        format!("PT{}S", d.as_secs())
    } else {
        format!("PT{}.{millis:03}S", d.as_secs())
    }
}

fn parse_status(node: Node<'_, '_>) -> PtzStatus {
    let Some(status) = xml::find(node, "PTZStatus") else {
        return PtzStatus::default();
    };

    let axis = |parent: &str, child: &str, attr: &str| -> Option<f32> {
        xml::path(status, &[parent, child])?.attribute(attr)?.parse().ok()
    };
    let pan = axis("Position", "PanTilt", "x");
    let tilt = axis("Position", "PanTilt", "y");
    let zoom = axis("Position", "Zoom", "x");
    let position = (pan.is_some() || zoom.is_some()).then(|| PtzVector {
        pan: pan.unwrap_or_default(),
        tilt: tilt.unwrap_or_default(),
        zoom: zoom.unwrap_or_default(),
    });

    PtzStatus {
        position,
        pan_tilt_status: xml::path_text(status, &["MoveStatus", "PanTilt"]),
        zoom_status: xml::path_text(status, &["MoveStatus", "Zoom"]),
        error: xml::path_text(status, &["Error"]),
        utc_time: xml::path_text(status, &["UtcTime"]),
    }
}
