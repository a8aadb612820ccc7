// Imaging service (timg) operations
//
// Settings are addressed by video source token, not profile token.

use roxmltree::Node;

use super::SessionClient;
use crate::error::Error;
use crate::types::{ImagingSettings, ServiceKind};
use crate::xml::{self, escape};

impl SessionClient {
    /// `timg:GetImagingSettings`
    pub async fn get_imaging_settings(&self, video_source_token: &str) -> Result<ImagingSettings, Error> {
        let inner = format!(
            "<timg:VideoSourceToken>{}</timg:VideoSourceToken>",
            escape(video_source_token)
        );
        let body = self
            .invoke(ServiceKind::Imaging, "GetImagingSettings", &inner)
            .await?;
        self.parse_reply("GetImagingSettings", &body, |node| Ok(parse_settings(node)))
    }

    /// Apply the fields that are set; `None` fields are not sent.
    ///
    /// `timg:SetImagingSettings`
    pub async fn set_imaging_settings(
        &self,
        video_source_token: &str,
        settings: &ImagingSettings,
    ) -> Result<(), Error> {
        let inner = format!(
            "<timg:VideoSourceToken>{}</timg:VideoSourceToken><timg:ImagingSettings>{}</timg:ImagingSettings><timg:ForcePersistence>true</timg:ForcePersistence>",
            escape(video_source_token),
            settings_xml(settings),
        );
        self.invoke(ServiceKind::Imaging, "SetImagingSettings", &inner)
            .await?;
        Ok(())
    }
}

/// Settings body in schema element order.
fn settings_xml(s: &ImagingSettings) -> String {
    let mut out = String::new();
    if let Some(v) = s.brightness {
        out.push_str(&format!("<tt:Brightness>{v}</tt:Brightness>"));
    }
    if let Some(v) = s.color_saturation {
        out.push_str(&format!("<tt:ColorSaturation>{v}</tt:ColorSaturation>"));
    }
    if let Some(v) = s.contrast {
        out.push_str(&format!("<tt:Contrast>{v}</tt:Contrast>"));
    }
    if let Some(v) = &s.ir_cut_filter {
        out.push_str(&format!("<tt:IrCutFilter>{}</tt:IrCutFilter>", escape(v)));
    }
    if let Some(v) = s.sharpness {
        out.push_str(&format!("<tt:Sharpness>{v}</tt:Sharpness>"));
    }
    out
}

fn parse_settings(node: Node<'_, '_>) -> ImagingSettings {
    let Some(settings) = xml::find(node, "ImagingSettings") else {
        return ImagingSettings::default();
    };
    ImagingSettings {
        brightness: xml::parse_num(xml::path_text(settings, &["Brightness"])),
        color_saturation: xml::parse_num(xml::path_text(settings, &["ColorSaturation"])),
        contrast: xml::parse_num(xml::path_text(settings, &["Contrast"])),
        sharpness: xml::parse_num(xml::path_text(settings, &["Sharpness"])),
        ir_cut_filter: xml::path_text(settings, &["IrCutFilter"]),
    }
}
