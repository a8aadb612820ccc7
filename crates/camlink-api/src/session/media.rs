// Media service (trt) operations
//
// Profiles and stream/snapshot URIs. URIs are passed through exactly as
// the device returned them.

use roxmltree::Node;
use tracing::debug;

use super::SessionClient;
use crate::error::Error;
use crate::types::{AudioEncoderConfig, MediaProfile, PtzConfig, ServiceKind, VideoEncoderConfig};
use crate::xml::{self, escape};

impl SessionClient {
    /// `trt:GetProfiles`
    pub async fn get_profiles(&self) -> Result<Vec<MediaProfile>, Error> {
        debug!("listing media profiles");
        let body = self.invoke(ServiceKind::Media, "GetProfiles", "").await?;
        self.parse_reply("GetProfiles", &body, |node| {
            Ok(node
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "Profiles")
                .filter_map(parse_profile)
                .collect())
        })
    }

    /// RTSP unicast stream URI for a profile.
    ///
    /// `trt:GetStreamUri`
    pub async fn get_stream_uri(&self, profile_token: &str) -> Result<String, Error> {
        let inner = format!(
            "<trt:StreamSetup><tt:Stream>RTP-Unicast</tt:Stream><tt:Transport><tt:Protocol>RTSP</tt:Protocol></tt:Transport></trt:StreamSetup><trt:ProfileToken>{}</trt:ProfileToken>",
            escape(profile_token)
        );
        let body = self.invoke(ServiceKind::Media, "GetStreamUri", &inner).await?;
        self.parse_reply("GetStreamUri", &body, media_uri)
    }

    /// JPEG snapshot URI for a profile.
    ///
    /// `trt:GetSnapshotUri`
    pub async fn get_snapshot_uri(&self, profile_token: &str) -> Result<String, Error> {
        let inner = format!(
            "<trt:ProfileToken>{}</trt:ProfileToken>",
            escape(profile_token)
        );
        let body = self
            .invoke(ServiceKind::Media, "GetSnapshotUri", &inner)
            .await?;
        self.parse_reply("GetSnapshotUri", &body, media_uri)
    }
}

/// The `MediaUri/Uri` text, untrimmed.
fn media_uri(node: Node<'_, '_>) -> Result<String, Error> {
    xml::find(node, "Uri")
        .and_then(|n| n.text())
        .map(str::to_owned)
        .ok_or(Error::MissingField { element: "Uri" })
}

fn parse_profile(node: Node<'_, '_>) -> Option<MediaProfile> {
    let token = node.attribute("token")?.to_owned();
    let name = xml::path_text(node, &["Name"]).unwrap_or_else(|| token.clone());

    Some(MediaProfile {
        name,
        video_source_token: xml::child(node, "VideoSourceConfiguration")
            .and_then(|v| xml::path_text(v, &["SourceToken"])),
        video_encoder: xml::child(node, "VideoEncoderConfiguration").map(parse_video_encoder),
        audio_encoder: xml::child(node, "AudioEncoderConfiguration").map(parse_audio_encoder),
        ptz: xml::child(node, "PTZConfiguration").map(|p| PtzConfig {
            token: p.attribute("token").unwrap_or_default().to_owned(),
            node_token: xml::path_text(p, &["NodeToken"]),
            default_timeout: xml::path_text(p, &["DefaultPTZTimeout"]),
        }),
        token,
    })
}

fn parse_video_encoder(node: Node<'_, '_>) -> VideoEncoderConfig {
    VideoEncoderConfig {
        token: node.attribute("token").unwrap_or_default().to_owned(),
        encoding: xml::path_text(node, &["Encoding"]).unwrap_or_default(),
        width: xml::parse_num(xml::path_text(node, &["Resolution", "Width"])),
        height: xml::parse_num(xml::path_text(node, &["Resolution", "Height"])),
        quality: xml::parse_num(xml::path_text(node, &["Quality"])),
        frame_rate_limit: xml::parse_num(xml::path_text(node, &["RateControl", "FrameRateLimit"])),
        bitrate_limit: xml::parse_num(xml::path_text(node, &["RateControl", "BitrateLimit"])),
    }
}

fn parse_audio_encoder(node: Node<'_, '_>) -> AudioEncoderConfig {
    AudioEncoderConfig {
        token: node.attribute("token").unwrap_or_default().to_owned(),
        encoding: xml::path_text(node, &["Encoding"]).unwrap_or_default(),
        bitrate: xml::parse_num(xml::path_text(node, &["Bitrate"])),
        sample_rate: xml::parse_num(xml::path_text(node, &["SampleRate"])),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::with_body;
    use pretty_assertions::assert_eq;

    const PROFILES: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:trt="http://www.onvif.org/ver10/media/wsdl" xmlns:tt="http://www.onvif.org/ver10/schema"><s:Body>
      <trt:GetProfilesResponse>
        <trt:Profiles token="Profile_1" fixed="true">
          <tt:Name>mainStream</tt:Name>
          <tt:VideoSourceConfiguration token="VideoSourceToken"><tt:Name>VideoSourceConfig</tt:Name><tt:SourceToken>VideoSource_1</tt:SourceToken></tt:VideoSourceConfiguration>
          <tt:VideoEncoderConfiguration token="VideoEncoderToken_1">
            <tt:Name>VideoEncoder_1</tt:Name><tt:Encoding>H264</tt:Encoding>
            <tt:Resolution><tt:Width>2560</tt:Width><tt:Height>1440</tt:Height></tt:Resolution>
            <tt:Quality>4.000000</tt:Quality>
            <tt:RateControl><tt:FrameRateLimit>25</tt:FrameRateLimit><tt:BitrateLimit>4096</tt:BitrateLimit></tt:RateControl>
          </tt:VideoEncoderConfiguration>
          <tt:AudioEncoderConfiguration token="AudioEncoderToken_1"><tt:Encoding>G711</tt:Encoding><tt:Bitrate>64</tt:Bitrate><tt:SampleRate>8</tt:SampleRate></tt:AudioEncoderConfiguration>
          <tt:PTZConfiguration token="PTZToken"><tt:NodeToken>PTZNODETOKEN</tt:NodeToken><tt:DefaultPTZTimeout>PT5S</tt:DefaultPTZTimeout></tt:PTZConfiguration>
        </trt:Profiles>
        <trt:Profiles token="Profile_2"><tt:Name>subStream</tt:Name></trt:Profiles>
        <trt:Profiles><tt:Name>no token</tt:Name></trt:Profiles>
      </trt:GetProfilesResponse></s:Body></s:Envelope>"#;

    #[test]
    fn parses_profiles() {
        let profiles: Vec<MediaProfile> = with_body(PROFILES, |node| {
            Ok(node
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "Profiles")
                .filter_map(parse_profile)
                .collect())
        })
        .unwrap();

        assert_eq!(profiles.len(), 2);
        let main = &profiles[0];
        assert_eq!(main.token, "Profile_1");
        assert_eq!(main.name, "mainStream");
        assert_eq!(main.video_source_token.as_deref(), Some("VideoSource_1"));

        let video = main.video_encoder.as_ref().unwrap();
        assert_eq!(video.encoding, "H264");
        assert_eq!((video.width, video.height), (Some(2560), Some(1440)));
        assert_eq!(video.frame_rate_limit, Some(25));

        assert_eq!(main.audio_encoder.as_ref().unwrap().encoding, "G711");
        assert_eq!(
            main.ptz.as_ref().unwrap().default_timeout.as_deref(),
            Some("PT5S")
        );

        assert!(profiles[1].video_encoder.is_none());
    }

    #[test]
    fn uri_is_not_trimmed_or_rewritten() {
        let body = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><GetStreamUriResponse><MediaUri><Uri>rtsp://10.0.0.5:554/Streaming/Channels/101?transportmode=unicast&amp;profile=Profile_1</Uri></MediaUri></GetStreamUriResponse></s:Body></s:Envelope>"#;
        let uri = with_body(body, media_uri).unwrap();
        assert_eq!(
            uri,
            "rtsp://10.0.0.5:554/Streaming/Channels/101?transportmode=unicast&profile=Profile_1"
        );
    }

    #[test]
    fn missing_uri_is_an_error() {
        let body = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><GetStreamUriResponse/></s:Body></s:Envelope>"#;
        assert!(matches!(
            with_body(body, media_uri),
            Err(Error::MissingField { element: "Uri" })
        ));
    }
}
