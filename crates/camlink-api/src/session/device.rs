// Device service (tds) operations
//
// Identification, capability advertisement, clock, and reboot.

use chrono::NaiveDate;
use tracing::debug;
use url::Url;

use super::{OPTIONAL_SERVICES, SessionClient};
use crate::error::Error;
use crate::types::{DeviceInformation, ServiceKind, SystemDateTime};
use crate::xml;

impl SessionClient {
    /// Manufacturer, model, firmware, serial, and hardware id.
    ///
    /// `tds:GetDeviceInformation`
    pub async fn get_device_information(&self) -> Result<DeviceInformation, Error> {
        debug!("fetching device information");
        let body = self
            .invoke(ServiceKind::Device, "GetDeviceInformation", "")
            .await?;
        self.parse_reply("GetDeviceInformation", &body, |node| Ok(parse_device_information(node)))
    }

    /// Device clock. Doubles as the liveness probe.
    ///
    /// `tds:GetSystemDateAndTime`
    pub async fn get_system_date_and_time(&self) -> Result<SystemDateTime, Error> {
        let body = self
            .invoke(ServiceKind::Device, "GetSystemDateAndTime", "")
            .await?;
        self.parse_reply("GetSystemDateAndTime", &body, |node| Ok(parse_system_date_time(node)))
    }

    /// Ask the device to reboot. Returns the device's message, if any.
    ///
    /// `tds:SystemReboot`
    pub async fn system_reboot(&self) -> Result<Option<String>, Error> {
        debug!(address = %self.address(), "requesting reboot");
        let body = self.invoke(ServiceKind::Device, "SystemReboot", "").await?;
        self.parse_reply("SystemReboot", &body, |node| Ok(xml::find_text(node, "Message")))
    }

    /// Service addresses advertised by `tds:GetCapabilities`, in
    /// optional-service order.
    pub(crate) async fn get_capabilities(&self) -> Result<Vec<(ServiceKind, Url)>, Error> {
        let body = self
            .invoke(
                ServiceKind::Device,
                "GetCapabilities",
                "<tds:Category>All</tds:Category>",
            )
            .await?;
        self.parse_reply("GetCapabilities", &body, |node| Ok(parse_capabilities(node)))
    }
}

fn parse_device_information(node: roxmltree::Node<'_, '_>) -> DeviceInformation {
    DeviceInformation {
        manufacturer: xml::find_text(node, "Manufacturer"),
        model: xml::find_text(node, "Model"),
        firmware_version: xml::find_text(node, "FirmwareVersion"),
        serial_number: xml::find_text(node, "SerialNumber"),
        hardware_id: xml::find_text(node, "HardwareId"),
    }
}

fn parse_capabilities(node: roxmltree::Node<'_, '_>) -> Vec<(ServiceKind, Url)> {
    let Some(caps) = xml::find(node, "Capabilities") else {
        return Vec::new();
    };
    OPTIONAL_SERVICES
        .iter()
        .filter_map(|kind| {
            let section = xml::child(caps, kind.capability_element())?;
            let addr = xml::path_text(section, &["XAddr"])?;
            match Url::parse(&addr) {
                Ok(url) => Some((*kind, url)),
                Err(e) => {
                    debug!(service = %kind, %addr, error = %e, "ignoring malformed XAddr");
                    None
                }
            }
        })
        .collect()
}

fn parse_system_date_time(node: roxmltree::Node<'_, '_>) -> SystemDateTime {
    let utc = xml::find(node, "UTCDateTime").and_then(|dt| {
        let date = xml::child(dt, "Date")?;
        let time = xml::child(dt, "Time")?;
        let year: i32 = xml::parse_num(xml::path_text(date, &["Year"]))?;
        let month: u32 = xml::parse_num(xml::path_text(date, &["Month"]))?;
        let day: u32 = xml::parse_num(xml::path_text(date, &["Day"]))?;
        let hour: u32 = xml::parse_num(xml::path_text(time, &["Hour"]))?;
        let minute: u32 = xml::parse_num(xml::path_text(time, &["Minute"]))?;
        let second: u32 = xml::parse_num(xml::path_text(time, &["Second"]))?;
        NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(hour, minute, second)
            .map(|n| n.and_utc())
    });

    SystemDateTime {
        date_time_type: xml::find_text(node, "DateTimeType"),
        daylight_savings: xml::find_text(node, "DaylightSavings").is_some_and(|v| v == "true"),
        timezone: xml::find(node, "TimeZone").and_then(|tz| xml::path_text(tz, &["TZ"])),
        utc,
    }
}
