// Vendor classification from advertised manufacturer strings

use crate::types::VendorType;

const KNOWN_VENDORS: &[(&str, VendorType)] = &[
    ("hikvision", VendorType::Hikvision),
    ("dahua", VendorType::Dahua),
    ("axis", VendorType::Axis),
    ("hanwha", VendorType::Hanwha),
    ("samsung", VendorType::Hanwha),
    ("wisenet", VendorType::Hanwha),
    ("uniview", VendorType::Uniview),
    ("reolink", VendorType::Reolink),
    ("amcrest", VendorType::Amcrest),
    ("bosch", VendorType::Bosch),
    ("sony", VendorType::Sony),
    ("panasonic", VendorType::Panasonic),
    ("i-pro", VendorType::Panasonic),
    ("tapo", VendorType::Tapo),
    ("tp-link", VendorType::Tapo),
];

impl VendorType {
    /// Case-insensitive substring match against the known-vendor table.
    pub fn classify(manufacturer: &str) -> Self {
        let lower = manufacturer.to_lowercase();
        KNOWN_VENDORS
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map_or(Self::Generic, |(_, vendor)| *vendor)
    }
}

/// Classify by manufacturer, falling back to the advertised name when the
/// manufacturer is missing or unrecognized.
pub(crate) fn classify_device(manufacturer: Option<&str>, name: &str) -> VendorType {
    match manufacturer.map(VendorType::classify) {
        Some(vendor) if vendor != VendorType::Generic => vendor,
        _ => VendorType::classify(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_case_insensitive() {
        assert_eq!(VendorType::classify("HikVision"), VendorType::Hikvision);
        assert_eq!(VendorType::classify("AXIS"), VendorType::Axis);
        assert_eq!(VendorType::classify("Hanwha Vision Co."), VendorType::Hanwha);
    }

    #[test]
    fn unknown_vendor_is_generic() {
        assert_eq!(VendorType::classify("Acme Optics"), VendorType::Generic);
        assert_eq!(VendorType::classify(""), VendorType::Generic);
    }

    #[test]
    fn name_is_consulted_when_manufacturer_is_unhelpful() {
        assert_eq!(classify_device(None, "Reolink RLC-810A"), VendorType::Reolink);
        assert_eq!(classify_device(Some("ONVIF"), "Dahua IPC"), VendorType::Dahua);
        assert_eq!(classify_device(Some("Bosch"), "Dahua IPC"), VendorType::Bosch);
    }
}
