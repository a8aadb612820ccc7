// Scope string tokenizer
//
// Devices advertise metadata as URI-style tokens, e.g.
// `onvif://www.onvif.org/hardware/DS-2CD2143G0-I onvif://www.onvif.org/name/Lobby%20Cam`.
// Keys match case-insensitively at a path-segment boundary; values are
// percent-decoded. The first non-empty value for a key wins.

use std::borrow::Cow;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeInfo {
    pub hardware: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub name: Option<String>,
}

impl ScopeInfo {
    pub fn parse(scopes: &str) -> Self {
        let mut info = Self::default();
        for token in scopes.split_whitespace() {
            // ASCII lowering keeps byte offsets aligned with `token`.
            let lower = token.to_ascii_lowercase();
            fill(&mut info.hardware, token, &lower, "hardware/");
            fill(&mut info.model, token, &lower, "model/");
            fill(&mut info.location, token, &lower, "location/");
            fill(&mut info.name, token, &lower, "name/");
        }
        info
    }
}

fn fill(slot: &mut Option<String>, token: &str, lower: &str, key: &str) {
    if slot.is_none() {
        *slot = value_for(token, lower, key);
    }
}

fn value_for(token: &str, lower: &str, key: &str) -> Option<String> {
    let mut from = 0;
    while let Some(rel) = lower.get(from..).and_then(|rest| rest.find(key)) {
        let at = from + rel;
        let on_boundary = at == 0 || lower.as_bytes().get(at - 1) == Some(&b'/');
        if on_boundary {
            let raw = token.get(at + key.len()..).unwrap_or_default();
            let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
            let value = decoded.trim();
            return (!value.is_empty()).then(|| value.to_owned());
        }
        from = at + 1;
    }
    None
}
