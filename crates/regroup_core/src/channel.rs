use indexmap::IndexMap;
use url::Url;

/// Schemes accepted for a channel URL. `rtp` and `p2p` are the multicast and
/// relay pseudo-schemes found in provincial lists.
pub const ALLOWED_SCHEMES: &[&str] = &["http", "https", "rtsp", "rtmp", "rtp", "p2p"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel {
    pub name: String,
    pub url: String,
}

impl Channel {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Group name -> channels, in first-declared order.
pub type GroupMap = IndexMap<String, Vec<Channel>>;

/// True when `url` parses and carries one of [`ALLOWED_SCHEMES`].
pub fn has_allowed_scheme(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => ALLOWED_SCHEMES
            .iter()
            .any(|scheme| parsed.scheme().eq_ignore_ascii_case(scheme)),
        Err(_) => false,
    }
}

pub fn channel_count(groups: &GroupMap) -> usize {
    groups.values().map(Vec::len).sum()
}
