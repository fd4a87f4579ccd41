//! Media URL rewriting for devices on the local network.
//!
//! Backends behind a hotspot often hand out object-storage URLs with an
//! address only the server can reach. Swapping the host for the one the page
//! was loaded from keeps the storage port and path intact.

use url::Url;

use crate::base_url::is_loopback_host;

/// Replace the host of an absolute media URL with `page_host`.
///
/// Empty, relative and unparsable inputs come back unchanged, as does
/// everything when the page is served from loopback.
pub fn format_image_url(raw: &str, page_host: &str) -> String {
    if raw.is_empty() || !raw.starts_with("http") || is_loopback_host(page_host) {
        return raw.to_string();
    }
    let mut parsed = match Url::parse(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(url = raw, error = %e, "image url could not be parsed");
            return raw.to_string();
        }
    };
    if let Err(e) = parsed.set_host(Some(page_host)) {
        tracing::warn!(url = raw, host = page_host, error = %e, "image host could not be replaced");
        return raw.to_string();
    }
    parsed.to_string()
}
