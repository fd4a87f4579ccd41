//! Base address selection from the page hostname.

use std::fmt;

use crate::config::PipelineConfig;

/// Hostnames that mean "served by the local development server".
pub fn is_loopback_host(hostname: &str) -> bool {
    hostname == "localhost" || hostname == "127.0.0.1"
}

/// Network target prefix for every outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    /// Same-origin prefix forwarded by the development proxy.
    Proxy(String),
    /// Backend reached directly on the page's host.
    Direct(String),
}

impl BaseUrl {
    /// Pick the proxy prefix on loopback, otherwise the page host with the
    /// configured scheme and port.
    pub fn resolve(hostname: &str, config: &PipelineConfig) -> Self {
        if is_loopback_host(hostname) {
            tracing::info!(base_url = %config.proxy_prefix, "using development proxy");
            BaseUrl::Proxy(config.proxy_prefix.clone())
        } else {
            let direct = format!("{}://{}:{}", config.lan_scheme, hostname, config.lan_port);
            tracing::info!(base_url = %direct, "using direct LAN address");
            BaseUrl::Direct(direct)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BaseUrl::Proxy(s) | BaseUrl::Direct(s) => s,
        }
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_hosts_use_the_proxy() {
        let config = PipelineConfig::default();
        for host in ["localhost", "127.0.0.1"] {
            assert_eq!(
                BaseUrl::resolve(host, &config),
                BaseUrl::Proxy("/api".to_string())
            );
        }
    }

    #[test]
    fn lan_host_is_addressed_directly() {
        let base = BaseUrl::resolve("192.168.1.5", &PipelineConfig::default());
        assert_eq!(base, BaseUrl::Direct("http://192.168.1.5:8080".to_string()));
        assert_eq!(base.to_string(), "http://192.168.1.5:8080");
    }

    #[test]
    fn named_hosts_are_not_loopback() {
        assert!(!is_loopback_host("localhost.localdomain"));
        assert!(!is_loopback_host("127.0.0.2"));
        let base = BaseUrl::resolve("checkin.campus.lan", &PipelineConfig::default());
        assert_eq!(base.as_str(), "http://checkin.campus.lan:8080");
    }
}
