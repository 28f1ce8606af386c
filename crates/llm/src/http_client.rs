//! HTTP Client Factory
//!
//! Builds the `reqwest` client used by cloud adapters, applying the
//! resolved proxy configuration and the provider's request timeout.

use std::time::Duration;

use quillspace_core::proxy::ProxyConfig;

/// Build a `reqwest::Client` for a cloud provider.
///
/// - `Some(proxy)` -> route all calls through the proxy
/// - `None` -> explicitly disable proxying (`no_proxy`), ignoring env vars
///
/// The timeout applies to the whole request; the model manager wraps calls
/// in its own bounded timeout as well, so this is the transport-level cap.
pub fn build_http_client(timeout_secs: u64, proxy: Option<&ProxyConfig>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10));

    match proxy {
        Some(cfg) => {
            let url = cfg.url();
            let mut p = reqwest::Proxy::all(&url).expect("valid proxy URL");
            if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
                p = p.basic_auth(user, pass);
            }
            builder = builder.proxy(p);
        }
        None => {
            builder = builder.no_proxy();
        }
    }

    builder.build().expect("failed to build reqwest client")
}
