use std::sync::OnceLock;
use std::time::Duration;

use tracing::debug;

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate may have installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the shared HTTP client used for outbound API calls.
pub fn build_client(request_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("vidwatch/", env!("CARGO_PKG_VERSION")));
    if request_timeout > Duration::ZERO {
        builder = builder.timeout(request_timeout);
    }
    builder.build()
}
