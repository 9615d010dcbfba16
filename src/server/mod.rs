pub mod api;

use log::{ info, warn };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::agent::ResearchAgent;
use crate::cli::Args;

pub use api::router;

pub struct Server {
    addr: String,
    agent: Arc<ResearchAgent>,
    args: Args,
}

impl Server {
    pub fn new(addr: String, agent: Arc<ResearchAgent>, args: Args) -> Self {
        Self { addr, agent, args }
    }

    /// Serves until the listener fails.
    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()?;
        let app = router(Arc::clone(&self.agent));

        match (&self.args.tls_cert_path, &self.args.tls_key_path) {
            (Some(cert_path), Some(key_path)) if self.args.enable_tls => {
                // Fails only when a provider is already installed.
                let _ = rustls::crypto::ring::default_provider().install_default();
                let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                    cert_path,
                    key_path
                ).await?;
                info!("Starting HTTPS API server on: https://{}", addr);
                axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
            }
            _ => {
                if self.args.enable_tls {
                    warn!("TLS enabled but TLS_CERT_PATH or TLS_KEY_PATH is missing, serving plain HTTP");
                }
                let listener = tokio::net::TcpListener::bind(addr).await?;
                info!("Starting HTTP API server on: http://{}", addr);
                axum::serve(listener, app.into_make_service()).await?;
            }
        }

        Ok(())
    }
}
