pub mod api;

use crate::agent::Agent;
use crate::cli::Args;
use log::{ error, info };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use self::api::{ router, AppState };

pub struct Server {
    addr: String,
    agent: Arc<Agent>,
    args: Args,
}

impl Server {
    pub fn new(addr: String, agent: Arc<Agent>, args: Args) -> Self {
        Self { addr, agent, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()?;
        let app = router(AppState::new(self.agent.clone()));

        if self.args.enable_tls {
            let (Some(cert_path), Some(key_path)) = (
                &self.args.tls_cert_path,
                &self.args.tls_key_path,
            ) else {
                error!("--enable-tls requires both --tls-cert-path and --tls-key-path");
                return Err("TLS enabled without cert/key".into());
            };

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;

            info!("Starting HTTPS API server on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
        } else {
            info!("Starting HTTP API server on: http://{}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app.into_make_service()).await?;
        }

        Ok(())
    }
}
