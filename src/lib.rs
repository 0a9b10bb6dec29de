pub mod agent;
pub mod cli;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod llm;
pub mod models;
pub mod predictor;
pub mod server;
pub mod session;
pub mod tools;

use agent::Agent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Base URL: {}", args.chat_base_url);
    info!("Chat Model: {}", args.chat_model);
    info!("Chat Timeout: {}s", args.chat_timeout_secs);
    info!("Prompts Path: {}", args.prompts_path);
    info!(
        "Model Artifacts: {}",
        args.model_artifacts_path.as_deref().unwrap_or("(none)")
    );
    info!("Stream Chunk Size: {}", args.stream_chunk_size);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(Agent::new(&args)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
