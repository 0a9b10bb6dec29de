use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Base URL of the OpenAI-compatible chat-completions API.
    #[arg(
        long,
        env = "CHAT_BASE_URL",
        default_value = "https://dashscope.aliyuncs.com/compatible-mode/v1"
    )]
    pub chat_base_url: String,

    /// API key for the chat-completions API.
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., qwen-plus, gpt-4o).
    #[arg(long, env = "CHAT_MODEL", default_value = "qwen-plus")]
    pub chat_model: String,

    /// Timeout in seconds for each chat-completions call.
    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value = "60")]
    pub chat_timeout_secs: u64,

    // --- General App Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Path to the prompt configuration file.
    #[arg(long, env = "PROMPTS_PATH", default_value = "json/prompts.json")]
    pub prompts_path: String,

    /// Optional path to a JSON file of trained model artifacts to serve
    /// predictions from.
    #[arg(long, env = "MODEL_ARTIFACTS_PATH")]
    pub model_artifacts_path: Option<String>,

    /// Number of characters per streamed content frame.
    #[arg(long, env = "STREAM_CHUNK_SIZE", default_value = "20")]
    pub stream_chunk_size: usize,

    // --- TLS Args ---
    /// Optional path to the TLS certificate file (PEM format) for serving
    /// HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for serving
    /// HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
