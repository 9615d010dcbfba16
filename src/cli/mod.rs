use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Document Store Args ---
    /// Topic document store type (memory, redis, firestore)
    #[arg(long, env = "STORE_TYPE", default_value = "memory")]
    pub store_type: String,

    /// Redis endpoint for the topic store (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "STORE_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub store_redis_url: String,

    /// Prefix for Redis topic keys.
    #[arg(long, env = "STORE_REDIS_PREFIX", default_value = "topics:")]
    pub store_redis_prefix: String,

    /// Google Cloud project hosting the Firestore database.
    #[arg(long, env = "FIRESTORE_PROJECT_ID")]
    pub firestore_project_id: Option<String>,

    /// Path to the service account key JSON used to authenticate against Firestore.
    #[arg(long, env = "FIRESTORE_SA_KEY_PATH")]
    pub firestore_sa_key_path: Option<String>,

    /// Firestore collection holding topic documents.
    #[arg(long, env = "FIRESTORE_COLLECTION", default_value = "topics")]
    pub firestore_collection: String,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (ollama, openai, groq)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "groq")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider (e.g., OpenAI, Groq)
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., llama-3.3-70b-versatile, gpt-4o)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Sampling temperature for every chat completion.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.7")]
    pub chat_temperature: f32,

    // --- Embedding LLM Provider Args ---
    /// Type of LLM provider for text embedding (ollama, openai)
    #[arg(long, env = "EMBEDDING_LLM_TYPE", default_value = "ollama")]
    pub embedding_llm_type: String,

    /// Base URL for the Embedding LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "EMBEDDING_BASE_URL")]
    pub embedding_base_url: Option<String>,

    /// API Key for the Embedding LLM provider (e.g., OpenAI)
    #[arg(long, env = "EMBEDDING_API_KEY", default_value = "")]
    pub embedding_api_key: String,

    /// Model name for text embedding (e.g., text-embedding-3-small, nomic-embed-text)
    #[arg(long, env = "EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    // --- Vector Store Args ---
    /// Vector index type for scraped paper content (memory, qdrant)
    #[arg(short = 't', long, env = "VECTOR_TYPE", default_value = "memory")]
    pub vector_type: String,

    /// Vector database URL (e.g., http://localhost:6334 for Qdrant)
    #[arg(long, env = "VECTOR_HOST", default_value = "http://localhost:6334")]
    pub vector_host: String,

    /// API key for the vector database
    #[arg(short = 'k', env = "VECTOR_SECRET", long)]
    pub vector_secret: Option<String>,

    /// Collection holding indexed paper excerpts
    #[arg(long, env = "VECTOR_COLLECTION", default_value = "academic_papers")]
    pub vector_collection: String,

    /// Vector dimension size
    #[arg(long, env = "VECTOR_DIMENSION", default_value = "768")]
    pub dimension: usize,

    // --- Search / Scrape Args ---
    /// Scholar search endpoint queried with ?q=<topic>
    #[arg(long, env = "SEARCH_URL", default_value = "https://scholar.google.com/scholar")]
    pub search_url: String,

    /// Maximum number of search results kept per topic.
    #[arg(long, env = "SEARCH_MAX_RESULTS", default_value = "5")]
    pub search_max_results: usize,

    /// Timeout in seconds for every outbound page fetch.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10")]
    pub http_timeout_secs: u64,

    /// Lower bound of the random pause before each paper fetch, in milliseconds.
    #[arg(long, env = "SCRAPE_DELAY_MIN_MS", default_value = "1000")]
    pub scrape_delay_min_ms: u64,

    /// Upper bound of the random pause before each paper fetch, in milliseconds.
    #[arg(long, env = "SCRAPE_DELAY_MAX_MS", default_value = "3000")]
    pub scrape_delay_max_ms: u64,

    /// Number of neighbouring chunks retrieved for summaries and answers.
    #[arg(long, env = "RETRIEVAL_K", default_value = "3")]
    pub retrieval_k: usize,

    // --- General App Args ---
    /// Persist the Q&A exchange back onto the topic record.
    #[arg(long, env = "QNA_PERSIST_HISTORY", default_value = "false")]
    pub qna_persist_history: bool,

    /// Optional path to a prompt template override file (JSON).
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:8000")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
