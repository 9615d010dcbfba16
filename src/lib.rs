pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod scrape;
pub mod server;
pub mod store;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_support;

use agent::ResearchAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("Topic Store Type: {}", args.store_type);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Embedding LLM Type: {}", args.embedding_llm_type);
    info!("Vector Store Type: {}", args.vector_type);
    if args.vector_type.eq_ignore_ascii_case("qdrant") {
        info!("Vector Store Host: {}", args.vector_host);
        info!("Vector Collection: {}", args.vector_collection);
    }
    info!("Search URL: {}", args.search_url);
    info!("Max Results: {}", args.search_max_results);
    info!("Persist Q&A History: {}", args.qna_persist_history);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("-------------------------");

    let agent = Arc::new(ResearchAgent::new(&args).await?);
    let server = Server::new(args.server_addr.clone(), agent, args);
    server.run().await?;

    Ok(())
}
