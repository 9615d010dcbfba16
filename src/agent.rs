use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig, PromptError };
use crate::error::ApiError;
use crate::llm::chat::{ new_client as new_chat_client, ChatClient };
use crate::llm::embedding::{ new_client as new_embedding_client, EmbeddingClient };
use crate::llm::{ non_empty, LlmConfig, LlmType };
use crate::models::{ new_record_id, Paper, Topic, TopicSummary };
use crate::pipeline::enrich::EnrichNode;
use crate::pipeline::normalize::NormalizeNode;
use crate::pipeline::qna::{ QnaNode, QnaState };
use crate::pipeline::search::{ ScrapeNode, SearchState };
use crate::pipeline::summarize::{ SummarizeNode, SummarizeState, WorkingPaper };
use crate::pipeline::Pipeline;
use crate::scrape::{ HttpFetcher, WebFetcher };
use crate::store::{ create_topic_store, TopicStore };
use crate::vector::{ create_paper_index, VectorIndex };

/// Tunables the pipelines read on every request.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub search_url: String,
    pub max_results: usize,
    pub retrieval_k: usize,
    pub scrape_delay_ms: (u64, u64),
    pub temperature: f32,
    pub persist_qna_history: bool,
    pub prompts_path: Option<String>,
}

impl AgentSettings {
    pub fn from_args(args: &Args) -> Self {
        Self {
            search_url: args.search_url.clone(),
            max_results: args.search_max_results,
            retrieval_k: args.retrieval_k,
            scrape_delay_ms: (args.scrape_delay_min_ms, args.scrape_delay_max_ms),
            temperature: args.chat_temperature,
            persist_qna_history: args.qna_persist_history,
            prompts_path: args.prompts_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptReload {
    NotConfigured,
    Unchanged,
    Reloaded,
}

/// Everything a request handler needs, shared behind an `Arc`.
pub struct ResearchAgent {
    chat_client: Arc<dyn ChatClient>,
    embedding_client: Arc<dyn EmbeddingClient>,
    paper_index: Arc<dyn VectorIndex>,
    store: Arc<dyn TopicStore>,
    fetcher: Arc<dyn WebFetcher>,
    prompts: RwLock<Arc<PromptConfig>>,
    settings: AgentSettings,
}

impl ResearchAgent {
    fn initialize_llm_clients(
        args: &Args
    ) -> Result<(Arc<dyn ChatClient>, Arc<dyn EmbeddingClient>), Box<dyn Error + Send + Sync>> {
        let chat_config = LlmConfig {
            llm_type: args.chat_llm_type.parse::<LlmType>()?,
            base_url: args.chat_base_url.clone(),
            api_key: non_empty(&args.chat_api_key),
            completion_model: args.chat_model.clone(),
            embedding_model: None,
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}, BaseURL={:?}",
            args.chat_llm_type,
            chat_client.get_model(),
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );

        let embedding_config = LlmConfig {
            llm_type: args.embedding_llm_type.parse::<LlmType>()?,
            base_url: args.embedding_base_url.clone(),
            api_key: non_empty(&args.embedding_api_key),
            completion_model: None,
            embedding_model: args.embedding_model.clone(),
        };
        let embedding_client = new_embedding_client(&embedding_config)?;
        info!(
            "Embedding client configured: Type={}, Model={:?}, BaseURL={:?}",
            args.embedding_llm_type,
            embedding_config.embedding_model.as_deref().unwrap_or("adapter default"),
            embedding_config.base_url.as_deref().unwrap_or("adapter default")
        );

        Ok((chat_client, embedding_client))
    }

    pub async fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let (chat_client, embedding_client) = Self::initialize_llm_clients(args)?;
        let paper_index = create_paper_index(args, Arc::clone(&embedding_client))?;
        let store = create_topic_store(args)?;
        let fetcher: Arc<dyn WebFetcher> = Arc::new(
            HttpFetcher::new(Duration::from_secs(args.http_timeout_secs))?
        );
        let prompts = prompt::initial_prompts(args.prompts_path.as_deref())?;

        Ok(
            Self::from_parts(
                chat_client,
                embedding_client,
                paper_index,
                store,
                fetcher,
                prompts,
                AgentSettings::from_args(args)
            )
        )
    }

    pub fn from_parts(
        chat_client: Arc<dyn ChatClient>,
        embedding_client: Arc<dyn EmbeddingClient>,
        paper_index: Arc<dyn VectorIndex>,
        store: Arc<dyn TopicStore>,
        fetcher: Arc<dyn WebFetcher>,
        prompts: Arc<PromptConfig>,
        settings: AgentSettings
    ) -> Self {
        Self {
            chat_client,
            embedding_client,
            paper_index,
            store,
            fetcher,
            prompts: RwLock::new(prompts),
            settings,
        }
    }

    async fn current_prompts(&self) -> Arc<PromptConfig> {
        Arc::clone(&*self.prompts.read().await)
    }

    async fn load_topic(&self, topic_id: &str) -> Result<Topic, ApiError> {
        self.store
            .get_topic(topic_id).await
            .map_err(ApiError::store)?
            .ok_or(ApiError::TopicNotFound)
    }

    /// Searches, summarizes and stores a new topic, returning it as persisted.
    pub async fn create_topic(&self, title: &str) -> Result<Topic, ApiError> {
        let prompts = self.current_prompts().await;
        let settings = &self.settings;
        info!("Creating topic '{}'", title);

        let search = Pipeline::new("search")
            .then(
                ScrapeNode::new(Arc::clone(&self.fetcher), settings.search_url.clone(), settings.max_results)
            )
            .then(
                NormalizeNode::new(
                    Arc::clone(&self.chat_client),
                    Arc::clone(&prompts),
                    settings.max_results,
                    settings.temperature
                )
            );
        let searched = search.invoke(SearchState::new(title)).await?;

        let summarize = Pipeline::new("summarize")
            .then(
                EnrichNode::new(
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.paper_index),
                    settings.scrape_delay_ms
                )
            )
            .then(
                SummarizeNode::new(
                    Arc::clone(&self.chat_client),
                    Arc::clone(&self.paper_index),
                    prompts,
                    settings.retrieval_k,
                    settings.temperature
                )
            );
        let summarized = summarize.invoke(SummarizeState::new(title, searched.candidates)).await?;

        let topic = assemble_topic(title, summarized.papers);
        self.store.put_topic(&topic).await.map_err(ApiError::store)?;
        info!("Stored topic {} with {} paper(s)", topic.id, topic.papers.len());

        self.store
            .get_topic(&topic.id).await
            .map_err(ApiError::store)?
            .ok_or_else(|| ApiError::Store(format!("topic {} missing right after it was written", topic.id)))
    }

    pub async fn list_topics(&self) -> Result<Vec<TopicSummary>, ApiError> {
        self.store.list_topics().await.map_err(ApiError::store)
    }

    pub async fn get_topic(&self, topic_id: &str) -> Result<Topic, ApiError> {
        self.load_topic(topic_id).await
    }

    /// Drops one paper from a topic. An unknown paper id leaves the topic as it was.
    pub async fn delete_paper(&self, topic_id: &str, paper_id: &str) -> Result<Topic, ApiError> {
        let mut topic = self.load_topic(topic_id).await?;
        match topic.remove_paper(paper_id) {
            Some(removed) => {
                self.store.put_topic(&topic).await.map_err(ApiError::store)?;
                info!("Removed paper '{}' from topic {}", removed.title, topic.id);
            }
            None => warn!("Paper {} not found in topic {}", paper_id, topic.id),
        }
        Ok(topic)
    }

    pub async fn answer_question(&self, topic_id: &str, query: &str) -> Result<String, ApiError> {
        let mut topic = self.load_topic(topic_id).await?;
        let prompts = self.current_prompts().await;

        let qna = Pipeline::new("qna").then(
            QnaNode::new(
                Arc::clone(&self.chat_client),
                Arc::clone(&self.embedding_client),
                prompts,
                self.settings.retrieval_k,
                self.settings.temperature
            )
        );
        let state = QnaState::new(
            topic.title.clone(),
            topic.papers.clone(),
            topic.qna_history.clone(),
            query
        );
        let state = qna.invoke(state).await?;

        if self.settings.persist_qna_history && state.history != topic.qna_history {
            topic.qna_history = state.history;
            self.store.put_topic(&topic).await.map_err(ApiError::store)?;
        }

        Ok(state.answer.unwrap_or_default())
    }

    pub async fn reload_prompts(&self) -> Result<PromptReload, PromptError> {
        let Some(path) = self.settings.prompts_path.as_deref() else {
            return Ok(PromptReload::NotConfigured);
        };

        let mut guard = self.prompts.write().await;
        match prompt::reload_prompts_if_changed(path, &guard)? {
            Some(new_config) => {
                *guard = new_config;
                info!("Prompts successfully reloaded from {}", path);
                Ok(PromptReload::Reloaded)
            }
            None => Ok(PromptReload::Unchanged),
        }
    }
}

/// Builds the topic record from summarized papers, giving every record a fresh id.
pub fn assemble_topic(title: &str, papers: Vec<WorkingPaper>) -> Topic {
    let mut topic = Topic::new(title);
    topic.papers = papers
        .into_iter()
        .map(|paper| {
            let summary = match (paper.summary, paper.error) {
                (Some(summary), _) => summary,
                (None, Some(error)) => format!("Summary unavailable: {}", error),
                (None, None) => "Summary unavailable: no summary was produced".to_string(),
            };
            Paper {
                id: new_record_id(),
                authors: merge_authors(&paper.inferred_authors, &paper.candidate.authors),
                title: paper.candidate.title,
                summary,
                link: paper.candidate.link,
                year: paper.candidate.year,
                topic_id: topic.id.clone(),
            }
        })
        .collect();
    topic
}

/// Union of both author lists in first-seen order, model-inferred names first.
pub fn merge_authors(inferred: &[String], scraped: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for name in inferred.iter().chain(scraped) {
        let name = name.trim();
        if !name.is_empty() && !merged.iter().any(|m| m == name) {
            merged.push(name.to_string());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::CandidatePaper;
    use crate::pipeline::PipelineError;
    use crate::scrape::scholar::SAMPLE_PAGE;
    use crate::store::MemoryTopicStore;
    use crate::test_support::{ CannedFetcher, HashingEmbedder, ScriptedChat };
    use crate::vector::MemoryIndex;

    const SEARCH_URL: &str = "https://scholar.test/scholar";

    fn settings() -> AgentSettings {
        AgentSettings {
            search_url: SEARCH_URL.to_string(),
            max_results: 5,
            retrieval_k: 3,
            scrape_delay_ms: (0, 0),
            temperature: 0.7,
            persist_qna_history: false,
            prompts_path: None,
        }
    }

    fn agent(chat: Arc<ScriptedChat>, fetcher: CannedFetcher, settings: AgentSettings) -> ResearchAgent {
        let embedder = Arc::new(HashingEmbedder::new());
        ResearchAgent::from_parts(
            chat,
            embedder.clone(),
            Arc::new(MemoryIndex::new(embedder)),
            Arc::new(MemoryTopicStore::new()),
            Arc::new(fetcher),
            Arc::new(PromptConfig::default()),
            settings
        )
    }

    fn ehmi_fetcher() -> CannedFetcher {
        CannedFetcher::new()
            .with_html(&format!("{}?q=eHMI", SEARCH_URL), SAMPLE_PAGE)
            .with_html(
                "https://www.mdpi.com/1424-8220/21/9/2912",
                "<html><body><p>Abstract: guidelines for eHMI deployment.</p></body></html>"
            )
    }

    const NORMALIZED: &str = r#"{"papers": [
        {"title": "eHMI: Review and guidelines", "link": "https://www.mdpi.com/1424-8220/21/9/2912",
         "snippet": "Reviews eHMI.", "authors": ["C Guindel", "F Garcia"], "year": 2021},
        {"title": "Survey of eHMI concepts", "link": "No link", "snippet": "No snippet",
         "authors": ["P Bazilinskyy"], "year": 2019}
    ]}"#;

    fn working(title: &str, scraped: &[&str], inferred: &[&str]) -> WorkingPaper {
        let mut paper = WorkingPaper::new(CandidatePaper {
            title: title.to_string(),
            link: "https://x.test".to_string(),
            snippet: String::new(),
            authors: scraped.iter().map(|s| s.to_string()).collect(),
            year: Some(2020),
        });
        paper.inferred_authors = inferred.iter().map(|s| s.to_string()).collect();
        paper
    }

    #[test]
    fn authors_merge_in_first_seen_order() {
        let inferred = vec!["F Garcia".to_string(), " ".to_string(), "C Guindel".to_string()];
        let scraped = vec!["C Guindel".to_string(), "A De La Escalera".to_string(), "F Garcia ".to_string()];
        assert_eq!(merge_authors(&inferred, &scraped), vec!["F Garcia", "C Guindel", "A De La Escalera"]);
    }

    #[test]
    fn assembled_papers_point_at_their_topic() {
        let mut ok = working("ok", &["A"], &["B"]);
        ok.summary = Some("Fine.".into());
        let mut failed = working("failed", &["A"], &[]);
        failed.error = Some("model call failed: timeout".into());

        let topic = assemble_topic("eHMI", vec![ok, failed]);
        assert_eq!(topic.id.len(), 32);
        assert_eq!(topic.papers.len(), 2);
        assert!(topic.papers.iter().all(|p| p.topic_id == topic.id));
        assert_ne!(topic.papers[0].id, topic.papers[1].id);
        assert_eq!(topic.papers[0].authors, vec!["B", "A"]);
        assert_eq!(topic.papers[1].summary, "Summary unavailable: model call failed: timeout");
        assert!(topic.qna_history.is_empty());
    }

    #[tokio::test]
    async fn create_topic_runs_both_pipelines_and_persists() {
        let chat = Arc::new(
            ScriptedChat::new([
                NORMALIZED,
                r#"{"authors": ["C Guindel", "J Carmona"], "summary": "Guidelines for eHMI."}"#,
                r#"{"authors": [], "summary": "A survey of eHMI concepts."}"#,
            ])
        );
        let agent = agent(chat.clone(), ehmi_fetcher(), settings());

        let topic = agent.create_topic("eHMI").await.unwrap();
        assert_eq!(topic.title, "eHMI");
        assert_eq!(topic.papers.len(), 2);
        assert_eq!(topic.papers[0].authors, vec!["C Guindel", "J Carmona", "F Garcia"]);
        assert_eq!(topic.papers[0].year, Some(2021));
        assert_eq!(topic.papers[1].summary, "A survey of eHMI concepts.");
        assert_eq!(chat.request_count(), 3);

        let listed = agent.list_topics().await.unwrap();
        assert_eq!(listed, vec![topic.summary()]);
        assert_eq!(agent.get_topic(&topic.id).await.unwrap(), topic);
    }

    #[tokio::test]
    async fn malformed_normalization_persists_nothing() {
        let chat = Arc::new(ScriptedChat::new(["Sorry, I can't format that."]));
        let agent = agent(chat, ehmi_fetcher(), settings());

        let err = agent.create_topic("eHMI").await.unwrap_err();
        assert!(matches!(err, ApiError::Pipeline(PipelineError::Normalization(_))));
        assert!(agent.list_topics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_search_creates_empty_topic() {
        let chat = Arc::new(ScriptedChat::new(Vec::<String>::new()));
        let fetcher = CannedFetcher::new().with_status(&format!("{}?q=nothing", SEARCH_URL), 429);
        let agent = agent(chat.clone(), fetcher, settings());

        let topic = agent.create_topic("nothing").await.unwrap();
        assert!(topic.papers.is_empty());
        assert_eq!(chat.request_count(), 0);
    }

    #[tokio::test]
    async fn delete_paper_removes_exactly_one() {
        let chat = Arc::new(
            ScriptedChat::new([
                NORMALIZED,
                r#"{"authors": [], "summary": "one"}"#,
                r#"{"authors": [], "summary": "two"}"#,
            ])
        );
        let agent = agent(chat, ehmi_fetcher(), settings());
        let topic = agent.create_topic("eHMI").await.unwrap();
        let doomed = topic.papers[0].id.clone();

        let updated = agent.delete_paper(&topic.id, &doomed).await.unwrap();
        assert_eq!(updated.papers.len(), 1);
        assert_eq!(updated.papers[0], topic.papers[1]);

        let unchanged = agent.delete_paper(&topic.id, "no-such-paper").await.unwrap();
        assert_eq!(unchanged.papers.len(), 1);

        let err = agent.delete_paper("no-such-topic", &doomed).await.unwrap_err();
        assert!(matches!(err, ApiError::TopicNotFound));
    }

    #[tokio::test]
    async fn qna_history_is_kept_only_when_enabled() {
        let mut with_history = settings();
        with_history.persist_qna_history = true;

        for persist in [false, true] {
            let chat = Arc::new(
                ScriptedChat::new([
                    NORMALIZED,
                    r#"{"authors": [], "summary": "one"}"#,
                    r#"{"authors": [], "summary": "two"}"#,
                    "Text works best.",
                ])
            );
            let config = if persist { with_history.clone() } else { settings() };
            let agent = agent(chat, ehmi_fetcher(), config);
            let topic = agent.create_topic("eHMI").await.unwrap();

            let answer = agent.answer_question(&topic.id, "Which eHMI works best?").await.unwrap();
            assert_eq!(answer, "Text works best.");

            let stored = agent.get_topic(&topic.id).await.unwrap();
            assert_eq!(stored.qna_history.len(), if persist { 3 } else { 0 });
        }
    }

    #[tokio::test]
    async fn qna_on_unknown_topic_is_not_found() {
        let agent = agent(Arc::new(ScriptedChat::new(Vec::<String>::new())), CannedFetcher::new(), settings());
        let err = agent.answer_question("missing", "anything?").await.unwrap_err();
        assert!(matches!(err, ApiError::TopicNotFound));
    }

    #[tokio::test]
    async fn reload_without_prompt_file() {
        let agent = agent(Arc::new(ScriptedChat::new(Vec::<String>::new())), CannedFetcher::new(), settings());
        assert_eq!(agent.reload_prompts().await.unwrap(), PromptReload::NotConfigured);
    }
}
