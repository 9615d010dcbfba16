use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use log::info;

#[derive(Debug)]
pub enum PromptError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

/// Every prompt the pipeline sends. Fields missing from an override file keep their defaults.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PromptConfig {
    pub normalize_system: String,
    pub normalize_user: String,
    pub summarize_system: String,
    pub summarize_user: String,
    pub qna_system: String,
    pub qna_user: String,
    pub no_context_answer: String,
    pub empty_question_answer: String,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            normalize_system: concat!(
                "You are an expert in interpreting raw data scraped from Google Scholar. ",
                "Clean the data without typos or formatting errors. ",
                "Change authors into lists of names, give the year as a number (null if unknown) ",
                "and keep the links exactly as provided. ",
                "Reply with a single JSON object and nothing else, in this shape: ",
                "{\"papers\": [{\"title\": \"...\", \"link\": \"...\", \"snippet\": \"...\", ",
                "\"authors\": [\"Author 1\"], \"year\": 2020}]}"
            ).to_string(),
            normalize_user: "Clean the following raw data (at most {max_results} papers) into the JSON format above:\n\n{scraped_data}".to_string(),
            summarize_system: concat!(
                "You are an expert in summarizing academic papers. ",
                "Summarize the provided content without typos or formatting errors. ",
                "Reply with a single JSON object and nothing else, in this shape: ",
                "{\"authors\": [\"Author 1\", \"Author 2\"], \"summary\": \"Paper summary\"}"
            ).to_string(),
            summarize_user: concat!(
                "Summarize the following paper into the JSON format given in the system prompt.\n\n",
                "Title: {title}\n",
                "Snippet: {snippet}\n",
                "Content: {content}\n",
                "Context: {context}\n"
            ).to_string(),
            qna_system: concat!(
                "You are an expert on the topic '{topic}' and are very patient and clear when explaining complex subjects. ",
                "Answer the question below in simple, detailed language."
            ).to_string(),
            qna_user: concat!(
                "Use the following pieces of context to answer the question at the end. ",
                "If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n",
                "{context}\n\n",
                "Question: {question}\n",
                "Helpful Answer:"
            ).to_string(),
            no_context_answer: "I don't have any papers saved for this topic yet, so there is no context to answer from.".to_string(),
            empty_question_answer: "Please ask a question about this topic's papers.".to_string(),
            last_loaded: None,
        }
    }
}

/// Fills `{name}` slots in a single left-to-right pass, so inserted values are never re-expanded.
fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        filled.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let slot = slots
            .iter()
            .find(|(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));
        match slot {
            Some((name, value)) => {
                filled.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                filled.push('{');
                rest = tail;
            }
        }
    }
    filled.push_str(rest);
    filled
}

impl PromptConfig {
    pub fn normalize_user_prompt(&self, scraped_data: &str, max_results: usize) -> String {
        let max_results = max_results.to_string();
        fill_template(
            &self.normalize_user,
            &[
                ("max_results", max_results.as_str()),
                ("scraped_data", scraped_data),
            ]
        )
    }

    pub fn summarize_user_prompt(
        &self,
        title: &str,
        snippet: &str,
        content: &str,
        context: &str
    ) -> String {
        fill_template(
            &self.summarize_user,
            &[
                ("title", title),
                ("snippet", snippet),
                ("content", content),
                ("context", context),
            ]
        )
    }

    pub fn qna_system_prompt(&self, topic: &str) -> String {
        fill_template(&self.qna_system, &[("topic", topic)])
    }

    pub fn qna_user_prompt(&self, context: &str, question: &str) -> String {
        fill_template(&self.qna_user, &[
            ("context", context),
            ("question", question),
        ])
    }
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let file_content = fs::read_to_string(path.as_ref())?;
    let mut config: PromptConfig = serde_json::from_str(&file_content)?;
    config.last_loaded = Some(SystemTime::now());
    Ok(Arc::new(config))
}

/// Built-in prompts, or the override file when one is configured.
pub fn initial_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, PromptError> {
    match path {
        Some(p) => {
            info!("Loading prompt templates from: {}", p);
            load_prompts(p)
        }
        None => {
            info!("Using built-in prompt templates");
            Ok(Arc::new(PromptConfig::default()))
        }
    }
}

pub fn reload_prompts_if_changed<P: AsRef<Path>>(
    path: P,
    current_config: &Arc<PromptConfig>
) -> Result<Option<Arc<PromptConfig>>, PromptError> {
    let metadata = fs::metadata(&path)?;

    if let Ok(modified) = metadata.modified() {
        if let Some(last_loaded) = current_config.last_loaded {
            if modified > last_loaded {
                info!("Prompts file changed, reloading...");
                return load_prompts(path).map(Some);
            }
        } else {
            info!("No last_loaded timestamp, reloading prompts...");
            return load_prompts(path).map(Some);
        }
    }
    Ok(None)
}
