use axum::{
    extract::{ Path, State },
    http::StatusCode,
    response::IntoResponse,
    routing::{ delete, get, post },
    Json,
    Router,
};
use log::{ error, info };
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };

use crate::agent::{ PromptReload, ResearchAgent };
use crate::error::ApiError;
use crate::models::api::{
    MessageResponse,
    QnaResponse,
    QueryInput,
    ReloadResponse,
    TopicListResponse,
    TopicPost,
    TopicResponse,
};

#[derive(Clone)]
struct AppState {
    agent: Arc<ResearchAgent>,
}

/// All HTTP routes, with permissive CORS.
pub fn router(agent: Arc<ResearchAgent>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api", get(root_handler))
        .route("/api/", get(root_handler))
        .route("/api/topics", get(list_topics_handler).post(create_topic_handler))
        .route("/api/topics/{topic_id}", get(get_topic_handler))
        .route("/api/topics/{topic_id}/papers/{paper_id}", delete(delete_paper_handler))
        .route("/api/topics/{topic_id}/qna", post(qna_handler))
        .route("/api/reload-prompts", get(reload_prompts_handler))
        .layer(cors)
        .with_state(AppState { agent })
}

async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse { message: "Welcome to ScholarPilot!".to_string() })
}

async fn list_topics_handler(State(state): State<AppState>) -> Result<Json<TopicListResponse>, ApiError> {
    let topics = state.agent.list_topics().await?;
    Ok(Json(TopicListResponse { topics }))
}

async fn create_topic_handler(
    State(state): State<AppState>,
    Json(input): Json<TopicPost>
) -> Result<Json<TopicResponse>, ApiError> {
    let topic = state.agent.create_topic(&input.topic).await?;
    Ok(Json(TopicResponse { topic }))
}

async fn get_topic_handler(
    State(state): State<AppState>,
    Path(topic_id): Path<String>
) -> Result<Json<TopicResponse>, ApiError> {
    let topic = state.agent.get_topic(&topic_id).await?;
    Ok(Json(TopicResponse { topic }))
}

async fn delete_paper_handler(
    State(state): State<AppState>,
    Path((topic_id, paper_id)): Path<(String, String)>
) -> Result<Json<TopicResponse>, ApiError> {
    let topic = state.agent.delete_paper(&topic_id, &paper_id).await?;
    Ok(Json(TopicResponse { topic }))
}

async fn qna_handler(
    State(state): State<AppState>,
    Path(topic_id): Path<String>,
    Json(input): Json<QueryInput>
) -> Result<Json<QnaResponse>, ApiError> {
    let response = state.agent.answer_question(&topic_id, &input.query).await?;
    Ok(Json(QnaResponse { response }))
}

async fn reload_prompts_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (code, success, message) = match state.agent.reload_prompts().await {
        Ok(PromptReload::Reloaded) => (StatusCode::OK, true, "Prompts reloaded".to_string()),
        Ok(PromptReload::Unchanged) => (StatusCode::OK, true, "Prompts unchanged".to_string()),
        Ok(PromptReload::NotConfigured) => {
            (StatusCode::OK, true, "No prompt file configured, using built-in prompts".to_string())
        }
        Err(e) => {
            error!("Prompt reload failed: {}", e);
            (StatusCode::BAD_REQUEST, false, format!("Reload error: {}", e))
        }
    };
    info!("Prompt reload requested: {}", message);
    (code, Json(ReloadResponse { success, message }))
}
