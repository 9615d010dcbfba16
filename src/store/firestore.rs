use async_trait::async_trait;
use log::{ debug, error };
use reqwest::header::{ ACCEPT, AUTHORIZATION };
use reqwest::StatusCode;
use serde_json::{ json, Map, Number, Value };
use std::error::Error;
use std::path::Path;
use tokio::sync::OnceCell;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{ read_service_account_key, ServiceAccountAuthenticator };

use super::{ sort_summaries, TopicStore };
use crate::models::{ Topic, TopicSummary };

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const PAGE_SIZE: usize = 300;

async fn build_authenticator(sa_key_path: &str) -> Result<DefaultAuthenticator, Box<dyn Error + Send + Sync>> {
    let key = read_service_account_key(Path::new(sa_key_path)).await.map_err(|e|
        format!("Failed to load SA key from {}: {}", sa_key_path, e)
    )?;
    let auth = ServiceAccountAuthenticator::builder(key).build().await?;
    debug!("Built Firestore service-account authenticator from {}", sa_key_path);
    Ok(auth)
}

/// Topics as Firestore documents, accessed over the REST API.
pub struct FirestoreTopicStore {
    client: reqwest::Client,
    project_id: String,
    sa_key_path: String,
    collection: String,
    // Built on first use; it caches and refreshes the access token itself.
    auth: OnceCell<DefaultAuthenticator>,
}

impl FirestoreTopicStore {
    pub fn new(project_id: String, sa_key_path: String, collection: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id,
            sa_key_path,
            collection,
            auth: OnceCell::new(),
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            FIRESTORE_BASE_URL,
            self.project_id,
            self.collection
        )
    }

    fn document_url(&self, topic_id: &str) -> String {
        format!("{}/{}", self.collection_url(), topic_id)
    }

    async fn bearer(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        let auth = self.auth.get_or_try_init(|| build_authenticator(&self.sa_key_path)).await?;
        let token = auth.token(&[DATASTORE_SCOPE]).await?;
        let token = token.token().ok_or("OAuth token was None")?;
        Ok(format!("Bearer {}", token))
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, Box<dyn Error + Send + Sync>> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(format!("Firestore returned {}: {}", status, body).into())
}

#[async_trait]
impl TopicStore for FirestoreTopicStore {
    async fn put_topic(&self, topic: &Topic) -> Result<(), Box<dyn Error + Send + Sync>> {
        let body = json!({ "fields": to_document_fields(&serde_json::to_value(topic)?)? });
        // PATCH without an update mask replaces the whole document, creating it if needed.
        let resp = self.client
            .patch(self.document_url(&topic.id))
            .header(AUTHORIZATION, self.bearer().await?)
            .json(&body)
            .send().await?;
        error_for_status(resp).await?;
        debug!("Stored topic {} in Firestore", topic.id);
        Ok(())
    }

    async fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, Box<dyn Error + Send + Sync>> {
        let resp = self.client
            .get(self.document_url(topic_id))
            .header(AUTHORIZATION, self.bearer().await?)
            .header(ACCEPT, "application/json")
            .send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document: Value = error_for_status(resp).await?.json().await?;
        let fields = document.get("fields").cloned().unwrap_or_else(|| json!({}));
        let topic = serde_json::from_value(from_document_fields(&fields)?)?;
        Ok(Some(topic))
    }

    async fn list_topics(&self) -> Result<Vec<TopicSummary>, Box<dyn Error + Send + Sync>> {
        let bearer = self.bearer().await?;
        let mut summaries: Vec<TopicSummary> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("pageSize", PAGE_SIZE.to_string()),
                ("mask.fieldPaths", "id".to_string()),
                ("mask.fieldPaths", "title".to_string())
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let resp = self.client
                .get(self.collection_url())
                .header(AUTHORIZATION, &bearer)
                .query(&query)
                .send().await?;
            let page: Value = error_for_status(resp).await?.json().await?;

            for document in page
                .get("documents")
                .and_then(Value::as_array)
                .into_iter()
                .flatten() {
                let fields = document.get("fields").cloned().unwrap_or_else(|| json!({}));
                match from_document_fields(&fields).and_then(|v| {
                    serde_json::from_value::<TopicSummary>(v).map_err(Into::into)
                }) {
                    Ok(summary) => summaries.push(summary),
                    Err(e) => error!("Skipping unreadable Firestore document: {}", e),
                }
            }

            page_token = page
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }

        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

/// Converts a JSON object into a Firestore `fields` map.
pub fn to_document_fields(value: &Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
    match value {
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), to_firestore_value(v)))
                .collect();
            Ok(Value::Object(fields))
        }
        other => Err(format!("Firestore documents must be objects, got {}", other).into()),
    }
}

pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) =>
            match n.as_i64() {
                // Firestore encodes 64-bit integers as strings.
                Some(i) => json!({ "integerValue": i.to_string() }),
                None => json!({ "doubleValue": n.as_f64() }),
            }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_firestore_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), to_firestore_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Converts a Firestore `fields` map back into a plain JSON object.
pub fn from_document_fields(fields: &Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
    let Some(map) = fields.as_object() else {
        return Err("Firestore fields must be an object".into());
    };
    let mut object = Map::with_capacity(map.len());
    for (k, v) in map {
        object.insert(k.clone(), from_firestore_value(v)?);
    }
    Ok(Value::Object(object))
}

pub fn from_firestore_value(value: &Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
    let Some((kind, inner)) = value.as_object().and_then(|m| m.iter().next()) else {
        return Err(format!("Not a Firestore value: {}", value).into());
    };

    let converted = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().ok_or("booleanValue must be a bool")?),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>()?,
                other => other.as_i64().ok_or("integerValue must be an integer")?,
            };
            Value::Number(parsed.into())
        }
        "doubleValue" => {
            let parsed = inner.as_f64().ok_or("doubleValue must be a number")?;
            Number::from_f64(parsed).map(Value::Number).unwrap_or(Value::Null)
        }
        "stringValue" | "timestampValue" | "referenceValue" =>
            Value::String(inner.as_str().ok_or("string-like value must be a string")?.to_string()),
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(from_firestore_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Value::Array(items)
        }
        "mapValue" => {
            let fields = inner.get("fields").cloned().unwrap_or_else(|| json!({}));
            from_document_fields(&fields)?
        }
        other => {
            return Err(format!("Unsupported Firestore value type: {}", other).into());
        }
    };
    Ok(converted)
}
