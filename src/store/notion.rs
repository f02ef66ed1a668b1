//! Notion-backed record store.
//!
//! Each [`Collection`] maps to one Notion database. Records are pages; typed
//! [`FieldValue`]s map to Notion property objects both ways.

use crate::config::StoreConfig;
use crate::error::{AssistantError, Result};
use crate::store::{Collection, FieldValue, Fields, Filter, Record, RecordStore};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;

/// Hard stop for paginated queries.
const MAX_QUERY_PAGES: usize = 50;

/// Notion REST client bound to the tasks and reminders databases.
#[derive(Clone)]
pub struct NotionStore {
    base_url: String,
    api_version: String,
    token: String,
    tasks_database_id: String,
    reminders_database_id: String,
    client: reqwest::Client,
}

impl NotionStore {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] if the HTTP client cannot be built.
    pub fn new(
        config: &StoreConfig,
        token: impl Into<String>,
        tasks_database_id: impl Into<String>,
        reminders_database_id: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AssistantError::Config(format!("cannot build store client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_version: config.api_version.clone(),
            token: token.into(),
            tasks_database_id: tasks_database_id.into(),
            reminders_database_id: reminders_database_id.into(),
            client,
        })
    }

    fn database_id(&self, collection: Collection) -> &str {
        match collection {
            Collection::Tasks => &self.tasks_database_id,
            Collection::Reminders => &self.reminders_database_id,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
            .json(body)
            .send()
            .await
            .map_err(|e| AssistantError::Store(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AssistantError::Store(format!(
                "{path} returned {status}: {text}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AssistantError::Store(format!("invalid JSON from {path}: {e}")))
    }
}

#[async_trait]
impl RecordStore for NotionStore {
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String> {
        let body = json!({
            "parent": { "database_id": self.database_id(collection) },
            "properties": properties_to_notion(&fields),
        });
        let page = self.post("/v1/pages", &body).await?;
        let id = page
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AssistantError::Store("created page has no id".to_owned()))?;
        debug!("created {collection} record {id}");
        Ok(id.to_owned())
    }

    async fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>> {
        let path = format!("/v1/databases/{}/query", self.database_id(collection));
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_QUERY_PAGES {
            let mut body = Map::new();
            if let Some(f) = filter_to_notion(filter) {
                body.insert("filter".into(), f);
            }
            if let Some(c) = &cursor {
                body.insert("start_cursor".into(), json!(c));
            }

            let page = self.post(&path, &Value::Object(body)).await?;
            if let Some(results) = page.get("results").and_then(Value::as_array) {
                records.extend(results.iter().filter_map(record_from_page));
            }

            let has_more = page
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            cursor = page
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_owned);
            if !has_more || cursor.is_none() {
                return Ok(records);
            }
        }

        Err(AssistantError::Store(format!(
            "{collection} query exceeded {MAX_QUERY_PAGES} pages"
        )))
    }
}

fn rich_text(content: &str) -> Value {
    json!([{ "text": { "content": content } }])
}

/// Convert typed fields to a Notion `properties` object.
#[must_use]
pub fn properties_to_notion(fields: &Fields) -> Value {
    let props: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| {
            let prop = match value {
                FieldValue::Title(s) => json!({ "title": rich_text(s) }),
                FieldValue::Text(s) => json!({ "rich_text": rich_text(s) }),
                FieldValue::Select(s) => json!({ "select": { "name": s } }),
                FieldValue::Status(s) => json!({ "status": { "name": s } }),
                FieldValue::Checkbox(b) => json!({ "checkbox": b }),
            };
            (name.clone(), prop)
        })
        .collect();
    Value::Object(props)
}

/// Convert a filter to Notion's filter object. `None` for an empty filter.
#[must_use]
pub fn filter_to_notion(filter: &Filter) -> Option<Value> {
    let mut clauses: Vec<Value> = filter
        .clauses()
        .iter()
        .map(|(property, value)| {
            let (kind, equals) = match value {
                FieldValue::Title(s) => ("title", json!(s)),
                FieldValue::Text(s) => ("rich_text", json!(s)),
                FieldValue::Select(s) => ("select", json!(s)),
                FieldValue::Status(s) => ("status", json!(s)),
                FieldValue::Checkbox(b) => ("checkbox", json!(b)),
            };
            let mut clause = Map::new();
            clause.insert("property".into(), json!(property));
            clause.insert(kind.into(), json!({ "equals": equals }));
            Value::Object(clause)
        })
        .collect();

    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "and": clauses })),
    }
}

fn plain_text(parts: &Value) -> Option<String> {
    let parts = parts.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| {
            p.get("plain_text")
                .or_else(|| p.get("text").and_then(|t| t.get("content")))
                .and_then(Value::as_str)
        })
        .collect();
    Some(text)
}

fn field_from_property(prop: &Value) -> Option<FieldValue> {
    match prop.get("type").and_then(Value::as_str)? {
        "title" => plain_text(prop.get("title")?).map(FieldValue::Title),
        "rich_text" => plain_text(prop.get("rich_text")?).map(FieldValue::Text),
        "select" => prop
            .get("select")?
            .get("name")
            .and_then(Value::as_str)
            .map(|s| FieldValue::Select(s.to_owned())),
        "status" => prop
            .get("status")?
            .get("name")
            .and_then(Value::as_str)
            .map(|s| FieldValue::Status(s.to_owned())),
        "checkbox" => prop
            .get("checkbox")
            .and_then(Value::as_bool)
            .map(FieldValue::Checkbox),
        _ => None,
    }
}

/// Parse one page object of a query response. Unknown property kinds are dropped.
#[must_use]
pub fn record_from_page(page: &Value) -> Option<Record> {
    let id = page.get("id").and_then(Value::as_str)?.to_owned();
    let fields = page
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .filter_map(|(name, prop)| Some((name.clone(), field_from_property(prop)?)))
                .collect()
        })
        .unwrap_or_default();
    Some(Record { id, fields })
}
