//! Cloud Firestore adapter over the REST v1 API
//!
//! Documents are exchanged as Firestore typed values (`stringValue`,
//! `integerValue`, ...) and converted to plain JSON at this boundary.
//! Requests carry a timeout and are retried with exponential backoff on
//! transport failures, HTTP 401 (after dropping the cached token), 429 and
//! 5xx responses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::time::sleep;

use super::{
    credentials::TokenProvider, Document, DocumentStore, FieldFilter, StoreError, StoreResult,
};
use crate::config::StoreConfig;

const PAGE_SIZE: &str = "300";

pub struct FirestoreStore {
    client: Client,
    root: Url,
    tokens: TokenProvider,
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RunQueryRow {
    document: Option<RawDocument>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirestoreStore {
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let project_id = config
            .project_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| StoreError::Unavailable("Firestore project id is not configured".to_string()))?;

        let base = match &config.emulator_host {
            Some(host) if !host.is_empty() => format!("http://{}/v1", host),
            _ => config.base_url.trim_end_matches('/').to_string(),
        };

        let mut root = Url::parse(&base)
            .map_err(|e| StoreError::Unavailable(format!("Invalid Firestore base URL {}: {}", base, e)))?;
        root.path_segments_mut()
            .map_err(|_| StoreError::Unavailable(format!("Invalid Firestore base URL {}", base)))?
            .extend(["projects", project_id, "databases", config.database.as_str(), "documents"]);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        let tokens = TokenProvider::from_config(config, client.clone())?;

        Ok(Self {
            client,
            root,
            tokens,
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        })
    }

    /// URL of the documents root, `.../projects/{p}/databases/{d}/documents`
    pub fn documents_root(&self) -> &str {
        self.root.as_str()
    }

    /// Where access tokens come from
    pub fn credentials(&self) -> &'static str {
        self.tokens.describe()
    }

    fn url_with(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Unavailable("Firestore root cannot be a base URL".to_string()))?
            .extend(segments);
        Ok(url)
    }

    /// `documents:method` style RPC endpoint on the documents root
    fn rpc_url(&self, method: &str) -> String {
        format!("{}:{}", self.root.as_str().trim_end_matches('/'), method)
    }

    /// Send a request, retrying transient failures
    async fn send<F>(&self, build: F) -> StoreResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        self.send_counted(build).await.map(|(response, _)| response)
    }

    /// Like [`Self::send`], also reporting how many attempts were made
    async fn send_counted<F>(&self, build: F) -> StoreResult<(Response, u32)>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        let mut delay = self.initial_backoff;

        loop {
            let mut request = build(&self.client);
            if let Some(token) = self.tokens.token().await? {
                request = request.bearer_auth(token);
            }

            let failure = match request.send().await {
                Ok(response) => match response.status() {
                    StatusCode::FORBIDDEN => {
                        let cause = rejected(response).await;
                        tracing::error!("Firestore denied access with {}: {}", self.credentials(), cause);
                        return Err(StoreError::Unavailable(format!("Firestore denied access: {}", cause)));
                    }
                    StatusCode::UNAUTHORIZED => {
                        self.tokens.invalidate().await;
                        format!("status {}", StatusCode::UNAUTHORIZED)
                    }
                    status if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() => {
                        format!("status {}", status)
                    }
                    _ => return Ok((response, attempt + 1)),
                },
                Err(e) => e.to_string(),
            };

            if attempt >= self.max_retries {
                return Err(StoreError::Unavailable(format!(
                    "Firestore request failed after {} attempts: {}",
                    attempt + 1,
                    failure
                )));
            }

            attempt += 1;
            tracing::warn!(
                "Firestore request failed ({}), retrying in {:?} (attempt {}/{})",
                failure,
                delay,
                attempt,
                self.max_retries
            );
            sleep(delay).await;
            delay = std::cmp::min(delay * 2, self.max_backoff);
        }
    }
}

async fn rejected(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
    StoreError::Rejected { status, message }
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: Response) -> StoreResult<T> {
    response
        .json()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>> {
        let Some(url) = self.document_url(collection, key)? else {
            return Ok(None);
        };
        let response = self.send(|client| client.get(url.clone())).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let raw: RawDocument = read_json(response).await?;
                decode_fields(&raw.fields).map(Some)
            }
            _ => Err(rejected(response).await),
        }
    }

    async fn list(&self, collection: &str, filter: Option<FieldFilter>) -> StoreResult<Vec<Document>> {
        if let Some(filter) = filter {
            let url = self.rpc_url("runQuery");
            let body = json!({
                "structuredQuery": {
                    "from": [{ "collectionId": collection }],
                    "where": {
                        "fieldFilter": {
                            "field": { "fieldPath": field_path(&filter.field) },
                            "op": "EQUAL",
                            "value": encode_value(&filter.value),
                        }
                    }
                }
            });
            let response = self.send(|client| client.post(&url).json(&body)).await?;
            if !response.status().is_success() {
                return Err(rejected(response).await);
            }
            let rows: Vec<RunQueryRow> = read_json(response).await?;
            return rows
                .into_iter()
                .filter_map(|row| row.document)
                .map(|raw| decode_fields(&raw.fields))
                .collect();
        }

        let url = self.url_with(&[collection])?;
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .send(|client| {
                    let request = client.get(url.clone()).query(&[("pageSize", PAGE_SIZE)]);
                    match page_token {
                        Some(ref token) => request.query(&[("pageToken", token)]),
                        None => request,
                    }
                })
                .await?;
            if !response.status().is_success() {
                return Err(rejected(response).await);
            }

            let page: ListResponse = read_json(response).await?;
            for raw in &page.documents {
                documents.push(decode_fields(&raw.fields)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn set(&self, collection: &str, key: &str, document: Document) -> StoreResult<()> {
        let url = self.url_with(&[collection])?;
        let body = json!({ "fields": encode_fields(&document) });
        let (response, attempts) = self
            .send_counted(|client| client.post(url.clone()).query(&[("documentId", key)]).json(&body))
            .await?;

        match response.status() {
            // An earlier attempt may have been written before its response was lost
            StatusCode::CONFLICT if attempts > 1 => match self.get(collection, key).await? {
                Some(stored) if stored == document => {
                    tracing::warn!("Create of {} {} landed on a retried attempt", collection, key);
                    Ok(())
                }
                _ => Err(StoreError::already_exists(collection, key)),
            },
            StatusCode::CONFLICT => Err(StoreError::already_exists(collection, key)),
            status if status.is_success() => Ok(()),
            _ => Err(rejected(response).await),
        }
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> StoreResult<()> {
        let Some(url) = self.document_url(collection, key)? else {
            return Err(StoreError::missing(collection, key));
        };
        let mut query: Vec<(&str, String)> = fields
            .keys()
            .map(|field| ("updateMask.fieldPaths", field_path(field)))
            .collect();
        query.push(("currentDocument.exists", "true".to_string()));
        let body = json!({ "fields": encode_fields(&fields) });

        let response = self
            .send(|client| client.patch(url.clone()).query(&query).json(&body))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::missing(collection, key)),
            status if status.is_success() => Ok(()),
            _ => Err(rejected(response).await),
        }
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<bool> {
        let Some(url) = self.document_url(collection, key)? else {
            return Ok(false);
        };
        let response = self
            .send(|client| client.delete(url.clone()).query(&[("currentDocument.exists", "true")]))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(rejected(response).await),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        let url = self.rpc_url("listCollectionIds");
        let body = json!({ "pageSize": 1 });
        let response = self.send(|client| client.post(&url).json(&body)).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejected(response).await)
        }
    }
}

impl FirestoreStore {
    /// `None` for keys that cannot name a single document. URL path
    /// normalization would turn `.` and `..` into the collection itself.
    fn document_url(&self, collection: &str, key: &str) -> StoreResult<Option<Url>> {
        if key.is_empty() || key == "." || key == ".." {
            return Ok(None);
        }
        self.url_with(&[collection, key]).map(Some)
    }
}

/// Quote a field path unless it is a plain identifier
fn field_path(field: &str) -> String {
    let mut chars = field.chars();
    let simple = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Convert plain JSON to a Firestore typed value
pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => json!({ "integerValue": i.to_string() }),
            (None, Some(u)) => json!({ "integerValue": u.to_string() }),
            _ => json!({ "doubleValue": n }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => {
            let values: Vec<Value> = values.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

pub(crate) fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

/// Convert a Firestore typed value back to plain JSON
pub(crate) fn decode_value(value: &Value) -> StoreResult<Value> {
    let (kind, inner) = value
        .as_object()
        .and_then(|typed| typed.iter().next())
        .ok_or_else(|| StoreError::Decode(format!("untyped value {}", value)))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| StoreError::Decode(format!("invalid boolean {}", inner))),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| StoreError::Decode(format!("invalid integer {}: {}", s, e))),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(inner.clone()),
            _ => Err(StoreError::Decode(format!("invalid integer {}", inner))),
        },
        "doubleValue" => match inner {
            Value::Number(_) => Ok(inner.clone()),
            _ => Err(StoreError::Decode(format!("invalid double {}", inner))),
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" | "geoPointValue" => {
            Ok(inner.clone())
        }
        "arrayValue" => inner
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(decode_value).collect::<StoreResult<Vec<_>>>())
            .unwrap_or_else(|| Ok(Vec::new()))
            .map(Value::Array),
        "mapValue" => match inner.get("fields").and_then(Value::as_object) {
            Some(fields) => decode_fields(fields).map(Value::Object),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(StoreError::Decode(format!("unsupported value type {}", other))),
    }
}

pub(crate) fn decode_fields(fields: &Map<String, Value>) -> StoreResult<Document> {
    fields
        .iter()
        .map(|(name, value)| decode_value(value).map(|v| (name.clone(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use axum::http::Method;

    use super::*;
    use crate::{
        config::{StoreBackend, StoreConfig},
        store::testing::FakeServer,
    };

    fn config() -> StoreConfig {
        StoreConfig {
            backend: StoreBackend::Firestore,
            project_id: Some("safety-inspection".to_string()),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn builds_document_urls_under_the_project_root() {
        let store = FirestoreStore::new(&config()).unwrap();
        assert_eq!(
            store.documents_root(),
            "https://firestore.googleapis.com/v1/projects/safety-inspection/databases/(default)/documents"
        );
        let url = store.document_url("Employee", "E 1/2").unwrap().unwrap();
        assert!(url.as_str().ends_with("/documents/Employee/E%201%2F2"));
        assert!(store.rpc_url("runQuery").ends_with("/documents:runQuery"));
    }

    #[test]
    fn emulator_host_switches_to_plain_http() {
        let mut config = config();
        config.emulator_host = Some("localhost:8081".to_string());
        let store = FirestoreStore::new(&config).unwrap();
        assert!(store
            .documents_root()
            .starts_with("http://localhost:8081/v1/projects/safety-inspection/"));
    }

    #[test]
    fn missing_project_is_rejected() {
        let mut config = config();
        config.project_id = None;
        assert!(matches!(
            FirestoreStore::new(&config),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn encodes_scalars_as_typed_values() {
        assert_eq!(encode_value(&json!("hallway")), json!({ "stringValue": "hallway" }));
        assert_eq!(encode_value(&json!(3)), json!({ "integerValue": "3" }));
        assert_eq!(encode_value(&json!(-1)), json!({ "integerValue": "-1" }));
        assert_eq!(encode_value(&json!(1.5)), json!({ "doubleValue": 1.5 }));
        assert_eq!(encode_value(&json!(true)), json!({ "booleanValue": true }));
        assert_eq!(encode_value(&Value::Null), json!({ "nullValue": null }));
    }

    #[test]
    fn decodes_a_stored_equipment_document() {
        let raw = json!({
            "EquipmentId": { "stringValue": "0b5c3f4e-1111-4c2a-9a55-6d2f0e7d9a01" },
            "EquipmentType": { "stringValue": "fire extinguisher" },
            "Building": { "stringValue": "A" },
            "Floor": { "integerValue": "3" },
            "Location": { "stringValue": "hallway" },
            "Tags": { "arrayValue": { "values": [{ "stringValue": "red" }] } },
            "Meta": { "mapValue": { "fields": { "Checked": { "booleanValue": false } } } },
            "Empty": { "arrayValue": {} }
        });
        let decoded = decode_fields(raw.as_object().unwrap()).unwrap();
        assert_eq!(decoded["Floor"], json!(3));
        assert_eq!(decoded["Building"], json!("A"));
        assert_eq!(decoded["Tags"], json!(["red"]));
        assert_eq!(decoded["Meta"], json!({ "Checked": false }));
        assert_eq!(decoded["Empty"], json!([]));
    }

    #[test]
    fn nested_values_survive_encoding() {
        let original = json!({ "a": [1, "two", null, { "b": 2.5 }] });
        let encoded = encode_fields(original.as_object().unwrap());
        let decoded = decode_fields(&encoded).unwrap();
        assert_eq!(Value::Object(decoded), original);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(decode_value(&json!({ "integerValue": "three" })).is_err());
        assert!(decode_value(&json!({ "weirdValue": 1 })).is_err());
        assert!(decode_value(&json!("bare")).is_err());
    }

    #[test]
    fn quotes_non_identifier_field_paths() {
        assert_eq!(field_path("EquipmentType"), "EquipmentType");
        assert_eq!(field_path("equipment type"), "`equipment type`");
        assert_eq!(field_path("1st"), "`1st`");
    }

    #[test]
    fn dot_keys_have_no_document_url() {
        let store = FirestoreStore::new(&config()).unwrap();
        for key in ["", ".", ".."] {
            assert!(store.document_url("Employee", key).unwrap().is_none(), "{:?}", key);
        }
        assert!(store.document_url("Employee", "...").unwrap().is_some());
    }

    fn against(server: &FakeServer) -> FirestoreStore {
        FirestoreStore::new(&StoreConfig {
            emulator_host: Some(server.host()),
            timeout_secs: 5,
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
            ..config()
        })
        .unwrap()
    }

    /// Not an emulator, so requests carry tokens from the fake metadata server
    fn against_with_metadata_tokens(server: &FakeServer) -> FirestoreStore {
        FirestoreStore::new(&StoreConfig {
            base_url: server.url("/v1").to_string(),
            metadata_url: server.url("/token").to_string(),
            timeout_secs: 5,
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
            ..config()
        })
        .unwrap()
    }

    fn stored(fields: Value) -> (StatusCode, Value) {
        (StatusCode::OK, json!({ "name": "projects/p/databases/d/documents/c/k", "fields": fields }))
    }

    fn token(value: &str) -> (StatusCode, Value) {
        (StatusCode::OK, json!({ "access_token": value, "expires_in": 3599 }))
    }

    fn failure(status: StatusCode, message: &str) -> (StatusCode, Value) {
        (status, json!({ "error": { "code": status.as_u16(), "message": message } }))
    }

    fn hose() -> Document {
        json!({ "EquipmentType": "hose", "Floor": 3 })
            .as_object()
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn retries_throttling_and_server_errors() {
        let server = FakeServer::start(vec![
            failure(StatusCode::SERVICE_UNAVAILABLE, "backend unavailable"),
            failure(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            stored(json!({ "Floor": { "integerValue": "3" } })),
        ])
        .await;
        let store = against(&server);

        let doc = store.get("Equipment", "k1").await.unwrap().unwrap();
        assert_eq!(doc["Floor"], json!(3));

        let seen = server.requests();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|r| r.method == Method::GET));
        assert!(seen[0].uri.ends_with("/documents/Equipment/k1"));
        assert!(seen[0].authorization.is_none());
    }

    #[tokio::test]
    async fn unavailable_once_retries_run_out() {
        let server = FakeServer::start(vec![
            failure(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            failure(StatusCode::BAD_GATEWAY, "boom"),
            failure(StatusCode::SERVICE_UNAVAILABLE, "boom"),
            stored(json!({})),
        ])
        .await;
        let store = against(&server);

        let result = store.list("Equipment", None).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = FakeServer::start(vec![failure(StatusCode::BAD_REQUEST, "bad field path")]).await;
        let store = against(&server);

        match store.get("Employee", "E1").await {
            Err(StoreError::Rejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad field path");
            }
            other => panic!("expected a rejection, got {:?}", other),
        }
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn absent_documents_map_to_store_outcomes() {
        let server = FakeServer::start(vec![
            failure(StatusCode::NOT_FOUND, "no document"),
            failure(StatusCode::NOT_FOUND, "no document"),
            failure(StatusCode::NOT_FOUND, "no document"),
            (StatusCode::OK, json!({})),
        ])
        .await;
        let store = against(&server);

        assert!(store.get("Employee", "E1").await.unwrap().is_none());
        assert!(matches!(
            store.update("Employee", "E1", hose()).await,
            Err(StoreError::Missing { .. })
        ));
        assert!(!store.delete("Employee", "E1").await.unwrap());
        assert!(store.delete("Employee", "E1").await.unwrap());

        let seen = server.requests();
        assert_eq!(seen[1].method, Method::PATCH);
        assert!(seen[1].uri.contains("updateMask.fieldPaths=EquipmentType"));
        assert!(seen[1].uri.contains("updateMask.fieldPaths=Floor"));
        assert!(seen[1].uri.contains("currentDocument.exists=true"));
        assert_eq!(seen[2].method, Method::DELETE);
        assert!(seen[2].uri.contains("currentDocument.exists=true"));
    }

    #[tokio::test]
    async fn dot_keys_never_reach_the_server() {
        let server = FakeServer::start(Vec::new()).await;
        let store = against(&server);

        assert!(store.get("Employee", "..").await.unwrap().is_none());
        assert!(matches!(
            store.update("Employee", ".", hose()).await,
            Err(StoreError::Missing { .. })
        ));
        assert!(!store.delete("Employee", "..").await.unwrap());
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn create_conflict_is_already_exists() {
        let server = FakeServer::start(vec![failure(StatusCode::CONFLICT, "Document already exists")]).await;
        let store = against(&server);

        assert!(matches!(
            store.set("Equipment", "k1", hose()).await,
            Err(StoreError::AlreadyExists { .. })
        ));

        let seen = server.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::POST);
        assert!(seen[0].uri.contains("documentId=k1"));
        assert!(seen[0].body.contains("\"stringValue\":\"hose\""));
    }

    #[tokio::test]
    async fn retried_create_that_already_landed_succeeds() {
        let server = FakeServer::start(vec![
            failure(StatusCode::SERVICE_UNAVAILABLE, "deadline exceeded"),
            failure(StatusCode::CONFLICT, "Document already exists"),
            stored(json!({
                "EquipmentType": { "stringValue": "hose" },
                "Floor": { "integerValue": "3" }
            })),
        ])
        .await;
        let store = against(&server);

        store.set("Equipment", "k1", hose()).await.unwrap();
        let seen = server.requests();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].method, Method::GET);
    }

    #[tokio::test]
    async fn retried_create_over_a_different_document_conflicts() {
        let server = FakeServer::start(vec![
            failure(StatusCode::SERVICE_UNAVAILABLE, "deadline exceeded"),
            failure(StatusCode::CONFLICT, "Document already exists"),
            stored(json!({
                "EquipmentType": { "stringValue": "hose" },
                "Floor": { "integerValue": "7" }
            })),
        ])
        .await;
        let store = against(&server);

        assert!(matches!(
            store.set("Equipment", "k1", hose()).await,
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn list_follows_page_tokens() {
        let server = FakeServer::start(vec![
            (
                StatusCode::OK,
                json!({
                    "documents": [{ "fields": { "Location": { "stringValue": "lobby" } } }],
                    "nextPageToken": "p2"
                }),
            ),
            (
                StatusCode::OK,
                json!({ "documents": [{ "fields": { "Location": { "stringValue": "kitchen" } } }] }),
            ),
        ])
        .await;
        let store = against(&server);

        let docs = store.list("Equipment", None).await.unwrap();
        let locations: Vec<&Value> = docs.iter().map(|d| &d["Location"]).collect();
        assert_eq!(locations, vec![&json!("lobby"), &json!("kitchen")]);

        let seen = server.requests();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].uri.contains("pageSize=300"));
        assert!(!seen[0].uri.contains("pageToken"));
        assert!(seen[1].uri.contains("pageToken=p2"));
    }

    #[tokio::test]
    async fn filtered_list_runs_a_structured_query() {
        let server = FakeServer::start(vec![(
            StatusCode::OK,
            json!([
                { "document": { "fields": { "EquipmentType": { "stringValue": "hose" } } } },
                { "readTime": "2024-01-01T00:00:00Z" }
            ]),
        )])
        .await;
        let store = against(&server);

        let docs = store
            .list("Equipment", Some(FieldFilter::equals("EquipmentType", "hose")))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);

        let seen = server.requests();
        assert_eq!(seen[0].method, Method::POST);
        assert!(seen[0].uri.ends_with("documents:runQuery"));
        assert!(seen[0].body.contains("\"op\":\"EQUAL\""));
    }

    #[tokio::test]
    async fn sends_the_static_access_token() {
        let server = FakeServer::start(vec![stored(json!({}))]).await;
        let store = FirestoreStore::new(&StoreConfig {
            base_url: server.url("/v1").to_string(),
            access_token: Some("fixed".to_string()),
            ..config()
        })
        .unwrap();

        store.get("Employee", "E1").await.unwrap();
        assert_eq!(server.requests()[0].authorization.as_deref(), Some("Bearer fixed"));
    }

    #[tokio::test]
    async fn refreshes_the_token_after_unauthorized() {
        let server = FakeServer::start(vec![
            token("t1"),
            failure(StatusCode::UNAUTHORIZED, "token expired"),
            token("t2"),
            stored(json!({})),
            stored(json!({})),
        ])
        .await;
        let store = against_with_metadata_tokens(&server);

        assert!(store.get("Employee", "E1").await.unwrap().is_some());
        assert!(store.get("Employee", "E1").await.unwrap().is_some());

        let seen = server.requests();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0].metadata_flavor.as_deref(), Some("Google"));
        assert_eq!(seen[1].authorization.as_deref(), Some("Bearer t1"));
        assert_eq!(seen[3].authorization.as_deref(), Some("Bearer t2"));
        assert_eq!(seen[4].authorization.as_deref(), Some("Bearer t2"));
    }

    #[tokio::test]
    async fn forbidden_is_unavailable_without_retrying() {
        let server = FakeServer::start(vec![
            token("t1"),
            failure(StatusCode::FORBIDDEN, "Missing or insufficient permissions."),
        ])
        .await;
        let store = against_with_metadata_tokens(&server);

        match store.get("Employee", "E1").await {
            Err(StoreError::Unavailable(message)) => {
                assert!(message.contains("insufficient permissions"))
            }
            other => panic!("expected unavailable, got {:?}", other),
        }
        assert_eq!(server.requests().len(), 2);
    }
}
