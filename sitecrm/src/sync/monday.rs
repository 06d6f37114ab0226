//! Monday.com GraphQL client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use thiserror::Error as ThisError;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{BoardSync, CreatedItems, SurveyItem, status_index};
use crate::config::{BoardColumns, BoardConfig, MondayConfig};

#[derive(Debug, ThisError)]
pub enum SyncError {
    #[error("token not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("API error: {0}")]
    GraphQl(String),

    #[error("no item ID returned")]
    MissingItemId,

    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CreateItemData {
    create_item: Option<CreatedItem>,
}

#[derive(Debug, Deserialize)]
struct CreatedItem {
    id: String,
}

/// Sends survey items to the primary and mirror boards.
pub struct MondayClient {
    client: Client,
    api_url: Url,
    primary: BoardConfig,
    mirror: BoardConfig,
}

impl MondayClient {
    pub fn new(config: &MondayConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            primary: config.primary.clone(),
            mirror: config.mirror.clone(),
        })
    }

    /// POST one GraphQL document with a board's token. HTTP failures and a non-empty `errors`
    /// field are both reported as errors.
    async fn execute<T: DeserializeOwned>(&self, token: &str, query: String) -> Result<T, SyncError> {
        let response = self
            .client
            .post(self.api_url.clone())
            .header(reqwest::header::AUTHORIZATION, token)
            .json(&json!({ "query": query }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status { status, body });
        }

        let body: GraphQlResponse<T> = response.json().await?;
        if let Some(errors) = body.errors.filter(|e| !e.is_null()) {
            return Err(SyncError::GraphQl(errors.to_string()));
        }
        body.data.ok_or_else(|| SyncError::GraphQl("response had no data".to_string()))
    }

    #[instrument(skip(self, board, item), fields(board = %board.name), err)]
    async fn create_on_board(&self, board: &BoardConfig, item: &SurveyItem) -> Result<String, SyncError> {
        let token = board.token.as_deref().ok_or(SyncError::NotConfigured)?;
        let query = create_item_mutation(board, item)?;
        debug!("Creating item on board {}", board.board_id);

        let data: CreateItemData = self.execute(token, query).await?;
        let id = data.create_item.map(|item| item.id).ok_or(SyncError::MissingItemId)?;
        info!("Created {} item {} for survey: {}", board.name, id, item.name);
        Ok(id)
    }
}

/// Column values for a new item: status, optional date, link and optional creator.
fn create_columns(columns: &BoardColumns, item: &SurveyItem) -> Map<String, Value> {
    let mut values = Map::new();
    values.insert(columns.status.clone(), json!({ "index": status_index(&item.status) }));
    if let Some(date) = item.survey_date {
        values.insert(columns.date.clone(), json!({ "date": date.format("%Y-%m-%d").to_string() }));
    }
    values.insert(columns.link.clone(), json!({ "url": item.survey_url, "text": "View Survey" }));
    if let Some(created_by) = &item.created_by {
        values.insert(columns.created_by.clone(), Value::String(created_by.clone()));
    }
    values
}

/// The API takes `column_values` as a JSON string, so the map is encoded once to a string and
/// then again to a GraphQL string literal.
fn encode_column_values(values: &Map<String, Value>) -> Result<String, serde_json::Error> {
    serde_json::to_string(&serde_json::to_string(values)?)
}

fn create_item_mutation(board: &BoardConfig, item: &SurveyItem) -> Result<String, serde_json::Error> {
    Ok(format!(
        "mutation {{ create_item (board_id: {}, item_name: {}, column_values: {}) {{ id }} }}",
        serde_json::to_string(&board.board_id)?,
        serde_json::to_string(&item.name)?,
        encode_column_values(&create_columns(&board.columns, item))?,
    ))
}

fn update_item_mutation(board: &BoardConfig, item_id: &str, item: &SurveyItem) -> Result<String, serde_json::Error> {
    let board_id = serde_json::to_string(&board.board_id)?;
    let item_id = serde_json::to_string(item_id)?;

    let mut values = Map::new();
    if let Some(date) = item.survey_date {
        values.insert(board.columns.date.clone(), json!({ "date": date.format("%Y-%m-%d").to_string() }));
    }
    values.insert(board.columns.link.clone(), json!({ "url": item.survey_url, "text": "View Survey" }));

    Ok(format!(
        "mutation {{ \
         change_simple_column_value (board_id: {board_id}, item_id: {item_id}, column_id: \"name\", value: {}) {{ id }} \
         change_multiple_column_values (board_id: {board_id}, item_id: {item_id}, column_values: {}) {{ id }} \
         }}",
        serde_json::to_string(&item.name)?,
        encode_column_values(&values)?,
    ))
}

#[async_trait]
impl BoardSync for MondayClient {
    fn is_configured(&self) -> bool {
        self.primary.token.is_some() || self.mirror.token.is_some()
    }

    async fn create_item(&self, item: &SurveyItem) -> CreatedItems {
        let mut created = CreatedItems::default();

        // Boards without a token are not sync targets
        if self.primary.token.is_some() {
            match self.create_on_board(&self.primary, item).await {
                Ok(id) => created.primary_item_id = Some(id),
                Err(e) => {
                    warn!("{} sync failed: {e}", self.primary.name);
                    created.errors.push(format!("{}: {e}", self.primary.name));
                }
            }
        }
        if self.mirror.token.is_some() {
            match self.create_on_board(&self.mirror, item).await {
                Ok(id) => created.mirror_item_id = Some(id),
                Err(e) => {
                    warn!("{} sync failed: {e}", self.mirror.name);
                    created.errors.push(format!("{}: {e}", self.mirror.name));
                }
            }
        }

        created
    }

    #[instrument(skip(self, item), err)]
    async fn update_item(&self, item_id: &str, item: &SurveyItem) -> Result<(), SyncError> {
        let token = self.primary.token.as_deref().ok_or(SyncError::NotConfigured)?;
        let query = update_item_mutation(&self.primary, item_id, item)?;
        let _: Value = self.execute(token, query).await?;
        info!("Updated {} item {item_id}", self.primary.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::install_crypto_provider;
    use chrono::NaiveDate;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, header, method},
    };

    fn config(server: &MockServer, primary_token: Option<&str>, mirror_token: Option<&str>) -> MondayConfig {
        let mut config = MondayConfig {
            api_url: Url::parse(&server.uri()).unwrap(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        config.primary.token = primary_token.map(str::to_string);
        config.mirror.token = mirror_token.map(str::to_string);
        config
    }

    fn item() -> SurveyItem {
        SurveyItem {
            name: "Dock \"4\"".to_string(),
            survey_url: "http://app/checklists/9".to_string(),
            survey_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            status: "Working on it".to_string(),
            created_by: Some("Sam".to_string()),
        }
    }

    #[test]
    fn test_create_mutation_double_encodes_columns() {
        let board = MondayConfig::default().primary;
        let query = create_item_mutation(&board, &item()).unwrap();

        assert!(query.contains(r#"board_id: "5090310184""#));
        assert!(query.contains(r#"item_name: "Dock \"4\"""#));
        // The map is a JSON string inside the GraphQL document
        assert!(query.contains(r#"column_values: "{\""#));
        assert!(query.contains(r#"\"date4\":{\"date\":\"2024-03-15\"}"#));
        assert!(query.contains(r#"\"status\":{\"index\":0}"#));
        assert!(query.contains(r#"\"text_mm08xxxv\":\"Sam\""#));
        assert!(query.contains(r#"\"text\":\"View Survey\""#));
    }

    #[test]
    fn test_create_columns_skip_missing_values() {
        let columns = MondayConfig::default().mirror.columns;
        let values = create_columns(
            &columns,
            &SurveyItem {
                survey_date: None,
                created_by: None,
                ..item()
            },
        );
        assert_eq!(values.len(), 2);
        assert!(values.contains_key("color_mm0gb8b5"));
        assert!(values.contains_key("link_mm0gybba"));
    }

    #[test_log::test(tokio::test)]
    async fn test_create_on_both_boards() {
        install_crypto_provider();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "primary-token"))
            .and(body_string_contains("5090310184"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"create_item": {"id": "111"}}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("authorization", "mirror-token"))
            .and(body_string_contains("5091667006"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"create_item": {"id": "222"}}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = MondayClient::new(&config(&server, Some("primary-token"), Some("mirror-token"))).unwrap();
        let created = client.create_item(&item()).await;

        assert!(created.succeeded());
        assert_eq!(created.primary_item_id.as_deref(), Some("111"));
        assert_eq!(created.mirror_item_id.as_deref(), Some("222"));
        assert!(created.errors.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_partial_failure_still_succeeds() {
        install_crypto_provider();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "primary-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errors": [{"message": "Invalid board"}]})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("authorization", "mirror-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"create_item": {"id": "222"}}})))
            .mount(&server)
            .await;

        let client = MondayClient::new(&config(&server, Some("primary-token"), Some("mirror-token"))).unwrap();
        let created = client.create_item(&item()).await;

        assert!(created.succeeded());
        assert!(created.primary_item_id.is_none());
        assert_eq!(created.mirror_item_id.as_deref(), Some("222"));
        assert_eq!(created.errors.len(), 1);
        assert!(created.errors[0].starts_with("Westley: API error"));
        assert!(created.errors[0].contains("Invalid board"));
    }

    #[test_log::test(tokio::test)]
    async fn test_http_error_fails_sync() {
        install_crypto_provider();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(1)
            .mount(&server)
            .await;

        let client = MondayClient::new(&config(&server, Some("primary-token"), None)).unwrap();
        assert!(client.is_configured());
        let created = client.create_item(&item()).await;

        assert!(!created.succeeded());
        assert_eq!(
            created.errors,
            vec!["Westley: HTTP 500 Internal Server Error: upstream down".to_string()]
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_create_skips_board_without_token() {
        install_crypto_provider();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "mirror-token"))
            .and(body_string_contains("5091667006"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"create_item": {"id": "222"}}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("5090310184"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"create_item": {"id": "111"}}})))
            .expect(0)
            .mount(&server)
            .await;

        let client = MondayClient::new(&config(&server, None, Some("mirror-token"))).unwrap();
        let created = client.create_item(&item()).await;

        assert!(created.succeeded());
        assert!(created.primary_item_id.is_none());
        assert_eq!(created.mirror_item_id.as_deref(), Some("222"));
        assert!(created.errors.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_update_targets_primary_board_only() {
        install_crypto_provider();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "primary-token"))
            .and(body_string_contains("change_simple_column_value"))
            .and(body_string_contains("change_multiple_column_values"))
            .and(body_string_contains(r#"item_id: \"555\""#))
            .and(body_string_contains(r#"column_id: \"name\""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"change_multiple_column_values": {"id": "555"}}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = MondayClient::new(&config(&server, Some("primary-token"), Some("mirror-token"))).unwrap();
        client.update_item("555", &item()).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_without_primary_token() {
        install_crypto_provider();
        let server = MockServer::start().await;
        let client = MondayClient::new(&config(&server, None, Some("mirror-token"))).unwrap();
        assert!(matches!(client.update_item("555", &item()).await, Err(SyncError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_unconfigured_client() {
        install_crypto_provider();
        let server = MockServer::start().await;
        let client = MondayClient::new(&config(&server, None, None)).unwrap();
        assert!(!client.is_configured());
    }
}
