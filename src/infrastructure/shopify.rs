//! Shopify Admin API adapter for the [`OrderPlatform`] port.

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::runtime::Handle;

use crate::domain::errors::DomainError;
use crate::domain::ids::Gid;
use crate::domain::ports::OrderPlatform;

const DRAFT_ORDER_DELETE: &str = r"
    mutation DraftOrderDelete($input: DraftOrderDeleteInput!) {
        draftOrderDelete(input: $input) {
            deletedId
            userErrors {
                field
                message
            }
        }
    }
";

impl From<reqwest::Error> for DomainError {
    fn from(e: reqwest::Error) -> Self {
        DomainError::Platform(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    pub store: String,
    pub access_token: String,
    pub api_version: String,
}

/// Blocking client over async `reqwest`.
///
/// Calls are driven on the runtime captured at construction, so they must be
/// made from outside that runtime's worker threads (e.g. from `web::block`).
pub struct ShopifyAdminClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    runtime: Handle,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQLErrorResponse>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
}

impl ShopifyAdminClient {
    pub fn new(config: &ShopifyConfig, runtime: Handle) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "https://{}/admin/api/{}/graphql.json",
                config.store, config.api_version
            ),
            access_token: config.access_token.clone(),
            runtime,
        }
    }

    async fn execute(&self, body: Value) -> Result<Value, DomainError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let response: GraphQLResponse = response.json().await?;
        data_or_errors(response)
    }
}

fn data_or_errors(response: GraphQLResponse) -> Result<Value, DomainError> {
    if !response.errors.is_empty() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(DomainError::Platform(messages.join("; ")));
    }
    response
        .data
        .ok_or_else(|| DomainError::Platform("GraphQL response has no data".to_string()))
}

fn user_errors(data: &Value, mutation: &str) -> Result<(), DomainError> {
    let messages: Vec<&str> = data
        .get(mutation)
        .and_then(|payload| payload.get("userErrors"))
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Platform(format!(
            "{mutation}: {}",
            messages.join("; ")
        )))
    }
}

impl OrderPlatform for ShopifyAdminClient {
    fn delete_draft_order(&self, id: &Gid) -> Result<(), DomainError> {
        let body = json!({
            "query": DRAFT_ORDER_DELETE,
            "variables": { "input": { "id": id } },
        });

        let data = self.runtime.block_on(self.execute(body))?;
        user_errors(&data, "draftOrderDelete")?;

        log::debug!("deleted draft order {id}");
        Ok(())
    }
}
