//! HTTP source for SharePoint-style REST endpoints.
//!
//! The host builds the `reqwest::Client` (default headers, bearer tokens,
//! cookies); this adapter only shapes the OData queries and decodes the
//! payloads.

use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

use super::{ItemQuery, LibrarySource, RawItem};
use crate::error::{SourceError, SourceResult};

const ODATA_JSON: &str = "application/json;odata=nometadata";

/// A [`LibrarySource`] backed by a REST API.
#[derive(Debug, Clone)]
pub struct RestSource {
    client: Client,
}

impl RestSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Endpoint of a library entity.
    pub fn list_url(group: &str, library_id: &str) -> String {
        format!(
            "{}/_api/web/lists(guid'{}')",
            group.trim_end_matches('/'),
            library_id
        )
    }

    /// Endpoint of a library's items.
    pub fn items_url(group: &str, library_id: &str) -> String {
        format!("{}/items", Self::list_url(group, library_id))
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> SourceResult<Value> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, ODATA_JSON)
            .query(params)
            .send()
            .await
            .map_err(|e| SourceError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| SourceError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl LibrarySource for RestSource {
    async fn list_items(
        &self,
        group: &str,
        library_id: &str,
        query: &ItemQuery,
    ) -> SourceResult<Vec<RawItem>> {
        let url = Self::items_url(group, library_id);
        let params = [
            ("$select", query.select.join(",")),
            ("$expand", query.expand.join(",")),
            ("$filter", query.filter.clone()),
            ("$top", query.top.to_string()),
        ];
        let body = self.get_json(&url, &params).await?;
        decode_items(body).ok_or_else(|| SourceError::Decode {
            url,
            message: "expected an item collection".into(),
        })
    }

    async fn resolve_capability(
        &self,
        group: &str,
        library_id: &str,
    ) -> SourceResult<Option<String>> {
        let url = Self::list_url(group, library_id);
        let params = [
            ("$select", "Id,Drive/Id".to_string()),
            ("$expand", "Drive".to_string()),
        ];
        let body = self.get_json(&url, &params).await?;
        Ok(decode_drive_id(&body))
    }
}

/// Items from either the `nometadata` (`{"value": [...]}`) or the verbose
/// (`{"d": {"results": [...]}}`) payload shape.
fn decode_items(body: Value) -> Option<Vec<RawItem>> {
    let items = match body {
        Value::Object(mut map) => match map.remove("value") {
            Some(Value::Array(items)) => items,
            _ => match map.remove("d") {
                Some(Value::Object(mut d)) => match d.remove("results") {
                    Some(Value::Array(items)) => items,
                    _ => return None,
                },
                _ => return None,
            },
        },
        Value::Array(items) => items,
        _ => return None,
    };
    Some(items.into_iter().map(RawItem::new).collect())
}

fn decode_drive_id(body: &Value) -> Option<String> {
    let entity = body.get("d").unwrap_or(body);
    entity
        .get("Drive")
        .and_then(|d| d.get("Id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
