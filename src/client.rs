use std::collections::HashMap;
use std::io;
use std::time::Duration;

use serde_json::json;

use crate::{ApiConfig, PropertyValue, QueryPage, RequestPacer, Row, truncate_chars};

/// Filter condition for collection queries. The server compares against a
/// property's text rendering, so one shape covers every property kind.
#[derive(Debug, Clone)]
pub(crate) enum Filter {
    IsEmpty { property: String },
    Equals { property: String, value: String },
    Contains { property: String, value: String },
}

impl Filter {
    pub(crate) fn is_empty(property: &str) -> Self {
        Filter::IsEmpty { property: property.to_string() }
    }

    pub(crate) fn equals(property: &str, value: &str) -> Self {
        Filter::Equals {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Filter::IsEmpty { property } => json!({"property": property, "is_empty": true}),
            Filter::Equals { property, value } => json!({"property": property, "equals": value}),
            Filter::Contains { property, value } => {
                json!({"property": property, "contains": value})
            }
        }
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub(crate) fn query_payload(
    page_size: usize,
    filter: Option<&Filter>,
    cursor: Option<&str>,
) -> serde_json::Value {
    let mut payload = json!({ "page_size": page_size });
    if let Some(filter) = filter {
        payload["filter"] = filter.to_json();
    }
    if let Some(cursor) = cursor {
        payload["cursor"] = json!(cursor);
    }
    payload
}

/// Blocking client for the hosted bank. Every outbound call goes through
/// the pacer first; there is no retry, a failed request surfaces to the
/// caller with the upstream status and body.
pub(crate) struct BankClient {
    config: ApiConfig,
    agent: ureq::Agent,
    pacer: RequestPacer,
}

impl BankClient {
    pub(crate) fn new(config: ApiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.timeout_secs))
            .timeout_read(Duration::from_secs(config.timeout_secs))
            .timeout_write(Duration::from_secs(config.timeout_secs))
            .build();
        let pacer = RequestPacer::new(config.requests_per_second);
        Self { config, agent, pacer }
    }

    fn send(
        &mut self,
        method: &str,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<String, Box<dyn std::error::Error>> {
        self.pacer.acquire();
        let url = join_url(&self.config.base_url, path);
        let request = self
            .agent
            .request(method, &url)
            .set("content-type", "application/json")
            .set("authorization", &format!("Bearer {}", self.config.token));
        match request.send_json(payload.clone()) {
            Ok(resp) => Ok(resp.into_string()?),
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("{method} {path}: {code} {}", truncate_chars(text.trim(), 300)),
                )
                .into())
            }
            Err(ureq::Error::Transport(err)) => {
                Err(io::Error::new(io::ErrorKind::Other, format!("{method} {path}: {err}")).into())
            }
        }
    }

    pub(crate) fn query_page(
        &mut self,
        filter: Option<&Filter>,
        cursor: Option<&str>,
    ) -> Result<QueryPage, Box<dyn std::error::Error>> {
        let payload = query_payload(self.config.page_size, filter, cursor);
        let path = format!("collections/{}/query", self.config.collection);
        let body = self.send("POST", &path, &payload)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Follows cursors until the server reports no more pages. The returned
    /// order is the server's, which batch runs rely on for resume.
    pub(crate) fn query_all(
        &mut self,
        filter: Option<&Filter>,
    ) -> Result<Vec<Row>, Box<dyn std::error::Error>> {
        let mut rows = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.query_page(filter, cursor.as_deref())?;
            rows.extend(page.items);
            if !page.has_more {
                break;
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                // has_more without a cursor would spin on the first page
                None => break,
            }
        }
        Ok(rows)
    }

    pub(crate) fn update_properties(
        &mut self,
        id: &str,
        properties: &HashMap<String, PropertyValue>,
    ) -> Result<Row, Box<dyn std::error::Error>> {
        let payload = json!({ "properties": properties });
        let body = self.send("PATCH", &format!("items/{id}"), &payload)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Soft delete: the row stays addressable but drops out of queries.
    pub(crate) fn archive_row(&mut self, id: &str) -> Result<Row, Box<dyn std::error::Error>> {
        let body = self.send("PATCH", &format!("items/{id}"), &json!({"archived": true}))?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://h/v1", "items/3"), "https://h/v1/items/3");
        assert_eq!(join_url("https://h/v1/", "/items/3"), "https://h/v1/items/3");
    }

    #[test]
    fn test_filter_wire_shapes() {
        assert_eq!(
            Filter::is_empty("Difficulty").to_json(),
            serde_json::json!({"property": "Difficulty", "is_empty": true})
        );
        assert_eq!(
            Filter::equals("Topic", "algebra").to_json(),
            serde_json::json!({"property": "Topic", "equals": "algebra"})
        );
        assert_eq!(
            Filter::Contains {
                property: "Statement".into(),
                value: "\\frac".into()
            }
            .to_json(),
            serde_json::json!({"property": "Statement", "contains": "\\frac"})
        );
    }

    #[test]
    fn test_query_payload() {
        let bare = query_payload(100, None, None);
        assert_eq!(bare, serde_json::json!({"page_size": 100}));

        let filter = Filter::is_empty("Answer");
        let full = query_payload(50, Some(&filter), Some("c-2"));
        assert_eq!(
            full,
            serde_json::json!({
                "page_size": 50,
                "filter": {"property": "Answer", "is_empty": true},
                "cursor": "c-2"
            })
        );
    }

    #[test]
    fn test_query_page_parse() {
        let raw = r#"{
            "items": [
                {"id": "a", "properties": {"T": {"kind": "title", "text": "one"}}},
                {"id": "b", "properties": {}}
            ],
            "next_cursor": "cur-9",
            "has_more": true
        }"#;
        let page: QueryPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "a");
        assert_eq!(page.next_cursor.as_deref(), Some("cur-9"));
        assert!(page.has_more);

        let last: QueryPage = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(last.items.is_empty());
        assert!(!last.has_more);
        assert!(last.next_cursor.is_none());
    }
}
