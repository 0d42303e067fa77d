// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Blocking HTTP client for the CRUD proxy. One resource per table:
//! `GET/POST /api/:table`, `PUT/DELETE /api/:table/:id`, JSON bodies,
//! errors as `{"error": "..."}` envelopes.

use anyhow::{Context, Result, bail};
use daftar_app::{ListQuery, RemoteStore, Row, RowId, StoreError, StoreResult, TableKind};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url).context("parse api.base_url")?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("api.base_url must be an http(s) URL, got {base_url:?}");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Health probe against the proxy root. Used by `--check` and at
    /// startup before the first table load.
    pub fn ping(&self) -> Result<()> {
        let response = self
            .http
            .get(&self.base_url)
            .send()
            .with_context(|| format!("cannot reach {} -- is the proxy running?", self.base_url))?;
        let status = response.status();
        if !status.is_success() {
            bail!("proxy returned {} from its health endpoint", status.as_u16());
        }
        Ok(())
    }

    fn table_url(&self, table: TableKind) -> String {
        format!("{}/api/{}", self.base_url, table.as_str())
    }

    fn row_url(&self, table: TableKind, id: i64) -> String {
        format!("{}/api/{}/{}", self.base_url, table.as_str(), id)
    }

    fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request
            .send()
            .map_err(|error| transport_error(&self.base_url, &error))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Write(rejection_reason(status, &body)));
        }
        Ok(response)
    }
}

impl RemoteStore for Client {
    fn list(&mut self, table: TableKind, query: &ListQuery) -> StoreResult<Vec<Row>> {
        let mut request = self.http.get(self.table_url(table));
        if let Some(search) = &query.search {
            request = request.query(&[("search", search.as_str())]);
        }
        if let Some(sort) = &query.sort {
            request = request.query(&[("sort", sort.as_str())]);
        }
        if let Some(order) = query.order {
            request = request.query(&[("order", order.as_str())]);
        }
        if let Some(limit) = query.limit {
            request = request.query(&[("limit", limit)]);
        }
        if let Some(offset) = query.offset {
            request = request.query(&[("offset", offset)]);
        }

        let response = request
            .send()
            .map_err(|error| StoreError::Fetch(reachability(&self.base_url, &error)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Fetch(rejection_reason(status, &body)));
        }

        let values: Vec<Value> = response
            .json()
            .map_err(|_| StoreError::Fetch("malformed row list from proxy".to_owned()))?;
        values.iter().map(decode_row).collect()
    }

    fn create(&mut self, table: TableKind, fields: &BTreeMap<String, String>) -> StoreResult<Row> {
        let request = self.http.post(self.table_url(table)).json(fields);
        let response = self.send(request)?;
        let value: Value = response
            .json()
            .map_err(|_| StoreError::Write("malformed row in create response".to_owned()))?;
        decode_row(&value)
    }

    fn update(
        &mut self,
        table: TableKind,
        id: i64,
        fields: &BTreeMap<String, String>,
    ) -> StoreResult<Row> {
        let request = self.http.put(self.row_url(table, id)).json(fields);
        let response = self.send(request)?;
        let value: Value = response
            .json()
            .map_err(|_| StoreError::Write("malformed row in update response".to_owned()))?;
        decode_row(&value)
    }

    fn delete(&mut self, table: TableKind, id: i64) -> StoreResult<()> {
        let request = self.http.delete(self.row_url(table, id));
        self.send(request)?;
        Ok(())
    }
}

/// One proxy record into a `Row`. The `id` column becomes the identity;
/// every other value is carried as a display string, SQL NULL as "".
fn decode_row(value: &Value) -> StoreResult<Row> {
    let Value::Object(object) = value else {
        return Err(StoreError::Fetch("row is not a JSON object".to_owned()));
    };
    let id = object
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| StoreError::Fetch("row is missing its id".to_owned()))?;

    let mut fields = BTreeMap::new();
    for (name, value) in object {
        if name == "id" {
            continue;
        }
        fields.insert(name.clone(), display_string(value));
    }
    Ok(Row::new(RowId::Assigned(id), fields))
}

fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn transport_error(base_url: &str, error: &reqwest::Error) -> StoreError {
    StoreError::Write(reachability(base_url, error))
}

fn reachability(base_url: &str, error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("{base_url} timed out")
    } else {
        format!("cannot reach {base_url}")
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}

fn rejection_reason(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return error;
    }
    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return format!("server error ({}): {}", status.as_u16(), body.trim());
    }
    format!("server returned {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::{Client, decode_row, rejection_reason};
    use daftar_app::RowId;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn new_rejects_non_http_urls() {
        assert!(Client::new("", Duration::from_secs(1)).is_err());
        assert!(Client::new("ftp://files.example", Duration::from_secs(1)).is_err());
        assert!(Client::new("not a url", Duration::from_secs(1)).is_err());
        let client =
            Client::new("http://localhost:3000/", Duration::from_secs(1)).expect("valid URL");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn decode_row_stringifies_nulls_and_numbers() {
        let row = decode_row(&json!({
            "id": 7,
            "Name": "Ali",
            "Phone": null,
            "Unit": 3
        }))
        .expect("well-formed row");
        assert_eq!(row.id, RowId::Assigned(7));
        assert_eq!(row.field("Name"), "Ali");
        assert_eq!(row.field("Phone"), "");
        assert_eq!(row.field("Unit"), "3");
        assert!(!row.fields.contains_key("id"));
    }

    #[test]
    fn decode_row_requires_an_id() {
        assert!(decode_row(&json!({"Name": "Ali"})).is_err());
        assert!(decode_row(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn rejection_reason_prefers_the_error_envelope() {
        assert_eq!(
            rejection_reason(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"UNIQUE constraint failed: professors.Email"}"#
            ),
            "UNIQUE constraint failed: professors.Email"
        );
        assert_eq!(
            rejection_reason(StatusCode::BAD_GATEWAY, "Bad Gateway"),
            "server error (502): Bad Gateway"
        );
        assert_eq!(
            rejection_reason(StatusCode::INTERNAL_SERVER_ERROR, "{\"unexpected\":true}"),
            "server returned 500"
        );
    }
}
