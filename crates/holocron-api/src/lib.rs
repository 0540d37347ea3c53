// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use holocron_app::{
    CollectionQuery, CollectionState, DetailOutcome, DetailProperties, DetailState, Entity,
    EntityUid, FetchFailure, FetchOutcome, ResourceKind, ScreenConfig,
};
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Keys a collection payload may carry its items under, in lookup order.
const COLLECTION_KEYS: [&str; 2] = ["results", "result"];

/// Blocking client for the remote catalog. Each call is exactly one GET;
/// nothing is retried.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("catalog.base_url must not be empty");
        }
        let parsed =
            Url::parse(&base_url).with_context(|| format!("parse catalog.base_url {base_url:?}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "catalog.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }
        if timeout.is_zero() {
            bail!("catalog.timeout must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn screen_config(&self, kind: ResourceKind) -> Result<ScreenConfig> {
        ScreenConfig::for_kind(&self.base_url, kind)
    }

    pub fn try_fetch_collection(&self, query: &CollectionQuery) -> FetchOutcome {
        let body = self.get_json(query.endpoint())?;
        let items = extract_collection(&body);
        tracing::debug!(
            resource = query.resource_name(),
            count = items.len(),
            "collection decoded"
        );
        Ok(items)
    }

    pub fn fetch_collection(&self, query: &CollectionQuery) -> CollectionState {
        CollectionState::from(self.try_fetch_collection(query))
    }

    pub fn try_fetch_detail(
        &self,
        kind: ResourceKind,
        query: &CollectionQuery,
        id: &EntityUid,
    ) -> DetailOutcome {
        let body = self.get_json(&query.detail_url(id))?;
        Ok(extract_properties(kind, &body))
    }

    pub fn fetch_detail(
        &self,
        kind: ResourceKind,
        query: &CollectionQuery,
        id: &EntityUid,
    ) -> DetailState {
        DetailState::from(self.try_fetch_detail(kind, query, id))
    }

    fn get_json(&self, url: &Url) -> std::result::Result<Value, FetchFailure> {
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|error| connection_error(url, &error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|error| connection_error(url, &error))?;
        serde_json::from_str(&body).map_err(|error| FetchFailure::Parse(error.to_string()))
    }
}

fn connection_error(url: &Url, error: &reqwest::Error) -> FetchFailure {
    let reason = if error.is_timeout() {
        "timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    FetchFailure::Network(format!("cannot reach {url} ({reason})"))
}

/// Items of a collection payload. Whichever of `results`/`result` holds an
/// array first wins; anything else yields no items. Non-object elements are
/// dropped.
pub fn extract_collection(body: &Value) -> Vec<Entity> {
    let Some(array) = COLLECTION_KEYS
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_array))
    else {
        return Vec::new();
    };
    array
        .iter()
        .filter_map(|item| Entity::from_value(item.clone()))
        .collect()
}

/// `result.properties` flattened for `kind`. A payload without properties
/// reads as every known field unknown.
pub fn extract_properties(kind: ResourceKind, body: &Value) -> DetailProperties {
    match body
        .get("result")
        .and_then(|result| result.get("properties"))
        .and_then(Value::as_object)
    {
        Some(properties) => DetailProperties::from_properties(kind, properties),
        None => DetailProperties::placeholder(kind),
    }
}
