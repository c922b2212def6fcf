//! Supabase (PostgREST) table client.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE};
use tracing::debug;
use url::Url;

use super::{DocumentStore, TableName};
use crate::record::StoredRecord;

/// Default table documents are inserted into.
pub const DEFAULT_TABLE: &str = "documents";

/// Blocking client that inserts rows through `POST {project}/rest/v1/{table}`.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    table_url: Url,
}

impl SupabaseStore {
    /// Builds a client for `table` in the project at `project_url`.
    pub fn new(
        project_url: &str,
        api_key: &str,
        table: &TableName,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Supabase API key");
        let table_url = table_url(project_url, table)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key.trim()).context("invalid Supabase API key")?,
        );
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid Supabase API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Supabase HTTP client")?;
        Ok(Self { client, table_url })
    }

    /// REST endpoint of the target table.
    pub fn table_url(&self) -> &Url {
        &self.table_url
    }
}

impl DocumentStore for SupabaseStore {
    fn insert(&self, record: &StoredRecord) -> Result<()> {
        let resp = self
            .client
            .post(self.table_url.clone())
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .context("failed to call Supabase insert")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("Supabase insert failed ({}): {}", status, body);
        }
        debug!(table = %self.table_url, "inserted document");
        Ok(())
    }

    fn count(&self) -> Result<Option<u64>> {
        let mut url = self.table_url.clone();
        url.query_pairs_mut().append_pair("select", "id");
        let resp = self
            .client
            .head(url)
            .header("Prefer", "count=exact")
            .send()
            .context("failed to call Supabase count")?;
        let status = resp.status();
        anyhow::ensure!(status.is_success(), "Supabase count failed ({})", status);
        let total = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);
        Ok(total)
    }
}

fn table_url(project_url: &str, table: &TableName) -> Result<Url> {
    let mut base = Url::parse(project_url.trim())
        .with_context(|| format!("invalid Supabase URL {:?}", project_url))?;
    anyhow::ensure!(
        matches!(base.scheme(), "http" | "https"),
        "Supabase URL must be an http(s) URL"
    );
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("rest/v1/{}", table.as_str()))
        .context("failed to build Supabase table URL")
}

/// Extracts the total from a `Content-Range` value such as `0-24/3573` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}
