//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use crate::detector::{parse_selection, SourceType};
use crate::embedder::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::embedder::OpenAiEmbedder;
use crate::pipeline::BatchOptions;
use crate::store::supabase::DEFAULT_TABLE;
use crate::store::{SupabaseStore, TableName};

/// Loads a search API export into a Supabase vector table.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "search-ingest",
    about = "Normalize a blog/shopping/news JSON export, embed each item, and store it in Supabase"
)]
pub struct IngestCli {
    /// JSON file to ingest (`-` reads stdin)
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Source type: auto, blog, shopping, news, or generic
    #[arg(long, env = "SEARCH_INGEST_SOURCE_TYPE", default_value = "auto")]
    pub source_type: String,

    /// Collection label (generated from type and time when omitted)
    #[arg(long, env = "SEARCH_INGEST_COLLECTION")]
    pub collection: Option<String>,

    /// Print normalized documents as JSON lines and skip embedding/storage
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// OpenAI API key used for embedding calls
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Embedding model identifier
    #[arg(long, env = "SEARCH_INGEST_OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub openai_model: String,

    /// Optional dimension override when supported by the model
    #[arg(long, env = "SEARCH_INGEST_OPENAI_DIMENSIONS")]
    pub openai_dimensions: Option<usize>,

    /// Base URL for the OpenAI-compatible API
    #[arg(long, env = "SEARCH_INGEST_OPENAI_BASE", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Max seconds to wait for each embedding request
    #[arg(long, env = "SEARCH_INGEST_OPENAI_TIMEOUT_SECS", default_value_t = 30)]
    pub openai_timeout_secs: u64,

    /// Supabase project URL (https://<project>.supabase.co)
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase service or anon key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Target table
    #[arg(long, env = "SEARCH_INGEST_TABLE", default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Max seconds to wait for each store request
    #[arg(long, env = "SEARCH_INGEST_STORE_TIMEOUT_SECS", default_value_t = 30)]
    pub store_timeout_secs: u64,
}

impl IngestCli {
    /// True when the input should be read from stdin.
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }

    /// Explicit source type, or `None` for detection.
    pub fn source_selection(&self) -> Result<Option<SourceType>> {
        parse_selection(&self.source_type).context("invalid --source-type")
    }

    /// Caller choices for the batch.
    pub fn batch_options(&self) -> Result<BatchOptions> {
        Ok(BatchOptions {
            source_type: self.source_selection()?,
            collection: self.collection.clone(),
        })
    }

    /// Builds the embedding client from the OpenAI settings.
    pub fn build_embedder(&self) -> Result<OpenAiEmbedder> {
        let api_key = self
            .openai_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set unless --dry-run is used"))?;
        OpenAiEmbedder::new(
            api_key,
            &self.openai_base_url,
            self.openai_model.clone(),
            self.openai_dimensions,
            Duration::from_secs(self.openai_timeout_secs.max(1)),
        )
    }

    /// Builds the store client from the Supabase settings.
    pub fn build_store(&self) -> Result<SupabaseStore> {
        let url = self
            .supabase_url
            .as_deref()
            .ok_or_else(|| anyhow!("SUPABASE_URL must be set unless --dry-run is used"))?;
        let key = self
            .supabase_key
            .as_deref()
            .ok_or_else(|| anyhow!("SUPABASE_KEY must be set unless --dry-run is used"))?;
        let table = TableName::new(self.table.as_str())?;
        SupabaseStore::new(
            url,
            key,
            &table,
            Duration::from_secs(self.store_timeout_secs.max(1)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_stdin_and_detection() {
        let cli = IngestCli::try_parse_from(["search-ingest", "--dry-run"]).expect("parse");
        assert!(cli.reads_stdin());
        assert!(cli.dry_run);
        let options = cli.batch_options().expect("options");
        assert_eq!(options.source_type, None);
    }

    #[test]
    fn explicit_type_and_collection() {
        let cli = IngestCli::try_parse_from([
            "search-ingest",
            "export.json",
            "--source-type",
            "shopping",
            "--collection",
            "spring-sale",
        ])
        .expect("parse");
        assert!(!cli.reads_stdin());
        let options = cli.batch_options().expect("options");
        assert_eq!(options.source_type, Some(SourceType::Shopping));
        assert_eq!(options.collection.as_deref(), Some("spring-sale"));
    }

    #[test]
    fn invalid_type_is_reported() {
        let cli = IngestCli::try_parse_from(["search-ingest", "--source-type", "forum"])
            .expect("parse");
        let err = cli.batch_options().expect_err("forum");
        assert!(format!("{err:#}").contains("forum"));
    }

    #[test]
    fn missing_credentials_are_reported() {
        let mut cli = IngestCli::try_parse_from(["search-ingest"]).expect("parse");
        cli.openai_api_key = None;
        cli.supabase_url = None;
        assert!(cli.build_embedder().is_err());
        assert!(cli.build_store().is_err());
    }
}
