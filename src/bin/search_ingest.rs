use std::io::{self, BufWriter, Read, Write};

use anyhow::{Context, Result};
use clap::Parser;
use search_ingest::{preview, BatchReport, DocumentStore, IngestCli, Ingestor};
use tracing::warn;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = IngestCli::parse();
    let options = cli.batch_options()?;

    if cli.dry_run {
        let input = read_input(&cli)?;
        let result = preview(&input, options.source_type)?;
        let stdout = io::stdout();
        let mut writer = BufWriter::new(stdout.lock());
        for document in &result.documents {
            serde_json::to_writer(&mut writer, document)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        eprintln!(
            "dry run: normalized {} document(s) as {}.",
            result.documents.len(),
            search_ingest::detector::collection_tag(result.source_type)
        );
        return Ok(());
    }

    let ingestor = Ingestor::new(cli.build_embedder()?, cli.build_store()?);
    let report = if cli.reads_stdin() {
        ingestor.run(&read_input(&cli)?, &options)?
    } else {
        ingestor.run_file(&cli.input, &options)?
    };
    print_report(&report);

    match ingestor.store().count() {
        Ok(Some(total)) => println!("Total documents in store: {total}"),
        Ok(None) => {}
        Err(err) => warn!(error = %format!("{err:#}"), "could not read store document count"),
    }
    Ok(())
}

fn read_input(cli: &IngestCli) -> Result<String> {
    if cli.reads_stdin() {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(&cli.input)
            .with_context(|| format!("failed to read {:?}", cli.input))
    }
}

fn print_report(report: &BatchReport) {
    println!(
        "Successfully stored {} document{}.",
        report.documents,
        if report.documents == 1 { "" } else { "s" }
    );
    println!("Collection: {}", report.collection);
    println!("Data type: {}", report.source_label());
}
