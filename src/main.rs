//! # Harvester CLI Application
//!
//! This module implements the command-line interface for the harvester crate,
//! giving access to a finished crawl's WACZ archive through a set of
//! subcommands.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands:
//!   - `parse-url-content`: print the captured HTML of one URL
//!   - `generate-metadata-records`: build and write the metadata record table
//!   - `list-pages`: print the website table of an archive
//!
//! Logs go to stderr and optionally to a file, so stdout carries only
//! command output.

mod telemetry;

use clap::{Args, Parser, Subcommand};
use harvester::records::{CrawlRecordsParser, OutputFormat, ParserConfig, RecordStatus};
use harvester::wacz::WaczClient;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Extract metadata records from web crawl WACZ archives", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the HTML captured for a URL
    ParseUrlContent(ParseUrlContentArgs),

    /// Generate metadata records from a crawl and write them to a file
    GenerateMetadataRecords(GenerateMetadataRecordsArgs),

    /// List the crawled HTML pages of an archive
    ListPages(ListPagesArgs),
}

#[derive(Args, Debug)]
struct ParseUrlContentArgs {
    /// Local path or URI of the WACZ file
    #[arg(long, required = true)]
    wacz_input_file: String,

    /// URL of the page to print
    #[arg(long, required = true)]
    url: String,
}

#[derive(Args, Debug)]
struct GenerateMetadataRecordsArgs {
    /// Local path or URI of the WACZ file
    #[arg(long, required = true)]
    wacz_input_file: String,

    /// Output file; the extension picks the format (xml|jsonl|tsv|csv)
    #[arg(long, required = true)]
    metadata_output_file: String,

    /// Include the normalized fulltext of each page
    #[arg(long)]
    include_fulltext: bool,

    /// Extract keywords from the fulltext of each page
    #[arg(long)]
    extract_fulltext_keywords: bool,

    /// Include the raw HTML of each page, base64 encoded
    #[arg(long)]
    include_html_base64: bool,

    /// Include the captured HTTP response headers of each page
    #[arg(long)]
    include_response_headers: bool,

    /// Current list of site URLs, one per line
    #[arg(long, requires = "previous_sitemap_urls_file")]
    urls_file: Option<String>,

    /// Site URL list from the previous crawl
    #[arg(long, requires = "urls_file")]
    previous_sitemap_urls_file: Option<String>,

    /// Number of pages parsed concurrently
    #[arg(short, long, default_value = "1")]
    num_workers: usize,
}

#[derive(Args, Debug)]
struct ListPagesArgs {
    /// Local path or URI of the WACZ file
    #[arg(long, required = true)]
    wacz_input_file: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Printing page content keeps stdout clean of anything but the page
    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Some(Commands::ParseUrlContent(_)), false) => "error",
        _ => "info",
    };
    let _log_guard = telemetry::init_tracing_subscriber(default_level, cli.log_file.as_deref())?;

    // Execute the appropriate command
    match cli.command {
        Some(Commands::ParseUrlContent(args)) => {
            parse_url_content_command(args).await?;
        }
        Some(Commands::GenerateMetadataRecords(args)) => {
            generate_metadata_records_command(args).await?;
        }
        Some(Commands::ListPages(args)) => {
            list_pages_command(args).await?;
        }
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["harvester", "--help"]);
        }
    }

    Ok(())
}

#[instrument]
async fn parse_url_content_command(args: ParseUrlContentArgs) -> harvester::Result<()> {
    let mut client = WaczClient::open(&args.wacz_input_file).await?;
    let content = client.get_content_by_url(&args.url, true)?;
    client.close();

    print!("{}", String::from_utf8_lossy(content.as_bytes()));
    Ok(())
}

#[instrument]
async fn generate_metadata_records_command(
    args: GenerateMetadataRecordsArgs,
) -> harvester::Result<()> {
    // Fail on an unusable output file before parsing anything
    OutputFormat::from_path(&args.metadata_output_file)?;

    let config = ParserConfig::builder()
        .include_fulltext(args.include_fulltext)
        .extract_fulltext_keywords(args.extract_fulltext_keywords)
        .include_html_base64(args.include_html_base64)
        .include_response_headers(args.include_response_headers)
        .num_workers(args.num_workers)
        .build();

    println!("Parsing {}...", args.wacz_input_file);
    let start_time = std::time::Instant::now();

    // Create progress spinner; the page count is only known once parsing starts
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner:.cyan/blue} {pos} pages {msg}")
            .map_err(|e| harvester::Error::Other(e.to_string()))?,
    );
    progress_bar.enable_steady_tick(std::time::Duration::from_millis(120));
    progress_bar.set_message("Parsing pages...");

    // Create a channel for progress updates
    let (progress_sender, mut progress_receiver) = mpsc::channel::<String>(100);

    // Spawn a task to process progress updates
    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while let Some(url) = progress_receiver.recv().await {
                progress_bar.inc(1);
                progress_bar.set_message(url);
            }
            progress_bar.finish_with_message("Parsing completed");
        }
    });

    let mut parser = CrawlRecordsParser::new(args.wacz_input_file.clone(), config);
    let records = parser
        .generate_records(
            args.urls_file.as_deref(),
            args.previous_sitemap_urls_file.as_deref(),
            Some(progress_sender),
        )
        .await?;

    // Wait for progress task to complete (it will end when all senders are dropped)
    if let Err(e) = progress_handle.await {
        warn!("Progress display task failed: {}", e);
    }

    let deleted = records
        .records()
        .iter()
        .filter(|r| r.status == RecordStatus::Deleted)
        .count();

    records.write(&args.metadata_output_file).await?;

    let elapsed = start_time.elapsed();
    info!("Total elapsed: {:.2?}", elapsed);
    println!(
        "Wrote {} records ({} deleted) to {}",
        records.len(),
        deleted,
        args.metadata_output_file
    );
    println!("Total elapsed: {:.2?}", elapsed);

    Ok(())
}

#[instrument]
async fn list_pages_command(args: ListPagesArgs) -> harvester::Result<()> {
    let mut client = WaczClient::open(&args.wacz_input_file).await?;

    for website in client.websites()? {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            website.url,
            website.filename,
            website.offset,
            website
                .length
                .map(|length| length.to_string())
                .unwrap_or_default(),
            website.title.as_deref().unwrap_or_default()
        );
    }

    client.close();
    Ok(())
}
