//! Record table generation for one crawl.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::config::ParserConfig;
use super::enrich::RecordEnricher;
use super::error::RecordsError;
use super::keywords::KeywordExtractor;
use super::reconcile::{dedup, diff_deletions};
use super::{CrawlRecord, RecordSet};
use crate::wacz::WaczClient;

/// Rows between progress log lines
const PROGRESS_INTERVAL: usize = 100;

/// Parses a WACZ archive into a table of crawl records.
///
/// The keyword extractor and the finished record set are built on first use
/// and reused for the life of the parser.
#[derive(Debug)]
pub struct CrawlRecordsParser {
    wacz_input_file: String,
    config: Arc<ParserConfig>,
    keyword_extractor: Option<Arc<KeywordExtractor>>,
    records: Option<RecordSet>,
}

impl CrawlRecordsParser {
    /// Create a parser for an archive at a local path or remote URI
    pub fn new(wacz_input_file: impl Into<String>, config: ParserConfig) -> Self {
        Self {
            wacz_input_file: wacz_input_file.into(),
            config: Arc::new(config),
            keyword_extractor: None,
            records: None,
        }
    }

    /// Location of the archive
    pub fn wacz_input_file(&self) -> &str {
        &self.wacz_input_file
    }

    /// Parser configuration
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Records generated so far, if any
    pub fn records(&self) -> Option<&RecordSet> {
        self.records.as_ref()
    }

    /// The keyword extractor, built from the configured stopwords on first call
    pub fn keyword_extractor(&mut self) -> Result<Arc<KeywordExtractor>, RecordsError> {
        if let Some(extractor) = &self.keyword_extractor {
            return Ok(extractor.clone());
        }
        let extractor = Arc::new(KeywordExtractor::new(
            self.config.keywords,
            &self.config.keyword_stopwords,
        )?);
        self.keyword_extractor = Some(extractor.clone());
        Ok(extractor)
    }

    /// Build the record table.
    ///
    /// Every HTML page of the crawl becomes one active record. When both URL
    /// lists are given, URLs present only in the previous list are appended
    /// as deleted records. Records sharing a URL collapse to the latest
    /// capture. The result is cached; later calls return it unchanged.
    ///
    /// # Arguments
    ///
    /// * `urls_file` - Current list of site URLs, one per line
    /// * `previous_urls_file` - The list from the previous crawl
    /// * `progress` - Receives the URL of each page as it finishes
    #[instrument(skip(self, progress), fields(wacz = %self.wacz_input_file))]
    pub async fn generate_records(
        &mut self,
        urls_file: Option<&str>,
        previous_urls_file: Option<&str>,
        progress: Option<mpsc::Sender<String>>,
    ) -> Result<&RecordSet, RecordsError> {
        if self.records.is_none() {
            let records = self
                .build_records(urls_file, previous_urls_file, progress)
                .await?;
            self.records = Some(records);
        }
        Ok(&*self.records.get_or_insert_with(RecordSet::default))
    }

    /// Generate records if needed, then write them to `output_file`
    pub async fn write_records(&mut self, output_file: &str) -> Result<(), RecordsError> {
        super::OutputFormat::from_path(output_file)?;
        let records = self.generate_records(None, None, None).await?;
        records.write(output_file).await
    }

    async fn build_records(
        &mut self,
        urls_file: Option<&str>,
        previous_urls_file: Option<&str>,
        progress: Option<mpsc::Sender<String>>,
    ) -> Result<RecordSet, RecordsError> {
        let started = Instant::now();
        let mut client = WaczClient::open(&self.wacz_input_file).await?;
        let websites = client.websites()?.to_vec();
        let reader = client.reader()?;

        let keywords = if self.config.extract_fulltext_keywords {
            Some(self.keyword_extractor()?)
        } else {
            None
        };
        let enricher = RecordEnricher::new(self.config.clone(), keywords);

        let total = websites.len();
        info!(
            "Parsing {} websites with {} workers",
            total, self.config.num_workers
        );

        // Bound the number of pages parsed at once
        let semaphore = Arc::new(Semaphore::new(self.config.num_workers.max(1)));
        let parsed = Arc::new(AtomicUsize::new(0));

        let mut tasks = JoinSet::new();
        for (index, website) in websites.into_iter().enumerate() {
            let permit = semaphore.clone().acquire_owned();
            let enricher = enricher.clone();
            let mut reader = reader.clone();
            let parsed = parsed.clone();
            let progress = progress.clone();

            tasks.spawn(async move {
                let _permit = permit.await?;
                let url = website.url.clone();

                let record = tokio::task::spawn_blocking(move || {
                    enricher.enrich(&mut reader, &website)
                })
                .await??;

                let done = parsed.fetch_add(1, Ordering::SeqCst) + 1;
                if done % PROGRESS_INTERVAL == 0 {
                    debug!(
                        "{}/{} records parsed, elapsed: {:.2}s",
                        done,
                        total,
                        started.elapsed().as_secs_f64()
                    );
                }
                if let Some(progress) = progress {
                    if progress.send(url).await.is_err() {
                        debug!("Progress receiver dropped");
                    }
                }

                Ok::<(usize, CrawlRecord), RecordsError>((index, record))
            });
        }

        // Returning early drops the set, which aborts the pages still queued
        let mut slots: Vec<Option<CrawlRecord>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            let (index, record) = joined??;
            slots[index] = Some(record);
        }
        let mut records: Vec<CrawlRecord> = slots.into_iter().flatten().collect();
        client.close();

        match (urls_file, previous_urls_file) {
            (Some(urls_file), Some(previous_urls_file)) => {
                let deleted = diff_deletions(urls_file, previous_urls_file).await?;
                info!("{} URLs deleted since the previous crawl", deleted.len());
                records.extend(deleted);
            }
            (None, None) => (),
            _ => warn!("Both current and previous URL files are needed to find deletions"),
        }

        let records = dedup(records);
        info!(
            "Generated {} records in {:.2}s",
            records.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(RecordSet::new(records, &self.config))
    }
}
