//! `download`: fetch the current TLE of every listed satellite

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::{ensure_writable, progress_bar};
use crate::data::{load_catalog_ids, save_tle_table};
use crate::orbit::{
    ElementRetrieval, FetchConfig, HttpElementFetcher, DEFAULT_CONCURRENCY, DEFAULT_URL_TEMPLATE,
};

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// CSV file with a `norad_id` column
    #[arg(long)]
    pub ids: PathBuf,
    /// Output TLE table
    #[arg(long, default_value = ".tle_sat")]
    pub output: PathBuf,
    /// Number of requests in flight
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
    /// Element source, `{id}` is replaced by the catalog number
    #[arg(long, default_value = DEFAULT_URL_TEMPLATE)]
    pub url_template: String,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
    /// Overwrite the output without asking
    #[arg(long)]
    pub noconfirm: bool,
}

impl DownloadArgs {
    fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            concurrency: self.concurrency,
            url_template: self.url_template.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

pub fn run_download(args: DownloadArgs) -> Result<()> {
    ensure_writable(&args.output, args.noconfirm)?;

    let table = load_catalog_ids(&args.ids)?;
    let config = args.fetch_config();
    let fetcher = HttpElementFetcher::new(&config).context("Failed to set up HTTP client")?;

    let outcomes = ElementRetrieval::new(config.concurrency)
        .with_progress(progress_bar(table.ids.len() as u64))
        .run(&table.ids, &fetcher);

    let written = save_tle_table(&args.output, &table, &outcomes)?;

    let failed: Vec<u32> = outcomes
        .iter()
        .filter(|o| o.result.is_err())
        .map(|o| o.catalog_id)
        .collect();
    if !failed.is_empty() {
        log::warn!(
            "{} of {} satellites could not be retrieved: {:?}",
            failed.len(),
            outcomes.len(),
            failed
        );
    }
    log::info!("Downloaded {} TLEs", written);

    Ok(())
}
