//! Concurrent retrieval of orbital elements
//!
//! Each catalog id is fetched independently by a fixed pool of worker
//! threads. Outcomes come back in completion order over a channel and are
//! written into a slot addressed by the id's position in the request, so the
//! returned list always lines up with the input list. A failing (or
//! panicking) fetch only ever affects its own slot.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use indicatif::ProgressBar;

use super::{OrbitalElements, RelayCatalog, TleError};

/// Default number of requests in flight
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Plain-text element endpoint; `{id}` is replaced by the catalog number
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://celestrak.org/NORAD/elements/gp.php?CATNR={id}&FORMAT=TLE";

/// Why elements for one catalog id could not be obtained
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, timeout, ...)
    Http { message: String },

    /// Server answered with a non-success status
    Status { code: u16 },

    /// Response did not contain a pair of element lines
    MissingElements,

    /// Element lines were present but malformed
    Invalid(TleError),

    /// The fetch task panicked
    Panicked { message: String },

    /// No worker reported back for this request
    Abandoned,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http { message } => write!(f, "request failed: {}", message),
            Self::Status { code } => write!(f, "HTTP {}", code),
            Self::MissingElements => write!(f, "no TLE in response"),
            Self::Invalid(e) => write!(f, "malformed TLE: {}", e),
            Self::Panicked { message } => write!(f, "fetch task panicked: {}", message),
            Self::Abandoned => write!(f, "fetch task never reported"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

/// Unvalidated element lines as returned by a fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawElements {
    pub line1: String,
    pub line2: String,
}

/// Something that can look up the raw element lines of one catalog object
pub trait ElementFetcher: Sync {
    fn fetch_raw(&self, catalog_id: u32) -> Result<RawElements, FetchError>;
}

/// Retrieval settings
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum requests in flight
    pub concurrency: usize,

    /// URL with an `{id}` placeholder
    pub url_template: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Fetches element lines over HTTP
pub struct HttpElementFetcher {
    client: reqwest::blocking::Client,
    url_template: String,
}

impl HttpElementFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("attenuation-calc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Http {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url_template: config.url_template.clone(),
        })
    }

    fn url_for(&self, catalog_id: u32) -> String {
        self.url_template.replace("{id}", &catalog_id.to_string())
    }
}

impl ElementFetcher for HttpElementFetcher {
    fn fetch_raw(&self, catalog_id: u32) -> Result<RawElements, FetchError> {
        let url = self.url_for(catalog_id);
        log::trace!("GET {}", url);

        let response = self.client.get(&url).send().map_err(|e| FetchError::Http {
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                code: response.status().as_u16(),
            });
        }

        let body = response.text().map_err(|e| FetchError::Http {
            message: format!("Read failed: {}", e),
        })?;

        extract_element_lines(&body).ok_or(FetchError::MissingElements)
    }
}

/// Find the first "1 ..." line immediately followed by a "2 ..." line
pub fn extract_element_lines(text: &str) -> Option<RawElements> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    lines.windows(2).find_map(|pair| {
        if pair[0].starts_with("1 ") && pair[1].starts_with("2 ") {
            Some(RawElements {
                line1: pair[0].to_string(),
                line2: pair[1].to_string(),
            })
        } else {
            None
        }
    })
}

/// Result of retrieving one catalog id
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub catalog_id: u32,
    pub result: Result<OrbitalElements, FetchError>,
}

/// Bounded-concurrency retrieval of a list of catalog ids
pub struct ElementRetrieval {
    concurrency: usize,
    progress: ProgressBar,
}

impl ElementRetrieval {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report each settled request on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch every id; returns exactly one outcome per id, in request order.
    ///
    /// Blocks until every request has settled.
    pub fn run<F>(&self, ids: &[u32], fetcher: &F) -> Vec<FetchOutcome>
    where
        F: ElementFetcher + ?Sized,
    {
        let workers = self.concurrency.min(ids.len());
        let mut slots: Vec<Option<FetchOutcome>> = (0..ids.len()).map(|_| None).collect();
        let next = AtomicUsize::new(0);
        let (result_tx, result_rx) = mpsc::channel::<(usize, FetchOutcome)>();

        log::info!(
            "Fetching elements for {} satellites ({} workers)",
            ids.len(),
            workers
        );

        thread::scope(|scope| {
            for _ in 0..workers {
                let result_tx = result_tx.clone();
                let next = &next;
                scope.spawn(move || loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(&catalog_id) = ids.get(index) else {
                        break;
                    };
                    let outcome = fetch_one(fetcher, catalog_id);
                    if result_tx.send((index, outcome)).is_err() {
                        break;
                    }
                });
            }
            drop(result_tx);

            for (index, outcome) in result_rx {
                if let Err(e) = &outcome.result {
                    log::warn!(
                        "Satellite #{} generated an exception: {}",
                        outcome.catalog_id,
                        e
                    );
                }
                self.progress.inc(1);
                slots[index] = Some(outcome);
            }
        });

        self.progress.finish_and_clear();

        slots
            .into_iter()
            .zip(ids)
            .map(|(slot, &catalog_id)| {
                slot.unwrap_or(FetchOutcome {
                    catalog_id,
                    result: Err(FetchError::Abandoned),
                })
            })
            .collect()
    }
}

/// Fetch with the default pool size and no progress display
pub fn fetch_elements<F>(ids: &[u32], fetcher: &F) -> Vec<FetchOutcome>
where
    F: ElementFetcher + ?Sized,
{
    ElementRetrieval::new(DEFAULT_CONCURRENCY).run(ids, fetcher)
}

fn fetch_one<F>(fetcher: &F, catalog_id: u32) -> FetchOutcome
where
    F: ElementFetcher + ?Sized,
{
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let raw = fetcher.fetch_raw(catalog_id)?;
        OrbitalElements::parse_for(catalog_id, &raw.line1, &raw.line2).map_err(FetchError::Invalid)
    }))
    .unwrap_or_else(|payload| {
        Err(FetchError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    });

    FetchOutcome { catalog_id, result }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Outcomes split into usable elements and per-id failures
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Successfully retrieved elements, in request order
    pub elements: Vec<OrbitalElements>,
    /// Failed catalog ids with their reason, in request order
    pub failures: Vec<(u32, FetchError)>,
}

impl FetchReport {
    pub fn from_outcomes(outcomes: Vec<FetchOutcome>) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            match outcome.result {
                Ok(elements) => report.elements.push(elements),
                Err(e) => report.failures.push((outcome.catalog_id, e)),
            }
        }
        report
    }

    /// Relays available to the trajectory computation
    pub fn catalog(&self) -> RelayCatalog {
        self.elements.iter().cloned().collect()
    }
}
