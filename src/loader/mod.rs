//! Page loading for infinite-scroll listings
//!
//! Navigates, waits for the first record block, then keeps scrolling to the
//! bottom until the document stops growing. The scroll loop is capped by
//! `max_scroll_iterations`.

pub mod page_timeout;

use std::future::Future;
use std::time::{Duration, Instant};

use chromiumoxide::page::Page;
use tracing::{debug, info, warn};

use self::page_timeout::with_page_timeout;
use crate::config::CollectorConfig;
use crate::error::{CollectorError, CollectorResult};
use crate::utils::constants::RECORD_BLOCK_SELECTOR;

const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight);";
const DOCUMENT_HEIGHT_JS: &str = "document.body ? document.body.scrollHeight : 0";

/// Poll interval while waiting for the first record block
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Timing knobs for one page load
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub navigation_timeout_secs: u64,
    pub settle_delay: Duration,
    pub element_timeout: Duration,
    pub scroll_delay: Duration,
    pub max_scroll_iterations: u32,
    pub record_selector: String,
}

impl LoadOptions {
    #[must_use]
    pub fn from_config(config: &CollectorConfig) -> Self {
        Self {
            navigation_timeout_secs: config.navigation_timeout_secs(),
            settle_delay: config.settle_delay(),
            element_timeout: config.element_timeout(),
            scroll_delay: config.scroll_delay(),
            max_scroll_iterations: config.max_scroll_iterations(),
            record_selector: RECORD_BLOCK_SELECTOR.to_string(),
        }
    }
}

/// How the scroll loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    /// Scroll-and-measure rounds performed
    pub iterations: u32,
    pub final_height: i64,
    /// Stopped by the iteration cap rather than a stable height
    pub capped: bool,
}

/// A fully expanded listing page
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub url: String,
    pub html: String,
    pub scroll: ScrollOutcome,
}

/// Scroll until the measured height stops increasing
///
/// `scroll` triggers one scroll-to-bottom, `measure` returns the current
/// document height. Each round waits `delay` between the two so lazy
/// content can render.
pub async fn scroll_until_stable<S, SFut, M, MFut>(
    mut scroll: S,
    mut measure: M,
    delay: Duration,
    max_iterations: u32,
) -> CollectorResult<ScrollOutcome>
where
    S: FnMut() -> SFut,
    SFut: Future<Output = CollectorResult<()>>,
    M: FnMut() -> MFut,
    MFut: Future<Output = CollectorResult<i64>>,
{
    let mut last_height = measure().await?;
    let mut iterations = 0;

    while iterations < max_iterations {
        scroll().await?;
        tokio::time::sleep(delay).await;
        let new_height = measure().await?;
        iterations += 1;

        if new_height <= last_height {
            debug!("Page height stable at {new_height}px after {iterations} scrolls");
            return Ok(ScrollOutcome {
                iterations,
                final_height: new_height,
                capped: false,
            });
        }
        last_height = new_height;
    }

    warn!(
        "Scroll cap of {max_iterations} iterations reached (height {last_height}px), \
         extracting what has loaded"
    );
    Ok(ScrollOutcome {
        iterations,
        final_height: last_height,
        capped: true,
    })
}

/// Poll for `selector` until it appears or `timeout` expires
pub async fn wait_for_records(page: &Page, url: &str, selector: &str, timeout: Duration) -> CollectorResult<()> {
    let start = Instant::now();

    loop {
        match page.find_element(selector).await {
            Ok(_) => {
                debug!("Record blocks present after {:?}", start.elapsed());
                return Ok(());
            }
            Err(_) if start.elapsed() >= timeout => {
                let current = crate::session::page_helpers::get_page_url_with_fallback(page).await;
                warn!(
                    "No '{selector}' on {url} after {timeout:?} (browser is at {current})"
                );
                return Err(CollectorError::LoadTimeout {
                    url: url.to_string(),
                    timeout,
                });
            }
            Err(_) => tokio::time::sleep(ELEMENT_POLL_INTERVAL).await,
        }
    }
}

async fn document_height(page: &Page) -> CollectorResult<i64> {
    let result = page.evaluate(DOCUMENT_HEIGHT_JS).await?;
    result
        .into_value::<i64>()
        .map_err(|e| CollectorError::Browser(format!("document height is not a number: {e}")))
}

/// Navigate to `url`, wait for records and expand the listing
///
/// `LoadTimeout` means the source should be skipped for this run; any other
/// error is a browser failure.
pub async fn load_and_expand(page: &Page, url: &str, options: &LoadOptions) -> CollectorResult<LoadedPage> {
    info!("Opening {url}");

    with_page_timeout(page.goto(url), options.navigation_timeout_secs, "Page navigation").await?;

    // Client-side rendering needs a moment before anything is queryable
    tokio::time::sleep(options.settle_delay).await;

    wait_for_records(page, url, &options.record_selector, options.element_timeout).await?;

    let scroll = scroll_until_stable(
        || async {
            page.evaluate(SCROLL_TO_BOTTOM_JS).await?;
            Ok::<(), CollectorError>(())
        },
        || document_height(page),
        options.scroll_delay,
        options.max_scroll_iterations,
    )
    .await?;

    let html = page.content().await?;
    info!(
        "Loaded {url}: {} bytes after {} scrolls{}",
        html.len(),
        scroll.iterations,
        if scroll.capped { " (capped)" } else { "" }
    );

    Ok(LoadedPage {
        url: url.to_string(),
        html,
        scroll,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    async fn run_with_heights(heights: Vec<i64>, max: u32) -> (ScrollOutcome, usize) {
        let heights = RefCell::new(heights.into_iter());
        let scrolls = RefCell::new(0usize);
        let outcome = scroll_until_stable(
            || {
                *scrolls.borrow_mut() += 1;
                async { Ok::<(), CollectorError>(()) }
            },
            || {
                let next = heights.borrow_mut().next().unwrap_or(i64::MAX);
                async move { Ok::<i64, CollectorError>(next) }
            },
            Duration::ZERO,
            max,
        )
        .await
        .expect("scroll loop");
        let count = *scrolls.borrow();
        (outcome, count)
    }

    #[tokio::test]
    async fn stops_when_height_is_stable() {
        let (outcome, scrolls) = run_with_heights(vec![1000, 2000, 3000, 3000], 50).await;
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.final_height, 3000);
        assert!(!outcome.capped);
        assert_eq!(scrolls, 3);
    }

    #[tokio::test]
    async fn single_screen_page_scrolls_once() {
        let (outcome, _) = run_with_heights(vec![800, 800], 50).await;
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.capped);
    }

    #[tokio::test]
    async fn shrinking_height_counts_as_stable() {
        let (outcome, _) = run_with_heights(vec![1000, 1500, 1200], 50).await;
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.final_height, 1200);
    }

    #[tokio::test]
    async fn endless_growth_hits_the_cap() {
        let heights: Vec<i64> = (1..=100).map(|i| i * 100).collect();
        let (outcome, scrolls) = run_with_heights(heights, 5).await;
        assert!(outcome.capped);
        assert_eq!(outcome.iterations, 5);
        assert_eq!(scrolls, 5);
        assert_eq!(outcome.final_height, 600);
    }
}
