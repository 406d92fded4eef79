//! Record extraction from loaded listing pages
//!
//! Works on the serialized DOM (`page.content()`) rather than live element
//! handles, so a page can be extracted without a browser and one broken
//! block costs one record instead of a CDP round-trip failure.
//!
//! Extraction is best-effort: every record block is judged on its own and
//! rejected blocks are counted and logged, never raised.

pub mod amount;
pub mod username;

use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::config::TransactionKind;
use crate::error::ExtractError;
use crate::utils::constants::{
    AMOUNT_SELECTOR, DATE_SELECTOR, DISPLAY_NAME_SELECTOR, PROFILE_LINK_SELECTOR,
    RECORD_BLOCK_SELECTOR,
};

pub use amount::Amount;
pub use username::{exclusion_reason, is_excluded_username, username_from_href};

static RECORD_BLOCK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(RECORD_BLOCK_SELECTOR).expect("BUG: hardcoded record block selector is invalid")
});

static PROFILE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(PROFILE_LINK_SELECTOR).expect("BUG: hardcoded profile link selector is invalid")
});

static DISPLAY_NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(DISPLAY_NAME_SELECTOR).expect("BUG: hardcoded display name selector is invalid")
});

static AMOUNT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(AMOUNT_SELECTOR).expect("BUG: hardcoded amount selector is invalid")
});

static DATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(DATE_SELECTOR).expect("BUG: hardcoded date selector is invalid")
});

/// A subscriber sighting, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSubscriber {
    pub username: String,
    pub display_name: String,
}

/// A purchase or tip sighting, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub username: String,
    pub amount: Amount,
    pub kind: TransactionKind,
    /// Collection date; the on-page date text is not interpreted
    pub date: NaiveDate,
}

/// Outcome of extracting one page
#[derive(Debug, Clone)]
pub struct Extraction<T> {
    /// Valid records, in page order
    pub records: Vec<T>,
    /// Record blocks on the page, including non-record entries
    pub blocks_total: usize,
    /// Blocks that looked like records of this type
    pub candidates: usize,
    /// Candidates rejected, with their block index and reason
    pub rejected: Vec<(usize, ExtractError)>,
}

impl<T> Extraction<T> {
    fn new(blocks_total: usize) -> Self {
        Self {
            records: Vec::new(),
            blocks_total,
            candidates: 0,
            rejected: Vec::new(),
        }
    }

    /// Number of successfully extracted records
    #[must_use]
    pub fn extracted(&self) -> usize {
        self.records.len()
    }

    fn reject(&mut self, index: usize, error: ExtractError) {
        log::debug!("Skipping record block {index}: {error}");
        self.rejected.push((index, error));
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Username from the block's profile link, with exclusion rules applied
fn block_username(block: ElementRef<'_>) -> Result<String, ExtractError> {
    let href = block
        .select(&PROFILE_LINK)
        .next()
        .and_then(|link| link.value().attr("href"))
        .ok_or(ExtractError::MissingProfileLink)?;

    let username = username_from_href(href)
        .ok_or_else(|| ExtractError::ExcludedUsername(href.to_string()))?;

    if let Some(reason) = exclusion_reason(&username) {
        log::trace!("Username '{username}' excluded: {reason}");
        return Err(ExtractError::ExcludedUsername(username));
    }
    Ok(username)
}

fn subscriber_from_block(block: ElementRef<'_>) -> Result<RawSubscriber, ExtractError> {
    let username = block_username(block)?;

    // A real subscriber entry always renders a display name
    let display_name = block
        .select(&DISPLAY_NAME)
        .next()
        .map(text_of)
        .filter(|name| !name.is_empty())
        .ok_or(ExtractError::MissingDisplayName)?;

    Ok(RawSubscriber {
        username,
        display_name,
    })
}

fn transaction_from_block(
    block: ElementRef<'_>,
    kind: TransactionKind,
    collected_on: NaiveDate,
) -> Result<RawTransaction, ExtractError> {
    let username = block_username(block)?;

    let amount_text = block
        .select(&AMOUNT)
        .next()
        .map(text_of)
        .ok_or(ExtractError::MissingAmount)?;
    let amount = Amount::parse(&amount_text)?;

    if block.select(&DATE).next().is_none() {
        return Err(ExtractError::MissingDate);
    }

    Ok(RawTransaction {
        username,
        amount,
        kind,
        date: collected_on,
    })
}

/// Extract subscriber records from a subscriptions listing
///
/// Blocks without a profile link are non-record entries (section headers,
/// ads) and are not counted as candidates.
#[must_use]
pub fn extract_subscribers(html: &str) -> Extraction<RawSubscriber> {
    let document = Html::parse_document(html);
    let blocks: Vec<ElementRef<'_>> = document.select(&RECORD_BLOCK).collect();
    let mut extraction = Extraction::new(blocks.len());

    for (index, block) in blocks.into_iter().enumerate() {
        if block.select(&PROFILE_LINK).next().is_none() {
            log::trace!("Block {index} has no profile link, not a subscriber entry");
            continue;
        }
        extraction.candidates += 1;

        match subscriber_from_block(block) {
            Ok(record) => extraction.records.push(record),
            Err(e) => extraction.reject(index, e),
        }
    }

    log::info!(
        "Extracted {} subscribers from {} candidate blocks ({} blocks total, {} rejected)",
        extraction.extracted(),
        extraction.candidates,
        extraction.blocks_total,
        extraction.rejected.len()
    );
    extraction
}

/// Extract purchase or tip records from a notifications listing
///
/// Every record is stamped with `collected_on`.
#[must_use]
pub fn extract_transactions(
    html: &str,
    kind: TransactionKind,
    collected_on: NaiveDate,
) -> Extraction<RawTransaction> {
    let document = Html::parse_document(html);
    let blocks: Vec<ElementRef<'_>> = document.select(&RECORD_BLOCK).collect();
    let mut extraction = Extraction::new(blocks.len());

    for (index, block) in blocks.into_iter().enumerate() {
        if block.select(&AMOUNT).next().is_none() {
            log::trace!("Block {index} has no amount field, not a {kind} entry");
            continue;
        }
        extraction.candidates += 1;

        match transaction_from_block(block, kind, collected_on) {
            Ok(record) => extraction.records.push(record),
            Err(e) => extraction.reject(index, e),
        }
    }

    log::info!(
        "Extracted {} {} transactions from {} candidate blocks ({} rejected)",
        extraction.extracted(),
        kind,
        extraction.candidates,
        extraction.rejected.len()
    );
    extraction
}
