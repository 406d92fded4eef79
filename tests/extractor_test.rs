//! Extraction against fixture listings

use chrono::NaiveDate;
use fanledger::{Amount, ExtractError, TransactionKind, extract_subscribers, extract_transactions};

mod common;
use common::{header_block, listing_page, subscriber_block, transaction_block};

fn collected_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

#[test]
fn five_blocks_with_a_header_and_a_placeholder_yield_three_subscribers() {
    let html = listing_page(&[
        subscriber_block("alice", "Alice A."),
        header_block("Today"),
        subscriber_block("bob_88", "Bob"),
        subscriber_block("u123", "Placeholder"),
        subscriber_block("carol", "Carol C."),
    ]);

    let extraction = extract_subscribers(&html);

    let usernames: Vec<&str> = extraction.records.iter().map(|r| r.username.as_str()).collect();
    assert_eq!(usernames, vec!["alice", "bob_88", "carol"]);
    assert_eq!(extraction.blocks_total, 5);
    assert_eq!(extraction.candidates, 4);
    assert_eq!(extraction.extracted(), 3);
    assert_eq!(
        extraction.rejected,
        vec![(3, ExtractError::ExcludedUsername("u123".to_string()))]
    );
    assert_eq!(extraction.records[0].display_name, "Alice A.");
}

#[test]
fn reserved_short_and_numeric_names_are_excluded() {
    let html = listing_page(&[
        subscriber_block("my", "Reserved"),
        subscriber_block("notifications", "Reserved"),
        subscriber_block("ab", "Too short"),
        subscriber_block("123456", "Numeric"),
        subscriber_block("u98765", "Placeholder"),
        subscriber_block("dave", "Dave"),
    ]);

    let extraction = extract_subscribers(&html);

    assert_eq!(extraction.extracted(), 1);
    assert_eq!(extraction.records[0].username, "dave");
    assert_eq!(extraction.rejected.len(), 5);
}

#[test]
fn user_prefixed_real_names_are_kept() {
    // Only `u` followed by digits is a placeholder
    let html = listing_page(&[
        subscriber_block("ursula", "Ursula"),
        subscriber_block("u2fan", "Fan"),
    ]);

    let extraction = extract_subscribers(&html);

    assert_eq!(extraction.extracted(), 2);
}

#[test]
fn subscriber_without_display_name_is_rejected() {
    let html = listing_page(&[
        subscriber_block("erin", ""),
        subscriber_block("frank", "Frank"),
    ]);

    let extraction = extract_subscribers(&html);

    assert_eq!(extraction.extracted(), 1);
    assert_eq!(extraction.rejected, vec![(0, ExtractError::MissingDisplayName)]);
}

#[test]
fn transactions_parse_amounts_and_stamp_the_collection_date() {
    let html = listing_page(&[
        transaction_block("alice", "$9.99", "Jan 1"),
        transaction_block("bob_88", "$1,234.50", "yesterday"),
        transaction_block("carol", " € 5 ", "Dec 30"),
    ]);

    let extraction = extract_transactions(&html, TransactionKind::Tip, collected_on());

    assert_eq!(extraction.extracted(), 3);
    let amounts: Vec<i64> = extraction.records.iter().map(|r| r.amount.cents()).collect();
    assert_eq!(amounts, vec![999, 123_450, 500]);
    assert!(extraction.records.iter().all(|r| r.date == collected_on()));
    assert!(extraction.records.iter().all(|r| r.kind == TransactionKind::Tip));
}

#[test]
fn one_bad_amount_does_not_abort_the_batch() {
    let html = listing_page(&[
        transaction_block("alice", "$9.99", "Jan 1"),
        transaction_block("bob_88", "free", "Jan 1"),
        transaction_block("carol", "$12", "Jan 1"),
    ]);

    let extraction = extract_transactions(&html, TransactionKind::Purchase, collected_on());

    assert_eq!(extraction.candidates, 3);
    assert_eq!(extraction.extracted(), 2);
    assert_eq!(
        extraction.rejected,
        vec![(1, ExtractError::InvalidAmount("free".to_string()))]
    );
    assert_eq!(extraction.records[1].amount, Amount::from_cents(1200));
}

#[test]
fn blocks_without_amount_are_not_transactions() {
    let html = listing_page(&[
        header_block("Earlier"),
        subscriber_block("alice", "Alice"),
        transaction_block("bob_88", "$3.00", "Jan 1"),
    ]);

    let extraction = extract_transactions(&html, TransactionKind::Purchase, collected_on());

    assert_eq!(extraction.blocks_total, 3);
    assert_eq!(extraction.candidates, 1);
    assert_eq!(extraction.extracted(), 1);
}

#[test]
fn transaction_without_date_element_is_rejected() {
    let html = listing_page(&[
        r#"<div class="table-item"><a href="/profile/gina">gina</a><div class="amount">$4</div></div>"#
            .to_string(),
    ]);

    let extraction = extract_transactions(&html, TransactionKind::Tip, collected_on());

    assert_eq!(extraction.extracted(), 0);
    assert_eq!(extraction.rejected, vec![(0, ExtractError::MissingDate)]);
}

#[test]
fn empty_page_extracts_nothing() {
    let html = listing_page(&[]);
    assert_eq!(extract_subscribers(&html).extracted(), 0);
    assert_eq!(
        extract_transactions(&html, TransactionKind::Tip, collected_on()).candidates,
        0
    );
}
