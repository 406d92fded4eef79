//! Username derivation and exclusion rules
//!
//! The same rules run at extraction time and during the store's startup
//! cleanup, so a name rejected here can never survive in the database.

use std::sync::LazyLock;

use regex::Regex;

/// Path segments that look like profile links but are platform pages
pub const RESERVED_USERNAMES: &[&str] = &[
    "notifications",
    "settings",
    "help",
    "create",
    "collections",
    "vault",
    "queue",
    "statistics",
    "active",
    "earnings",
    "dashboard",
    "subscribed",
    "purchases",
    "tags",
    "commented",
    "mentioned",
    "favorited",
    "message",
    "onlyfans",
];

/// Shortest username accepted
pub const MIN_USERNAME_LEN: usize = 3;

// Accounts without a chosen handle are shown as `u` followed by their id
static PLACEHOLDER_USERNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^u\d+$").expect("BUG: hardcoded placeholder regex is invalid")
});

/// Take the trailing path segment of a profile link
///
/// Accepts relative (`/profile/alice`) and absolute links; query strings,
/// fragments and trailing slashes are ignored. Returns `None` when no
/// segment is left.
#[must_use]
pub fn username_from_href(href: &str) -> Option<String> {
    let path = href
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();

    path.rsplit('/')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .filter(|segment| !segment.contains(':'))
        .map(str::to_string)
}

/// Reason a username is rejected, `None` when it is acceptable
#[must_use]
pub fn exclusion_reason(username: &str) -> Option<&'static str> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Some("too short");
    }
    if RESERVED_USERNAMES.contains(&username) {
        return Some("reserved platform name");
    }
    if username.chars().all(|c| c.is_ascii_digit()) {
        return Some("purely numeric");
    }
    if PLACEHOLDER_USERNAME.is_match(username) {
        return Some("placeholder handle");
    }
    None
}

#[must_use]
pub fn is_excluded_username(username: &str) -> bool {
    exclusion_reason(username).is_some()
}
