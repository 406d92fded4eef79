//! Small `Page` helpers with diagnostic fallbacks

use chromiumoxide::page::Page;
use tracing::trace;

use crate::utils::constants::AUTH_PATH_MARKERS;

/// Current page URL, or `"about:blank"` when it cannot be read
///
/// Browser communication errors and a not-yet-navigated page are both
/// reported as `about:blank` so log lines stay readable.
pub async fn get_page_url_with_fallback(page: &Page) -> String {
    match page.url().await {
        Ok(Some(url)) => url,
        Ok(None) => {
            trace!("Page URL is None (page not yet navigated)");
            "about:blank".to_string()
        }
        Err(e) => {
            trace!("Failed to get page URL (browser communication error): {}", e);
            "about:blank".to_string()
        }
    }
}

/// Whether `url` shows a signed-in platform page
///
/// A blank or unparseable URL means navigation has not settled yet. Any URL
/// whose path mentions an auth/login marker is the sign-in flow.
#[must_use]
pub fn is_past_auth(url: &str) -> bool {
    if url.is_empty() || url.starts_with("about:") {
        return false;
    }
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_ascii_lowercase();
    !AUTH_PATH_MARKERS.iter().any(|marker| path.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_page_is_not_signed_in() {
        assert!(!is_past_auth("about:blank"));
        assert!(!is_past_auth(""));
        assert!(!is_past_auth("not a url"));
    }

    #[test]
    fn login_paths_are_not_signed_in() {
        assert!(!is_past_auth("https://onlyfans.com/auth"));
        assert!(!is_past_auth("https://onlyfans.com/login?next=/my"));
        assert!(!is_past_auth("https://onlyfans.com/auth/2fa"));
    }

    #[test]
    fn platform_pages_are_signed_in() {
        assert!(is_past_auth("https://onlyfans.com/"));
        assert!(is_past_auth("https://onlyfans.com/my/subscribers/active"));
        assert!(is_past_auth("https://onlyfans.com/my/notifications/tip"));
    }
}
