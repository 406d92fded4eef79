//! Shared configuration constants for fanledger
//!
//! Default values and DOM selectors used throughout the codebase.

// =============================================================================
// Platform pages
// =============================================================================

/// Platform root, used for the post-attach login check
pub const PLATFORM_ROOT_URL: &str = "https://onlyfans.com";

/// Notification listing for new subscribers
pub const SUBSCRIBERS_URL: &str = "https://onlyfans.com/my/notifications/subscribed";

/// Notification listing for purchases
pub const PURCHASES_URL: &str = "https://onlyfans.com/my/notifications/purchases";

/// Notification listing for tips
pub const TIPS_URL: &str = "https://onlyfans.com/my/notifications/tip";

/// URL fragments that mean the session is not logged in
pub const AUTH_PATH_MARKERS: &[&str] = &["auth", "login"];

// =============================================================================
// Selectors
// =============================================================================

/// One notification entry on any listing page
pub const RECORD_BLOCK_SELECTOR: &str = "div.table-item";

/// Profile link inside a record block; the last path segment is the username
pub const PROFILE_LINK_SELECTOR: &str = r#"a[href^="/"][href*="/profile/"]"#;

/// Display name inside a subscriber block
pub const DISPLAY_NAME_SELECTOR: &str = "div.user-info span.name";

/// Amount inside a transaction block
pub const AMOUNT_SELECTOR: &str = "div.amount";

/// Date inside a transaction block
pub const DATE_SELECTOR: &str = "div.date";

// =============================================================================
// Broker
// =============================================================================

/// Local AdsPower-compatible broker API
pub const DEFAULT_BROKER_URL: &str = "http://localhost:50325";

pub const DEFAULT_HEALTH_PATH: &str = "/status";
pub const DEFAULT_START_PATH: &str = "/api/v1/browser/start";
pub const DEFAULT_STOP_PATH: &str = "/api/v1/browser/stop";

/// Health probe must answer within this many seconds
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;

/// Browser start request timeout
pub const DEFAULT_START_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Timing
// =============================================================================

/// Bounded wait for the URL to leave the login path
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;

/// Fixed delay after navigation to absorb client-side rendering
pub const DEFAULT_SETTLE_DELAY_SECS: u64 = 5;

/// Bounded wait for the first record block
pub const DEFAULT_ELEMENT_TIMEOUT_SECS: u64 = 20;

/// Delay between scroll-to-bottom and the height re-measure
pub const DEFAULT_SCROLL_DELAY_SECS: u64 = 2;

/// Safety cap on scroll iterations per page
pub const DEFAULT_MAX_SCROLL_ITERATIONS: u32 = 200;

/// `page.goto()` timeout
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Store
// =============================================================================

/// Subscribers older than this many days are pruned at startup
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Dashboard "recent subscribers" window
pub const DEFAULT_RECENT_DAYS: u32 = 3;

pub const DEFAULT_DATABASE_PATH: &str = "fanledger.db";
pub const DEFAULT_LOG_FILE: &str = "collector.log";

// =============================================================================
// Scheduling / dashboard
// =============================================================================

/// Local hours at which a scheduled run fires
pub const DEFAULT_SCHEDULE_HOURS: &[u32] = &[8, 16, 23];

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
