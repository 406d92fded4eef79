//! Browser sessions obtained from the broker
//!
//! [`SessionBroker`] hands out live sessions; [`BrowserSession`] is what a
//! collection run needs from one. The Chrome implementation lives in
//! [`chrome`]; tests plug in fakes.

pub mod chrome;
pub mod page_helpers;

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::CollectorResult;
use crate::loader::{LoadOptions, LoadedPage};

pub use chrome::{ChromeBroker, ChromeSession};

/// A live, attached browser
pub trait BrowserSession: Send {
    /// Navigate to `root_url` and wait until the URL leaves the login path
    ///
    /// Fails with `AuthRequired` when `timeout` expires first.
    fn verify_authenticated(
        &mut self,
        root_url: &str,
        timeout: Duration,
    ) -> impl Future<Output = CollectorResult<()>> + Send;

    /// Load a listing page and expand it to its full length
    fn load_and_expand(
        &mut self,
        url: &str,
        options: &LoadOptions,
    ) -> impl Future<Output = CollectorResult<LoadedPage>> + Send;

    /// Close the session; errors are logged, never returned
    fn release(self) -> impl Future<Output = ()> + Send;
}

/// Source of browser sessions for one profile
pub trait SessionBroker: Send + Sync {
    /// `'static` so a cancelled run can hand the session to a release task
    type Session: BrowserSession + 'static;

    /// Probe the broker, start the profile's browser and attach to it
    fn open_session(
        &self,
        profile_id: &str,
    ) -> impl Future<Output = CollectorResult<Self::Session>> + Send;
}

/// Open a session and confirm it is signed in
///
/// On an auth failure the session is released before the error is
/// returned, so the caller only ever owns a verified session.
pub async fn acquire_session<B: SessionBroker>(
    broker: &B,
    profile_id: &str,
    root_url: &str,
    auth_timeout: Duration,
) -> CollectorResult<B::Session> {
    let mut session = broker.open_session(profile_id).await?;

    match session.verify_authenticated(root_url, auth_timeout).await {
        Ok(()) => {
            info!("Session for profile {profile_id} is signed in");
            Ok(session)
        }
        Err(e) => {
            warn!("Session for profile {profile_id} failed verification: {e}");
            session.release().await;
            Err(e)
        }
    }
}
