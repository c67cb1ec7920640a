//! Bounded-time polling search.
//!
//! The tree changes underneath the test, so a search is repeated until it
//! yields something or its deadline passes. A timeout of zero still performs
//! one attempt.

use crate::result::{ProbeError, ProbeResult};
use crate::settings::Settings;
use crate::strategy::{Attempt, By};
use crate::tree::{Node, TreeProvider};
use std::fmt;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Options for polling searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Sleep between attempts in milliseconds; 0 polls back to back
    pub poll_interval_ms: u64,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            poll_interval_ms: 0,
        }
    }
}

impl PollOptions {
    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }
}

impl From<&Settings> for PollOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            poll_interval_ms: settings.poll_interval_ms,
        }
    }
}

/// Polls search strategies against a provider until a deadline
#[derive(Clone)]
pub struct RetryingLocator {
    provider: Rc<dyn TreeProvider>,
    options: PollOptions,
}

impl fmt::Debug for RetryingLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingLocator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RetryingLocator {
    /// Create a locator over `provider`
    #[must_use]
    pub fn new(provider: Rc<dyn TreeProvider>, options: PollOptions) -> Self {
        Self { provider, options }
    }

    /// The provider searched
    #[must_use]
    pub fn provider(&self) -> &Rc<dyn TreeProvider> {
        &self.provider
    }

    /// Polling options
    #[must_use]
    pub const fn options(&self) -> PollOptions {
        self.options
    }

    /// First node under `root` matching `strategy`, or `None` once
    /// `timeout_ms` has elapsed
    pub fn find_first(&self, root: &Node, strategy: &By, timeout_ms: u64) -> ProbeResult<Option<Node>> {
        let query = strategy.prepare()?;
        self.poll(strategy, timeout_ms, || query.first(&self.provider, root))
    }

    /// All nodes under `root` matching `strategy` from the first non-empty
    /// attempt, or an empty vector once `timeout_ms` has elapsed
    pub fn find_all(&self, root: &Node, strategy: &By, timeout_ms: u64) -> ProbeResult<Vec<Node>> {
        let query = strategy.prepare()?;
        Ok(self
            .poll(strategy, timeout_ms, || query.all(&self.provider, root))?
            .unwrap_or_default())
    }

    fn poll<T>(
        &self,
        strategy: &By,
        timeout_ms: u64,
        mut attempt: impl FnMut() -> ProbeResult<Attempt<T>>,
    ) -> ProbeResult<Option<T>> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let poll_interval = Duration::from_millis(self.options.poll_interval_ms);
        let mut attempts = 0_u32;

        loop {
            attempts += 1;
            match attempt() {
                Ok(Attempt::Hit(found)) => {
                    trace!(%strategy, attempts, elapsed_ms = start.elapsed().as_millis() as u64, "search hit");
                    return Ok(Some(found));
                }
                Ok(Attempt::Unselectable) => return Ok(None),
                Ok(Attempt::Miss) => {}
                Err(ProbeError::ElementNotAvailable { element }) => {
                    trace!(%strategy, %element, "search root unavailable, retrying");
                }
                Err(e) => return Err(e),
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                break;
            }
            if !poll_interval.is_zero() {
                thread::sleep(poll_interval.min(timeout - elapsed));
            }
        }

        debug!(%strategy, attempts, timeout_ms, "search timed out");
        Ok(None)
    }
}
