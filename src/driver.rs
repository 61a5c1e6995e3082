//! The polling loop.

use crate::{
    endpoints::{self, LoginError},
    poller::{Poller, RollCallCodes},
    Session, Settings,
};
use std::{future::Future, time::Duration};

/// Logs in once, then keeps asking the attendance app for roll-calls until
/// it finds some (or forever, in continuous mode).
#[derive(Debug, Clone, PartialEq)]
pub struct Driver {
    idle_interval: Duration,
    cooldown_interval: Duration,
    continuous: bool,
    only_open: bool,
    max_concurrent_lookups: usize,
}

impl Driver {
    pub fn new() -> Self {
        Driver {
            idle_interval: Duration::from_secs(2),
            cooldown_interval: Duration::from_secs(200),
            continuous: false,
            only_open: false,
            max_concurrent_lookups: 1,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Driver::new()
            .idle_interval(Duration::from_secs(settings.idle_interval_secs))
            .cooldown_interval(Duration::from_secs(
                settings.cooldown_interval_secs,
            ))
            .continuous(settings.continuous)
            .only_open(settings.only_open)
            .max_concurrent_lookups(settings.max_concurrent_lookups)
    }

    /// How long to wait before asking again when nothing was found or the
    /// request failed.
    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// How long to wait after reporting codes before the next cycle. Only
    /// used in continuous mode.
    pub fn cooldown_interval(mut self, interval: Duration) -> Self {
        self.cooldown_interval = interval;
        self
    }

    /// Keep polling after the first batch of codes has been reported.
    pub fn continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    pub fn only_open(mut self, only_open: bool) -> Self {
        self.only_open = only_open;
        self
    }

    pub fn max_concurrent_lookups(mut self, max: usize) -> Self {
        self.max_concurrent_lookups = max;
        self
    }

    /// Log in, then [`poll()`][Driver::poll].
    ///
    /// A failed login is returned immediately without retrying. If
    /// `shutdown` fires while logging in, nothing is polled.
    pub async fn run<S, F>(
        &self,
        session: &Session,
        username: &str,
        password: &str,
        shutdown: S,
        on_cycle: F,
    ) -> Result<DriverOutcome, LoginError>
    where
        S: Future<Output = ()>,
        F: FnMut(&RollCallCodes),
    {
        tokio::pin!(shutdown);

        log::info!("Logging in to the single-sign-on portal");
        tokio::select! {
            login = endpoints::login(session, username, password) => {
                login?;
            },
            _ = &mut shutdown => {
                log::info!("Shutdown requested while logging in");
                return Ok(DriverOutcome::Shutdown { cycles: 0 });
            },
        }

        Ok(self.poll(session, shutdown, on_cycle).await)
    }

    /// Poll for roll-calls using an already authenticated [`Session`],
    /// passing each batch of codes to `on_cycle`.
    ///
    /// Failures are logged and retried after the idle interval. Resolves
    /// early once `shutdown` does.
    pub async fn poll<S, F>(
        &self,
        session: &Session,
        shutdown: S,
        mut on_cycle: F,
    ) -> DriverOutcome
    where
        S: Future<Output = ()>,
        F: FnMut(&RollCallCodes),
    {
        tokio::pin!(shutdown);

        let poller = Poller::new(session)
            .only_open(self.only_open)
            .max_concurrent_lookups(self.max_concurrent_lookups);
        let mut cycles = 0;

        loop {
            log::info!("Checking for roll-calls");

            let listing = tokio::select! {
                listing = poller.list_pending() => listing,
                _ = &mut shutdown => return DriverOutcome::Shutdown { cycles },
            };

            let pending = match listing {
                Ok(pending) if !pending.is_empty() => pending,
                Ok(_) => {
                    log::info!(
                        "No roll-calls need a code, retrying in {:?}",
                        self.idle_interval
                    );
                    if interrupted(self.idle_interval, &mut shutdown).await {
                        return DriverOutcome::Shutdown { cycles };
                    }
                    continue;
                },
                Err(e) => {
                    log::warn!(
                        "Unable to check for roll-calls, retrying in {:?}: {}",
                        self.idle_interval,
                        e
                    );
                    if interrupted(self.idle_interval, &mut shutdown).await {
                        return DriverOutcome::Shutdown { cycles };
                    }
                    continue;
                },
            };

            log::info!("Looking up codes for {} roll-calls", pending.len());

            let codes = tokio::select! {
                codes = poller.resolve_codes(&pending) => codes,
                _ = &mut shutdown => return DriverOutcome::Shutdown { cycles },
            };

            summarise(&codes);
            on_cycle(&codes);
            cycles += 1;

            if !self.continuous {
                return DriverOutcome::Completed(codes);
            }

            log::info!("Next check in {:?}", self.cooldown_interval);
            if interrupted(self.cooldown_interval, &mut shutdown).await {
                return DriverOutcome::Shutdown { cycles };
            }
        }
    }
}

impl Default for Driver {
    fn default() -> Self { Driver::new() }
}

/// How the polling loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverOutcome {
    /// Single-shot mode found and resolved some roll-calls.
    Completed(RollCallCodes),
    /// The shutdown signal fired after `cycles` batches were reported.
    Shutdown { cycles: usize },
}

/// Sleep for `duration`, returning `true` if `shutdown` fired first.
async fn interrupted<S>(duration: Duration, shutdown: &mut S) -> bool
where
    S: Future<Output = ()> + Unpin,
{
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown => true,
    }
}

fn summarise(codes: &RollCallCodes) {
    log::info!("=== Roll-call summary ===");

    for (title, code) in codes {
        match code {
            Some(code) => log::info!("✅ {}: number code {}", title, code),
            None => log::info!("❌ {}: no number code", title),
        }
    }
}
