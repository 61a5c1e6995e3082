//! Turning the attendance app's roll-calls into number codes.

use crate::{
    endpoints::{self, PollError},
    Session,
};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;

/// Pending roll-calls, keyed by course title.
pub type Pending = BTreeMap<String, u64>;

/// The number code found for each course, if any.
pub type RollCallCodes = BTreeMap<String, Option<String>>;

/// The result of resolving a single roll-call.
#[derive(Debug, Clone, PartialEq)]
pub struct RollCallCode {
    pub course_title: String,
    pub code: Option<String>,
}

/// Queries the attendance app using an authenticated [`Session`].
#[derive(Debug, Clone)]
pub struct Poller<'a> {
    session: &'a Session,
    only_open: bool,
    max_concurrent_lookups: usize,
}

impl<'a> Poller<'a> {
    pub fn new(session: &'a Session) -> Self {
        Poller {
            session,
            only_open: false,
            max_concurrent_lookups: 1,
        }
    }

    /// Ignore roll-calls which aren't in progress, have expired, or the
    /// student is already checked in to.
    pub fn only_open(mut self, only_open: bool) -> Self {
        self.only_open = only_open;
        self
    }

    /// How many code lookups may be in flight at once.
    pub fn max_concurrent_lookups(mut self, max: usize) -> Self {
        self.max_concurrent_lookups = max.max(1);
        self
    }

    /// Find the roll-calls which need a code.
    ///
    /// Course titles aren't unique; when two roll-calls share a title the
    /// last one wins and a warning is logged.
    pub async fn list_pending(&self) -> Result<Pending, PollError> {
        let entries = endpoints::rollcalls(self.session).await?;
        log::debug!("The app returned {} roll-calls", entries.len());

        let mut pending = Pending::new();

        for entry in entries {
            if entry.rollcall_id == 0 || (self.only_open && !entry.is_open()) {
                continue;
            }

            log::info!(
                "Found a roll-call, course={}, rollcall_id={}",
                entry.course_title,
                entry.rollcall_id
            );

            if let Some(previous) =
                pending.insert(entry.course_title.clone(), entry.rollcall_id)
            {
                log::warn!(
                    "Two roll-calls share a course title, course={}, dropped={}, kept={}",
                    entry.course_title,
                    previous,
                    entry.rollcall_id
                );
            }
        }

        Ok(pending)
    }

    /// Look up the number code for every pending roll-call.
    ///
    /// A failed lookup is logged and recorded as `None` without affecting
    /// the other lookups.
    pub async fn resolve_codes(&self, pending: &Pending) -> RollCallCodes {
        stream::iter(pending.iter())
            .map(|(title, &id)| self.resolve(title, id))
            .buffer_unordered(self.max_concurrent_lookups)
            .map(|resolved| (resolved.course_title, resolved.code))
            .collect::<RollCallCodes>()
            .await
    }

    /// Look up the number code for a single roll-call.
    pub async fn lookup(
        &self,
        rollcall_id: u64,
    ) -> Result<Option<String>, PollError> {
        endpoints::number_code(self.session, rollcall_id).await
    }

    async fn resolve(
        &self,
        course_title: &str,
        rollcall_id: u64,
    ) -> RollCallCode {
        let code = match self.lookup(rollcall_id).await {
            Ok(Some(code)) => {
                log::info!(
                    "Found the number code, course={}, code={}",
                    course_title,
                    code
                );
                Some(code)
            },
            Ok(None) => {
                log::warn!("No number code yet, course={}", course_title);
                None
            },
            Err(e) => {
                log::warn!(
                    "Unable to look up the number code, course={}, rollcall_id={}, error={}",
                    course_title,
                    rollcall_id,
                    e
                );
                None
            },
        };

        RollCallCode {
            course_title: course_title.to_string(),
            code,
        }
    }
}
