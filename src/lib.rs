//! Log in through a CAS-style single-sign-on portal and poll a roll-call
//! attendance API for number codes.

#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod cipher;
mod driver;
pub mod endpoints;
pub mod logging;
mod poller;
mod session;
mod settings;

pub use driver::{Driver, DriverOutcome};
pub use poller::{Pending, Poller, RollCallCode, RollCallCodes};
pub use session::{Session, SessionBuilder, SessionError};
pub use settings::{Overrides, Settings, SettingsError};

use std::time::Duration;

/// The default user agent, a mobile browser so the portal serves the same
/// pages it would to a phone.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Mobile Safari/537.36";

/// The single-sign-on portal.
pub const DEFAULT_IDP_BASE_URL: &str = "https://ids.xmu.edu.cn/";

/// The attendance app.
pub const DEFAULT_APP_BASE_URL: &str = "https://lnt.xmu.edu.cn/";

/// How long a single request may take.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
