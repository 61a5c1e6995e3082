//! The portal's and the attendance app's endpoints.

mod login;
mod login_page;
mod rollcalls;
mod student_rollcalls;

pub use login::{
    classify, login, Authenticated, Credential, LoginError, LoginOutcome,
    MissingFields, REJECTION_MARKERS,
};
pub use login_page::{login_page, LoginPageFields};
pub use rollcalls::{rollcalls, RollCallEntry};
pub use student_rollcalls::number_code;

use reqwest::{Client, Error, Response};
use url::Url;

/// Errors from the attendance app's JSON endpoints.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The HTTP client encountered an error.
    #[error("Unable to send the request")]
    HttpClient(#[from] Error),
    #[error("Unable to construct the endpoint's URL")]
    BadUrl(#[from] url::ParseError),
    /// Unable to parse the JSON in the response.
    #[error("Unable to parse the response")]
    JsonParse(#[from] serde_json::Error),
}

async fn get(client: &Client, url: Url) -> Result<Response, Error> {
    log::debug!("Sending a request to {}", url);

    let response = client.get(url).send().await?.error_for_status()?;

    log::trace!("Headers: {:#?}", response.headers());

    Ok(response)
}
