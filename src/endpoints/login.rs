use super::{login_page, LoginPageFields};
use crate::{cipher, Session};
use reqwest::{header::REFERER, Error as ReqwestError, StatusCode};
use serde_derive::Serialize;
use std::fmt::{self, Debug, Formatter};
use url::Url;

/// Text the portal puts in the login page when it refuses the credentials.
pub const REJECTION_MARKERS: &[&str] = &["用户名或密码错误", "errorMessage"];

/// How much of an unexpected response body gets copied into
/// [`LoginError::Unknown`].
const EXCERPT_LEN: usize = 200;

/// Log in through the single-sign-on portal.
///
/// On success the portal's cookies are stored in the [`Session`], so later
/// requests made with it are authenticated.
pub async fn login(
    session: &Session,
    username: &str,
    password: &str,
) -> Result<Authenticated, LoginError> {
    let fields = login_page(session).await?;
    let credential = Credential::new(username, password, &fields.salt);

    submit(session, &credential, &fields).await
}

async fn submit(
    session: &Session,
    credential: &Credential,
    fields: &LoginPageFields,
) -> Result<Authenticated, LoginError> {
    let url = session.login_url()?;
    let data = Data {
        username: &credential.username,
        password: &credential.password,
        captcha: "",
        event_id: "submit",
        lt: &fields.login_token,
        cllt: "userNameLogin",
        dllt: "generalLogin",
        execution: &fields.execution,
    };

    log::debug!("Submitting the login form to {}", url);
    log::trace!("Payload: {:#?}", data);

    let response = session
        .client()
        .post(url.clone())
        .header(REFERER, url.as_str())
        .form(&data)
        .send()
        .await?;

    let status = response.status();
    let final_url = response.url().clone();
    log::trace!("Headers: {:#?}", response.headers());

    let body = response.text().await?;
    log::trace!("Response: {}", body);

    match classify(status, &body) {
        LoginOutcome::Authenticated => {
            log::info!(
                "Logged in as {}, landed on {}",
                credential.username,
                final_url
            );
            Ok(Authenticated { final_url })
        },
        LoginOutcome::Rejected => {
            log::error!("The portal rejected the username or password");
            Err(LoginError::Rejected)
        },
        LoginOutcome::Unknown => {
            let excerpt: String = body.chars().take(EXCERPT_LEN).collect();
            log::error!(
                "Unable to tell whether the login worked, status={}, excerpt={:?}",
                status,
                excerpt
            );
            Err(LoginError::Unknown { status, excerpt })
        },
    }
}

/// Figure out how a login attempt went from the final response.
pub fn classify(status: StatusCode, body: &str) -> LoginOutcome {
    if status == StatusCode::OK {
        LoginOutcome::Authenticated
    } else if REJECTION_MARKERS.iter().any(|marker| body.contains(marker)) {
        LoginOutcome::Rejected
    } else {
        LoginOutcome::Unknown
    }
}

/// The possible results of submitting the login form.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated,
    Rejected,
    Unknown,
}

/// Proof of a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct Authenticated {
    /// Where the portal's redirects ended up.
    pub final_url: Url,
}

/// The username and the password as it will be submitted.
#[derive(Clone, PartialEq)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    /// Build the credential, encrypting the password with `salt` if the
    /// portal asked for it.
    pub fn new(username: &str, password: &str, salt: &str) -> Self {
        Credential {
            username: username.to_string(),
            password: cipher::encrypt(password, salt),
        }
    }

    pub fn username(&self) -> &str { &self.username }

    /// The value sent in the form's `password` field.
    pub fn password(&self) -> &str { &self.password }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Copy, Clone, Serialize)]
struct Data<'a> {
    username: &'a str,
    password: &'a str,
    captcha: &'a str,
    #[serde(rename = "_eventId")]
    event_id: &'a str,
    lt: &'a str,
    cllt: &'a str,
    dllt: &'a str,
    execution: &'a str,
}

impl Debug for Data<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("username", &self.username)
            .field("password", &"***")
            .field("captcha", &self.captcha)
            .field("_eventId", &self.event_id)
            .field("lt", &self.lt)
            .field("cllt", &self.cllt)
            .field("dllt", &self.dllt)
            .field("execution", &self.execution)
            .finish()
    }
}

/// Possible errors that may be returned by [`login()`].
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// The HTTP client encountered an error.
    #[error("Unable to send the login request")]
    HttpClient(#[from] ReqwestError),
    #[error("Unable to construct the login URL")]
    BadUrl(#[from] url::ParseError),
    /// Unable to parse the login page.
    #[error("Unable to parse the login page: {0}")]
    Parse(String),
    #[error(transparent)]
    MissingFields(#[from] MissingFields),
    /// The portal said the username or password is wrong.
    #[error("Login failed: incorrect username or password")]
    Rejected,
    /// The portal responded with something we don't recognise.
    #[error("Unable to tell whether the login succeeded (status {})", status)]
    Unknown { status: StatusCode, excerpt: String },
}

/// The login page didn't contain fields required to submit the form.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("The login page is missing {}", .fields.join(", "))]
pub struct MissingFields {
    pub fields: Vec<&'static str>,
}
