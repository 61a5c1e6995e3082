use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// How many redirects we'll follow after submitting the login form before
/// giving up.
const MAX_REDIRECTS: usize = 10;

/// One browser-like session with the single-sign-on portal and the
/// attendance app.
///
/// Cookies set by the portal during login are remembered by the underlying
/// [`Client`] and sent with every later request, so the same [`Session`]
/// must be used for logging in and polling.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    idp: Url,
    app: Url,
}

impl Session {
    pub fn builder() -> SessionBuilder { SessionBuilder::default() }

    /// Wrap an existing [`Client`]. It should have a cookie store enabled.
    pub fn from_client(client: Client, idp: Url, app: Url) -> Self {
        Session { client, idp, app }
    }

    pub fn client(&self) -> &Client { &self.client }

    /// The login page, also used as the login form's action and `Referer`.
    pub fn login_url(&self) -> Result<Url, url::ParseError> {
        self.idp.join("authserver/login")
    }

    /// The endpoint listing every roll-call the student can see.
    pub fn rollcalls_url(&self) -> Result<Url, url::ParseError> {
        let mut url = self.app.join("api/radar/rollcalls")?;
        url.query_pairs_mut().append_pair("api_version", "1.1.0");
        Ok(url)
    }

    /// The endpoint holding the student's view of a single roll-call.
    pub fn student_rollcalls_url(
        &self,
        rollcall_id: u64,
    ) -> Result<Url, url::ParseError> {
        self.app
            .join(&format!("api/rollcall/{}/student_rollcalls", rollcall_id))
    }
}

/// Configures a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    user_agent: String,
    timeout: Duration,
    idp: String,
    app: String,
}

impl SessionBuilder {
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The timeout applied to each request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The base URL of the single-sign-on portal.
    pub fn idp_base_url(mut self, url: impl Into<String>) -> Self {
        self.idp = url.into();
        self
    }

    /// The base URL of the attendance app.
    pub fn app_base_url(mut self, url: impl Into<String>) -> Self {
        self.app = url.into();
        self
    }

    pub fn build(self) -> Result<Session, SessionError> {
        let idp = base_url(&self.idp)?;
        let app = base_url(&self.app)?;

        let client = Client::builder()
            .user_agent(self.user_agent)
            .cookie_store(true)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .build()?;

        log::debug!("Created a session for {} and {}", idp, app);

        Ok(Session::from_client(client, idp, app))
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        SessionBuilder {
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
            timeout: crate::DEFAULT_TIMEOUT,
            idp: crate::DEFAULT_IDP_BASE_URL.to_string(),
            app: crate::DEFAULT_APP_BASE_URL.to_string(),
        }
    }
}

/// Parse a base URL, making sure it ends in a `/` so [`Url::join()`] appends
/// to it instead of replacing the last segment.
fn base_url(raw: &str) -> Result<Url, SessionError> {
    let mut url = Url::parse(raw).map_err(|source| SessionError::BadUrl {
        url: raw.to_string(),
        source,
    })?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Errors that may occur while creating a [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("\"{}\" isn't a valid base URL", url)]
    BadUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Unable to create the HTTP client")]
    HttpClient(#[from] reqwest::Error),
}
