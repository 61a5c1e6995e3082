use super::{LoginError, MissingFields};
use crate::Session;
use scraper::{Html, Selector};

/// Fetch the login page and pull out the hidden fields the login form needs.
pub async fn login_page(
    session: &Session,
) -> Result<LoginPageFields, LoginError> {
    let url = session.login_url()?;
    let response = super::get(session.client(), url).await?;

    let body = response.text().await?;
    log::trace!("Response: {}", body);

    LoginPageFields::parse(&body)
}

/// The hidden values embedded in the login page.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginPageFields {
    /// The password encryption salt.
    pub salt: String,
    /// The CAS flow's `execution` token.
    pub execution: String,
    /// The login ticket, empty when the page doesn't have one.
    pub login_token: String,
}

impl LoginPageFields {
    pub fn parse(html: &str) -> Result<Self, LoginError> {
        let doc = Html::parse_document(html);

        let salt = input_value(&doc, "#pwdEncryptSalt")?;
        match salt {
            Some(ref salt) => log::info!("Found the encryption salt, salt={}", salt),
            None => log::error!("The login page has no encryption salt"),
        }

        let execution = input_value(&doc, "input[name='execution']")?;
        match execution {
            Some(ref execution) => {
                log::info!("Found the execution token, execution={}", execution)
            },
            None => log::error!("The login page has no execution token"),
        }

        let login_token =
            input_value(&doc, "input[name='lt']")?.unwrap_or_default();
        log::debug!("Login ticket, lt={:?}", login_token);

        match (salt, execution) {
            (Some(salt), Some(execution)) => Ok(LoginPageFields {
                salt,
                execution,
                login_token,
            }),
            (salt, execution) => {
                let mut fields = Vec::new();
                if salt.is_none() {
                    fields.push("pwdEncryptSalt");
                }
                if execution.is_none() {
                    fields.push("execution");
                }

                Err(MissingFields { fields }.into())
            },
        }
    }
}

/// The `value` attribute of the first element matching `selector`, treating
/// an empty value the same as a missing one.
fn input_value(
    doc: &Html,
    selector: &str,
) -> Result<Option<String>, LoginError> {
    let selector = Selector::parse(selector)
        .map_err(|e| LoginError::Parse(e.to_string()))?;

    let value = doc
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("value"))
        .filter(|value| !value.is_empty())
        .map(String::from);

    Ok(value)
}
