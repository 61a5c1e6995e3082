use super::PollError;
use crate::Session;
use serde_derive::Deserialize;

/// Look up the number code for a roll-call.
///
/// Returns `None` when the app hasn't published a code.
pub async fn number_code(
    session: &Session,
    rollcall_id: u64,
) -> Result<Option<String>, PollError> {
    let url = session.student_rollcalls_url(rollcall_id)?;
    let response = super::get(session.client(), url).await?;

    let body = response.text().await?;
    log::trace!("Response: {}", body);

    let doc: Document = serde_json::from_str(&body)?;

    Ok(doc.number_code.and_then(NumberCode::into_code))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Document {
    #[serde(default)]
    number_code: Option<NumberCode>,
}

/// The app normally sends the code as a string, but some deployments send a
/// bare number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum NumberCode {
    Text(String),
    Number(u64),
}

impl NumberCode {
    fn into_code(self) -> Option<String> {
        let code = match self {
            NumberCode::Text(text) => text.trim().to_string(),
            NumberCode::Number(n) => n.to_string(),
        };

        if code.is_empty() {
            None
        } else {
            Some(code)
        }
    }
}
