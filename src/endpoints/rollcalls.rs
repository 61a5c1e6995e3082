use super::PollError;
use crate::Session;
use serde_derive::Deserialize;

/// Get every roll-call the logged in student can currently see.
pub async fn rollcalls(
    session: &Session,
) -> Result<Vec<RollCallEntry>, PollError> {
    let url = session.rollcalls_url()?;
    let response = super::get(session.client(), url).await?;

    let body = response.text().await?;
    log::trace!("Response: {}", body);

    let doc: Document = serde_json::from_str(&body)?;
    log::trace!("Parsed response: {:#?}", doc);

    Ok(doc.rollcalls)
}

/// A single roll-call as reported by the attendance app.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RollCallEntry {
    #[serde(default)]
    pub course_title: String,
    /// The server-side identifier, `0` when the roll-call has none.
    #[serde(default)]
    pub rollcall_id: u64,
    #[serde(default)]
    pub is_expired: bool,
    /// The student's status, e.g. `"absent"` or `"on_call"`.
    #[serde(default)]
    pub status: String,
    /// The roll-call's own status, e.g. `"in_progress"`.
    #[serde(default)]
    pub rollcall_status: String,
}

impl RollCallEntry {
    /// Is this a roll-call the student still needs to check in to?
    pub fn is_open(&self) -> bool {
        self.rollcall_status == "in_progress"
            && self.status == "absent"
            && !self.is_expired
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Document {
    #[serde(default)]
    rollcalls: Vec<RollCallEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_a_rollcall_listing() {
        let src = r#"{
            "rollcalls": [
                {
                    "avatar_big_url": "",
                    "class_name": "",
                    "course_id": 61234,
                    "course_title": "University Physics",
                    "created_by_name": "Dr. Chen",
                    "is_expired": false,
                    "is_number": true,
                    "rollcall_id": 141798,
                    "rollcall_status": "in_progress",
                    "status": "absent"
                }
            ]
        }"#;
        let should_be = vec![RollCallEntry {
            course_title: String::from("University Physics"),
            rollcall_id: 141798,
            is_expired: false,
            status: String::from("absent"),
            rollcall_status: String::from("in_progress"),
        }];

        let got: Document = serde_json::from_str(src).unwrap();

        assert_eq!(got.rollcalls, should_be);
        assert!(got.rollcalls[0].is_open());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let src = r#"{"rollcalls": [{"course_title": "Calculus"}]}"#;

        let got: Document = serde_json::from_str(src).unwrap();

        assert_eq!(got.rollcalls[0].rollcall_id, 0);
        assert!(!got.rollcalls[0].is_open());
    }

    #[test]
    fn empty_document() {
        let got: Document = serde_json::from_str("{}").unwrap();

        assert!(got.rollcalls.is_empty());
    }
}
