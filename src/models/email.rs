//! Drafted outreach emails.

use serde::{Deserialize, Serialize};

/// Email drafted for a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EmailDraft {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub to_email: String,
}

impl EmailDraft {
    /// True when the model produced neither subject nor body.
    pub fn is_empty(&self) -> bool {
        self.subject.trim().is_empty() && self.body.trim().is_empty()
    }

    /// Fill in the recipient if the model left it blank.
    pub fn with_default_recipient(mut self, to_email: &str) -> Self {
        if self.to_email.trim().is_empty() {
            self.to_email = to_email.to_string();
        }
        self
    }
}
