use crate::model::{apply_field, generate_id, Id, Timestamp};
use serde::{Deserialize, Serialize};

/// A comment left on a validation test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Id,
    pub test_id: Id,
    pub author: String,
    pub text: String,
    pub approved: bool,
    pub creation_date: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub text: String,
}

impl NewComment {
    pub fn into_record(self, test_id: Id, author: String, now: Timestamp) -> Comment {
        Comment {
            id: generate_id(),
            test_id,
            author,
            text: self.text,
            approved: false,
            creation_date: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub approved: Option<bool>,
}

impl Comment {
    pub fn apply_patch(&mut self, patch: CommentPatch) {
        apply_field(&mut self.text, patch.text);
        apply_field(&mut self.approved, patch.approved);
    }
}

/// An issue raised against a validation test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Id,
    pub test_id: Id,
    pub author: String,
    pub title: String,
    pub text: String,
    pub creation_date: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl NewTicket {
    pub fn into_record(self, test_id: Id, author: String, now: Timestamp) -> Ticket {
        Ticket {
            id: generate_id(),
            test_id,
            author,
            title: self.title,
            text: self.text,
            creation_date: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Ticket {
    pub fn apply_patch(&mut self, patch: TicketPatch) {
        apply_field(&mut self.title, patch.title);
        apply_field(&mut self.text, patch.text);
    }
}
