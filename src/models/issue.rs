use serde::{Deserialize, Serialize};

use crate::backend::de::{lenient_string, lenient_string_opt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    #[default]
    Sales,
    Technical,
    Other,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Sales => "sales",
            IssueType::Technical => "technical",
            IssueType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(deserialize_with = "lenient_string")]
    pub issue_id: String,
    pub issue_type: String,
    #[serde(default)]
    pub issue_note: String,
    pub issue_status: String,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIssue {
    #[serde(default)]
    pub issue_type: IssueType,
    pub note: String,
}
