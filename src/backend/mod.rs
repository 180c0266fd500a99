//! Backend protocol: one POST endpoint taking `{ function, data }` and answering
//! `{ status, data?, message? }`.

pub mod api;
pub mod de;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::de::lenient_string_opt;
use crate::error::AppError;

pub use api::{ApprovedRide, DriverApi, EndedRide, PendingRide};
pub use http::HttpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetRideHistory,
    GetVehiclesByToken,
    UpdateVehicleLocation,
    FindRide,
    ApproveRide,
    RejectRide,
    StartRide,
    EndRide,
    CreateDriver,
    VerifyOtpDriver,
    SubmitIssue,
    GetIssueList,
}

impl Operation {
    /// Function name expected by the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::GetRideHistory => "GetRideHistory",
            Operation::GetVehiclesByToken => "getVehiclesByToken",
            Operation::UpdateVehicleLocation => "UpdateVehicleLocation",
            Operation::FindRide => "FindRide",
            Operation::ApproveRide => "ApproveRide",
            Operation::RejectRide => "RejectRide",
            Operation::StartRide => "StartRide",
            Operation::EndRide => "EndRide",
            Operation::CreateDriver => "CreateDriver",
            Operation::VerifyOtpDriver => "VerifyOtpDriver",
            Operation::SubmitIssue => "SubmitIssue",
            Operation::GetIssueList => "GetIssueList",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a> {
    pub function: &'a str,
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub status: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub login_token: Option<String>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }

    /// The `data` member of a successful response, `Null` when absent.
    pub fn into_data(self) -> Result<Value, AppError> {
        if !self.is_success() {
            return Err(self.rejection());
        }
        Ok(self.data.unwrap_or(Value::Null))
    }

    pub fn rejection(&self) -> AppError {
        AppError::Rejected(
            self.message
                .clone()
                .unwrap_or_else(|| format!("status {}", self.status)),
        )
    }
}

/// Sends one operation to the backend and returns its decoded envelope.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    async fn call(&self, operation: Operation, data: Value) -> Result<Envelope, AppError>;
}

/// The span from the first `{` to the last `}` of a raw response body.
pub fn extract_json(raw: &str) -> Result<&str, AppError> {
    let start = raw
        .find('{')
        .ok_or_else(|| AppError::MalformedResponse("no JSON object in response".to_string()))?;
    let end = raw
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| AppError::MalformedResponse("unterminated JSON object".to_string()))?;
    Ok(&raw[start..=end])
}

/// The first brace-balanced object, skipping braces inside string literals.
fn first_balanced_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in raw[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses a response body that may carry diagnostic text around the JSON.
pub fn parse_envelope(raw: &str) -> Result<Envelope, AppError> {
    let span = extract_json(raw)?;
    match serde_json::from_str(span) {
        Ok(envelope) => Ok(envelope),
        Err(err) => first_balanced_object(raw)
            .and_then(|object| serde_json::from_str(object).ok())
            .ok_or_else(|| AppError::MalformedResponse(err.to_string())),
    }
}
