//! Response envelope and wire serialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::BodyFormat;
use crate::http::request::Request;

/// Protocol token of the status line.
pub const PROTOCOL: &str = "HTTP/1.1";

/// The instruction echoed back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub instruction_path: String,
    pub parameters: BTreeMap<String, String>,
}

/// Structured reply: `{status, code, response}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: Option<String>,
    pub code: u16,
    pub response: Option<Instruction>,
}

impl ResponseEnvelope {
    /// Success envelope echoing `request`.
    pub fn ok(request: &Request) -> Self {
        Self {
            status: Some(request.instruction_path.clone()),
            code: 200,
            response: Some(Instruction {
                instruction_path: request.instruction_path.clone(),
                parameters: request.parameters.clone(),
            }),
        }
    }

    /// Generic failure reply for unsupported or malformed requests.
    pub fn not_found() -> Self {
        Self {
            status: None,
            code: 404,
            response: None,
        }
    }

    /// Status line, headers, blank line, JSON body.
    pub fn to_wire(&self, format: BodyFormat) -> String {
        // Plain strings and integers always serialize.
        let body = match format {
            BodyFormat::Pretty => serde_json::to_string_pretty(self),
            BodyFormat::Compact => serde_json::to_string(self),
        };
        let body = body.unwrap_or_default();

        format!(
            "{} {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            PROTOCOL,
            self.code,
            reason_phrase(self.code),
            body.len(),
            body
        )
    }
}

fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        404 => "Not Found",
        _ => "Unknown",
    }
}
