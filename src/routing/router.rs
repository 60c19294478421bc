//! Request router.

use crate::config::{BodyFormat, ProtocolConfig};
use crate::http::{Request, RequestError, ResponseEnvelope};

/// Outcome of routing one request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Write this envelope and keep reading.
    Reply(ResponseEnvelope),
    /// The router declined; the caller writes the not-found reply.
    NotFound,
    /// Reserved path: end the exchange without a reply.
    EndExchange,
}

/// Maps request lines to response envelopes.
#[derive(Debug, Clone)]
pub struct Router {
    reserved_paths: Vec<String>,
    body_format: BodyFormat,
}

impl Router {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            reserved_paths: config.reserved_paths.clone(),
            body_format: config.body_format,
        }
    }

    pub fn body_format(&self) -> BodyFormat {
        self.body_format
    }

    /// Parse `line` and decide how the session answers it.
    pub fn dispatch(&self, line: &str) -> Result<Dispatch, RequestError> {
        let request = Request::parse(line)?;
        Ok(self.route(&request))
    }

    pub fn route(&self, request: &Request) -> Dispatch {
        match request.method.as_str() {
            "GET" | "POST" => {
                if self.is_reserved(&request.instruction_path) {
                    Dispatch::EndExchange
                } else {
                    Dispatch::Reply(ResponseEnvelope::ok(request))
                }
            }
            _ => Dispatch::NotFound,
        }
    }

    fn is_reserved(&self, path: &str) -> bool {
        self.reserved_paths.iter().any(|reserved| reserved == path)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(&ProtocolConfig::default())
    }
}
