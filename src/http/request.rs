//! Request line parsing.

use std::collections::BTreeMap;

use url::form_urlencoded;

/// Error type for malformed request lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("request line has no resource")]
    MissingResource,
    #[error("duplicate query parameter '{0}'")]
    DuplicateParameter(String),
}

/// One parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub instruction_path: String,
    pub parameters: BTreeMap<String, String>,
}

impl Request {
    /// Parse `METHOD RESOURCE[ PROTOCOL]`.
    ///
    /// Tokens past the resource are ignored. Query keys and values are
    /// percent-decoded; a key repeated within one request rejects the line.
    pub fn parse(line: &str) -> Result<Self, RequestError> {
        let mut tokens = line.split(' ').filter(|t| !t.is_empty());
        let method = tokens.next().ok_or(RequestError::MissingResource)?;
        let resource = tokens.next().ok_or(RequestError::MissingResource)?;

        let (instruction_path, query) = match resource.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (resource, None),
        };

        let parameters = match query {
            Some(query) => parse_query(query)?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            method: method.to_string(),
            instruction_path: instruction_path.to_string(),
            parameters,
        })
    }
}

fn parse_query(query: &str) -> Result<BTreeMap<String, String>, RequestError> {
    let mut parameters = BTreeMap::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if parameters.contains_key(&*key) {
            return Err(RequestError::DuplicateParameter(key.into_owned()));
        }
        parameters.insert(key.into_owned(), value.into_owned());
    }
    Ok(parameters)
}
