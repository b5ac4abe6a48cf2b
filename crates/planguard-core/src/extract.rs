// crates/planguard-core/src/extract.rs
// ============================================================================
// Module: Trap Error Extraction
// Description: Request models and the parsers that recover them from traps.
// Purpose: Turn provoked provider diagnostics back into (URL, body) pairs.
// Dependencies: regex, serde, serde_json
// ============================================================================

//! ## Overview
//! The intercepted provider fails every outbound call with a synthetic error
//! that embeds the request it was about to send. Two diagnostic shapes are
//! recognised: the direct status-error form and the poller form. Parsers are
//! applied in order and the first that yields any results wins. The embedded
//! `body` field is a JSON string, not a nested object; it is forwarded
//! verbatim for callers to re-parse once.
//! Parsers are defensive: a capture that does not decode, or decodes to the
//! wrong shape, is skipped rather than failing the batch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Request Models
// ============================================================================

/// One captured would-be REST request, or the failure to capture one.
///
/// # Invariants
/// - `url` is absolute and carries the `api-version` query when extraction
///   succeeded; `failed` is set instead when it did not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestModel {
    /// Absolute request URL.
    pub url: String,
    /// Resource envelope as JSON text.
    pub body: String,
    /// Address of the originating planned resource.
    pub address: String,
    /// Failure descriptor when extraction yielded no request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<FailedCase>,
}

/// Details of a failed extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailedCase {
    /// Raw diagnostics that matched no parser.
    pub detail: String,
}

// ============================================================================
// SECTION: Parsers
// ============================================================================

/// A recogniser for one trap-error shape.
pub trait ErrorParser {
    /// Extracts request models from a diagnostics string.
    fn parse_error(&self, input: &str) -> Vec<RequestModel>;
}

/// Direct status-error form:
/// `unexpected status <code> with response: <service-error-json>` where the
/// service error carries `innererror.url` and `innererror.body`.
#[derive(Debug)]
pub struct AutoRestErrorParser {
    pattern: Regex,
}

impl AutoRestErrorParser {
    /// Compiles the parser.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error; the pattern is a literal and only
    /// fails if it is edited into invalidity.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(r"unexpected status \d+ with response: (.+)")?,
        })
    }
}

impl ErrorParser for AutoRestErrorParser {
    fn parse_error(&self, input: &str) -> Vec<RequestModel> {
        let mut out = Vec::new();
        for captures in self.pattern.captures_iter(input) {
            let Ok(document) = serde_json::from_str::<Value>(&captures[1]) else {
                continue;
            };
            let Some(inner) = document.get("innererror") else {
                continue;
            };
            let Some(url) = inner.get("url").and_then(Value::as_str) else {
                continue;
            };
            let Some(body) = inner.get("body").and_then(Value::as_str) else {
                continue;
            };
            out.push(RequestModel {
                url: url.to_string(),
                body: body.to_string(),
                ..RequestModel::default()
            });
        }
        out
    }
}

/// Poller form:
/// `Code="InterceptedError" Message="InterceptedError" InnerError=<json>`
/// where the JSON object carries top-level `url` and `body`. Matches with an
/// empty `url` are discarded.
#[derive(Debug)]
pub struct AutoRestPollerErrorParser {
    pattern: Regex,
}

impl AutoRestPollerErrorParser {
    /// Compiles the parser.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error; the pattern is a literal and only
    /// fails if it is edited into invalidity.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(r#"Code="InterceptedError" Message="InterceptedError" InnerError=(.+)"#)?,
        })
    }
}

impl ErrorParser for AutoRestPollerErrorParser {
    fn parse_error(&self, input: &str) -> Vec<RequestModel> {
        let mut out = Vec::new();
        for captures in self.pattern.captures_iter(input) {
            let Ok(document) = serde_json::from_str::<Value>(&captures[1]) else {
                continue;
            };
            let url = document
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if url.is_empty() {
                continue;
            }
            let body = document
                .get("body")
                .and_then(Value::as_str)
                .unwrap_or_default();
            out.push(RequestModel {
                url: url.to_string(),
                body: body.to_string(),
                ..RequestModel::default()
            });
        }
        out
    }
}

/// The ordered parser chain; the first parser with any results wins.
#[derive(Debug)]
pub struct TrapErrorParsers {
    autorest: AutoRestErrorParser,
    poller: AutoRestPollerErrorParser,
}

impl TrapErrorParsers {
    /// Compiles both parsers.
    ///
    /// # Errors
    ///
    /// Returns the underlying regex compile error.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            autorest: AutoRestErrorParser::new()?,
            poller: AutoRestPollerErrorParser::new()?,
        })
    }

    /// Extracts request models from a diagnostics string.
    #[must_use]
    pub fn parse(&self, input: &str) -> Vec<RequestModel> {
        let models = self.autorest.parse_error(input);
        if !models.is_empty() {
            return models;
        }
        self.poller.parse_error(input)
    }
}
