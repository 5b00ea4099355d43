//! EIP-4361 ("Sign-In with Ethereum") message parsing and serialization.
//!
//! The signature submitted by the wallet covers the exact bytes of the
//! serialized message, so parsing is strict and `Display` reproduces the
//! canonical layout byte for byte. Timestamps keep their raw textual form
//! for the same reason.

use alloy_core::primitives::Address;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";

/// Errors from parsing a raw sign-in message.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("first line is not a sign-in header")]
    InvalidHeader,

    #[error("invalid account address: {0}")]
    InvalidAddress(String),

    #[error("expected blank line after {0}")]
    MissingSeparator(&'static str),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("invalid {0} timestamp: {1}")]
    InvalidTimestamp(&'static str, String),

    #[error("unexpected content: {0}")]
    UnexpectedContent(String),
}

/// An RFC 3339 instant that remembers its original textual form.
///
/// Re-serializing must reproduce the signed bytes exactly, and RFC 3339
/// permits layouts (`Z` vs `+00:00`, fractional seconds) that a formatted
/// `DateTime` would not round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    raw: String,
    instant: DateTime<Utc>,
}

impl Timestamp {
    fn parse(raw: &str, field: &'static str) -> Result<Self, ParseError> {
        let parsed = DateTime::parse_from_rfc3339(raw)
            .map_err(|_| ParseError::InvalidTimestamp(field, raw.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            instant: parsed.with_timezone(&Utc),
        })
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A parsed EIP-4361 sign-in message.
///
/// `address` is EIP-55 checksummed (enforced at parse time), so `Display`
/// can re-derive the exact address line from the parsed value.
#[derive(Debug, Clone, PartialEq)]
pub struct SignInMessage {
    pub domain: String,
    pub address: Address,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: Timestamp,
    pub expiration_time: Option<Timestamp>,
    pub not_before: Option<Timestamp>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

/// Consume `lines[*pos]` as a `{prefix}{value}` field line.
fn required_field<'a>(
    lines: &[&'a str],
    pos: &mut usize,
    prefix: &'static str,
) -> Result<&'a str, ParseError> {
    let label = prefix.trim_end_matches(": ");
    let line = lines
        .get(*pos)
        .ok_or(ParseError::MissingField(label))?;
    let value = line
        .strip_prefix(prefix)
        .ok_or(ParseError::MissingField(label))?;
    *pos += 1;
    Ok(value)
}

/// Consume `lines[*pos]` if it carries the given optional field.
fn optional_field<'a>(lines: &[&'a str], pos: &mut usize, prefix: &str) -> Option<&'a str> {
    let value = lines.get(*pos)?.strip_prefix(prefix)?;
    *pos += 1;
    Some(value)
}

impl FromStr for SignInMessage {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, ParseError> {
        let lines: Vec<&str> = raw.split('\n').collect();

        let header = lines.first().ok_or(ParseError::InvalidHeader)?;
        let domain = header
            .strip_suffix(HEADER_SUFFIX)
            .filter(|d| !d.is_empty())
            .ok_or(ParseError::InvalidHeader)?
            .to_string();

        let address_line = lines.get(1).ok_or(ParseError::MissingField("address"))?;
        let address = Address::parse_checksummed(address_line, None)
            .map_err(|_| ParseError::InvalidAddress(address_line.to_string()))?;

        if lines.get(2) != Some(&"") {
            return Err(ParseError::MissingSeparator("address"));
        }

        // Either a one-line statement framed by blank lines, or a second
        // blank line straight away.
        let (statement, mut pos) = match lines.get(3) {
            Some(&"") => (None, 4),
            Some(s) => {
                if lines.get(4) != Some(&"") {
                    return Err(ParseError::MissingSeparator("statement"));
                }
                (Some(s.to_string()), 5)
            }
            None => return Err(ParseError::MissingField("URI")),
        };

        let uri = required_field(&lines, &mut pos, "URI: ")?.to_string();

        let version = required_field(&lines, &mut pos, "Version: ")?;
        if version != "1" {
            return Err(ParseError::InvalidVersion(version.to_string()));
        }
        let version = version.to_string();

        let chain_id_raw = required_field(&lines, &mut pos, "Chain ID: ")?;
        let chain_id: u64 = chain_id_raw
            .parse()
            .map_err(|_| ParseError::InvalidChainId(chain_id_raw.to_string()))?;

        let nonce = required_field(&lines, &mut pos, "Nonce: ")?;
        if nonce.len() < 8 || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ParseError::InvalidNonce(nonce.to_string()));
        }
        let nonce = nonce.to_string();

        let issued_at = Timestamp::parse(
            required_field(&lines, &mut pos, "Issued At: ")?,
            "Issued At",
        )?;

        let expiration_time = optional_field(&lines, &mut pos, "Expiration Time: ")
            .map(|v| Timestamp::parse(v, "Expiration Time"))
            .transpose()?;
        let not_before = optional_field(&lines, &mut pos, "Not Before: ")
            .map(|v| Timestamp::parse(v, "Not Before"))
            .transpose()?;
        let request_id =
            optional_field(&lines, &mut pos, "Request ID: ").map(|v| v.to_string());

        let mut resources = Vec::new();
        if lines.get(pos) == Some(&"Resources:") {
            pos += 1;
            while let Some(line) = lines.get(pos) {
                let resource = line
                    .strip_prefix("- ")
                    .ok_or_else(|| ParseError::UnexpectedContent((*line).to_string()))?;
                resources.push(resource.to_string());
                pos += 1;
            }
        }

        if pos != lines.len() {
            return Err(ParseError::UnexpectedContent(lines[pos].to_string()));
        }

        Ok(SignInMessage {
            domain,
            address,
            statement,
            uri,
            version,
            chain_id,
            nonce,
            issued_at,
            expiration_time,
            not_before,
            request_id,
            resources,
        })
    }
}

impl fmt::Display for SignInMessage {
    /// Canonical EIP-4361 layout; these are the bytes a signature covers.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}\n{}\n",
            self.domain,
            HEADER_SUFFIX,
            self.address.to_checksum(None)
        )?;
        match &self.statement {
            Some(statement) => write!(f, "\n{}\n", statement)?,
            None => f.write_str("\n")?,
        }
        write!(
            f,
            "\nURI: {}\nVersion: {}\nChain ID: {}\nNonce: {}\nIssued At: {}",
            self.uri, self.version, self.chain_id, self.nonce, self.issued_at
        )?;
        if let Some(expiration_time) = &self.expiration_time {
            write!(f, "\nExpiration Time: {}", expiration_time)?;
        }
        if let Some(not_before) = &self.not_before {
            write!(f, "\nNot Before: {}", not_before)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, "\nRequest ID: {}", request_id)?;
        }
        if !self.resources.is_empty() {
            f.write_str("\nResources:")?;
            for resource in &self.resources {
                write!(f, "\n- {}", resource)?;
            }
        }
        Ok(())
    }
}
