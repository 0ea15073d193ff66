// common/src/siwe.rs
//! Sign-In with Ethereum (EIP-4361) messages.
//!
//! [`SiweMessage`] renders to the canonical text a wallet signs and parses
//! the same text back. [`verify_siwe_message`] checks a signed message
//! against an EIP-191 `personal_sign` signature.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{keccak256, Address, Signature};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use thiserror::Error;
use url::Url;

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const URI_TAG: &str = "URI: ";
const VERSION_TAG: &str = "Version: ";
const CHAIN_ID_TAG: &str = "Chain ID: ";
const NONCE_TAG: &str = "Nonce: ";
const ISSUED_AT_TAG: &str = "Issued At: ";
const EXPIRATION_TIME_TAG: &str = "Expiration Time: ";
const NOT_BEFORE_TAG: &str = "Not Before: ";
const REQUEST_ID_TAG: &str = "Request ID: ";
const RESOURCES_TAG: &str = "Resources:";
const RESOURCE_PREFIX: &str = "- ";

pub const SIWE_VERSION: &str = "1";
pub const MIN_NONCE_LEN: usize = 8;

/// Errors during SIWE parsing or verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SiweError {
    #[error("SIWE message is empty")]
    EmptyMessage,
    #[error("invalid SIWE header format")]
    InvalidHeader,
    #[error("missing required SIWE field: {0}")]
    MissingField(&'static str),
    #[error("invalid SIWE address: {0}")]
    InvalidAddress(String),
    #[error("invalid SIWE field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("unexpected line in SIWE message: {0:?}")]
    UnexpectedLine(String),
    #[error("unsupported SIWE version: expected 1, got {0}")]
    UnsupportedVersion(String),
    #[error("SIWE message expired")]
    Expired,
    #[error("SIWE message is not yet valid")]
    NotYetValid,
    #[error("SIWE domain mismatch: expected {expected}, got {actual}")]
    DomainMismatch { expected: String, actual: String },
    #[error("invalid signature format: {0}")]
    SignatureFormat(String),
    #[error("signature recovery failed: {0}")]
    SignatureRecovery(String),
    #[error("signer mismatch: message address {message_address}, recovered {recovered_address}")]
    SignerMismatch {
        message_address: String,
        recovered_address: String,
    },
}

impl SiweError {
    /// True for errors raised while reading the message text.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            SiweError::EmptyMessage
                | SiweError::InvalidHeader
                | SiweError::MissingField(_)
                | SiweError::InvalidAddress(_)
                | SiweError::InvalidField { .. }
                | SiweError::UnexpectedLine(_)
                | SiweError::UnsupportedVersion(_)
        )
    }

    /// True for errors raised while checking the signature itself.
    pub fn is_signature_error(&self) -> bool {
        matches!(
            self,
            SiweError::SignatureFormat(_)
                | SiweError::SignatureRecovery(_)
                | SiweError::SignerMismatch { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweMessage {
    pub domain: String,
    pub address: Address,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

impl SiweMessage {
    /// Parse a SIWE message from its plain-text EIP-4361 representation.
    pub fn parse(message: &str) -> Result<Self, SiweError> {
        if message.trim().is_empty() {
            return Err(SiweError::EmptyMessage);
        }

        let mut lines = message.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).peekable();

        let header = lines.next().ok_or(SiweError::EmptyMessage)?;
        let domain = header
            .strip_suffix(HEADER_SUFFIX)
            .filter(|d| !d.is_empty() && !d.contains(char::is_whitespace))
            .ok_or(SiweError::InvalidHeader)?
            .to_string();

        let address_line = lines.next().ok_or(SiweError::MissingField("address"))?;
        let address = parse_address(address_line)?;

        match lines.next() {
            Some("") => {}
            Some(other) => return Err(SiweError::UnexpectedLine(other.to_string())),
            None => return Err(SiweError::MissingField("URI")),
        }

        // Statement block: either "<statement>\n\n", a bare "\n", or absent.
        let statement = match lines.peek().copied() {
            Some("") => {
                lines.next();
                None
            }
            Some(line) if line.starts_with(URI_TAG) => None,
            Some(line) => {
                lines.next();
                match lines.next() {
                    Some("") => Some(line.to_string()),
                    Some(other) => return Err(SiweError::UnexpectedLine(other.to_string())),
                    None => return Err(SiweError::MissingField("URI")),
                }
            }
            None => return Err(SiweError::MissingField("URI")),
        };

        let uri = take_tagged(&mut lines, URI_TAG).ok_or(SiweError::MissingField("URI"))?;
        Url::parse(uri).map_err(|e| SiweError::InvalidField {
            field: "URI",
            reason: e.to_string(),
        })?;

        let version = take_tagged(&mut lines, VERSION_TAG).ok_or(SiweError::MissingField("Version"))?;
        if version != SIWE_VERSION {
            return Err(SiweError::UnsupportedVersion(version.to_string()));
        }

        let chain_id = take_tagged(&mut lines, CHAIN_ID_TAG)
            .ok_or(SiweError::MissingField("Chain ID"))?
            .parse::<u64>()
            .map_err(|_| SiweError::InvalidField {
                field: "Chain ID",
                reason: "not a valid u64".to_string(),
            })?;

        let nonce = take_tagged(&mut lines, NONCE_TAG).ok_or(SiweError::MissingField("Nonce"))?;
        validate_nonce(nonce)?;

        let issued_at = take_tagged(&mut lines, ISSUED_AT_TAG)
            .ok_or(SiweError::MissingField("Issued At"))
            .and_then(|raw| parse_datetime("Issued At", raw))?;

        let expiration_time = take_tagged(&mut lines, EXPIRATION_TIME_TAG)
            .map(|raw| parse_datetime("Expiration Time", raw))
            .transpose()?;
        let not_before = take_tagged(&mut lines, NOT_BEFORE_TAG)
            .map(|raw| parse_datetime("Not Before", raw))
            .transpose()?;
        let request_id = take_tagged(&mut lines, REQUEST_ID_TAG).map(str::to_string);

        let mut resources = Vec::new();
        if lines.peek() == Some(&RESOURCES_TAG) {
            lines.next();
            while let Some(resource) = lines.peek().copied().and_then(|l| l.strip_prefix(RESOURCE_PREFIX)) {
                Url::parse(resource).map_err(|e| SiweError::InvalidField {
                    field: "Resources",
                    reason: e.to_string(),
                })?;
                resources.push(resource.to_string());
                lines.next();
            }
        }

        // Only trailing blank lines may follow.
        if let Some(extra) = lines.find(|l| !l.is_empty()) {
            return Err(SiweError::UnexpectedLine(extra.to_string()));
        }

        Ok(Self {
            domain,
            address,
            statement,
            uri: uri.to_string(),
            version: version.to_string(),
            chain_id,
            nonce: nonce.to_string(),
            issued_at,
            expiration_time,
            not_before,
            request_id,
            resources,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.is_some_and(|exp| exp <= now)
    }

    pub fn is_not_yet_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before.is_some_and(|nbf| nbf > now)
    }
}

impl FromStr for SiweMessage {
    type Err = SiweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}{}", self.domain, HEADER_SUFFIX)?;
        writeln!(f, "{}", self.address.to_checksum(None))?;
        writeln!(f)?;
        match &self.statement {
            Some(statement) => {
                writeln!(f, "{}", statement)?;
                writeln!(f)?;
            }
            None => writeln!(f)?,
        }
        writeln!(f, "{}{}", URI_TAG, self.uri)?;
        writeln!(f, "{}{}", VERSION_TAG, self.version)?;
        writeln!(f, "{}{}", CHAIN_ID_TAG, self.chain_id)?;
        writeln!(f, "{}{}", NONCE_TAG, self.nonce)?;
        write!(f, "{}{}", ISSUED_AT_TAG, format_datetime(&self.issued_at))?;
        if let Some(exp) = &self.expiration_time {
            write!(f, "\n{}{}", EXPIRATION_TIME_TAG, format_datetime(exp))?;
        }
        if let Some(nbf) = &self.not_before {
            write!(f, "\n{}{}", NOT_BEFORE_TAG, format_datetime(nbf))?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, "\n{}{}", REQUEST_ID_TAG, request_id)?;
        }
        if !self.resources.is_empty() {
            write!(f, "\n{}", RESOURCES_TAG)?;
            for resource in &self.resources {
                write!(f, "\n{}{}", RESOURCE_PREFIX, resource)?;
            }
        }
        Ok(())
    }
}

/// Inputs for [`create_siwe_message`].
#[derive(Debug, Clone)]
pub struct SiweMessageOptions {
    /// Host (and port) the user is signing in to
    pub domain: String,
    /// Scheme + host of the requesting site, used as the URI
    pub origin: String,
    pub address: Address,
    pub statement: String,
    /// Nonce previously issued by the server
    pub nonce: String,
    pub chain_id: u64,
    pub expiration_in_hours: i64,
    pub resources: Vec<String>,
}

impl SiweMessageOptions {
    pub fn new(
        domain: impl Into<String>,
        origin: impl Into<String>,
        address: Address,
        statement: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            origin: origin.into(),
            address,
            statement: statement.into(),
            nonce: nonce.into(),
            chain_id: 1,
            expiration_in_hours: 24,
            resources: Vec::new(),
        }
    }
}

/// Build a message for the wallet to sign, issued now.
///
/// Without explicit resources the profile page of `origin` is listed.
pub fn create_siwe_message(options: SiweMessageOptions) -> Result<SiweMessage, SiweError> {
    create_siwe_message_at(options, Utc::now())
}

/// Fails when `expiration_in_hours` puts the expiry outside the representable range.
pub fn create_siwe_message_at(
    options: SiweMessageOptions,
    issued_at: DateTime<Utc>,
) -> Result<SiweMessage, SiweError> {
    let SiweMessageOptions {
        domain,
        origin,
        address,
        statement,
        nonce,
        chain_id,
        expiration_in_hours,
        resources,
    } = options;

    let origin = origin.trim_end_matches('/').to_string();
    let resources = if resources.is_empty() {
        vec![format!("{}/profile", origin)]
    } else {
        resources
    };
    let statement = Some(statement).filter(|s| !s.is_empty());
    let expiration_time = Duration::try_hours(expiration_in_hours)
        .and_then(|ttl| issued_at.checked_add_signed(ttl))
        .ok_or_else(|| SiweError::InvalidField {
            field: "expiration_in_hours",
            reason: format!("{} hours is out of range", expiration_in_hours),
        })?;

    Ok(SiweMessage {
        domain,
        address,
        statement,
        uri: origin,
        version: SIWE_VERSION.to_string(),
        chain_id,
        nonce,
        issued_at,
        expiration_time: Some(expiration_time),
        not_before: None,
        request_id: None,
        resources,
    })
}

/// Checks applied to a signed message besides the signature.
#[derive(Debug, Clone)]
pub struct VerificationOptions {
    /// Expected domain; skipped when `None`
    pub domain: Option<String>,
    pub time: DateTime<Utc>,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            domain: None,
            time: Utc::now(),
        }
    }
}

/// Parse `message`, check its validity window and domain, then check that
/// `signature` was produced by the message's address.
///
/// The signature is checked over `message` exactly as received.
pub fn verify_siwe_message(
    message: &str,
    signature: &str,
    options: &VerificationOptions,
) -> Result<SiweMessage, SiweError> {
    let siwe = SiweMessage::parse(message)?;

    if siwe.is_expired_at(options.time) {
        return Err(SiweError::Expired);
    }
    if siwe.is_not_yet_valid_at(options.time) {
        return Err(SiweError::NotYetValid);
    }
    if let Some(expected) = &options.domain {
        if &siwe.domain != expected {
            return Err(SiweError::DomainMismatch {
                expected: expected.clone(),
                actual: siwe.domain.clone(),
            });
        }
    }

    let signature_bytes = decode_signature(signature)?;
    let recovered = recover_personal_sign(message.as_bytes(), &signature_bytes)?;
    if recovered != siwe.address {
        return Err(SiweError::SignerMismatch {
            message_address: siwe.address.to_checksum(None),
            recovered_address: recovered.to_checksum(None),
        });
    }

    Ok(siwe)
}

/// Recover the signer of an EIP-191 `personal_sign` signature.
pub fn recover_personal_sign(message: &[u8], signature: &[u8]) -> Result<Address, SiweError> {
    // "\x19Ethereum Signed Message:\n" + len(message) + message
    let mut prefixed = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    prefixed.extend_from_slice(message);
    let hash = keccak256(&prefixed);

    if signature.len() != 65 {
        return Err(SiweError::SignatureFormat(format!(
            "signature must be 65 bytes, got {}",
            signature.len()
        )));
    }
    let sig = Signature::try_from(signature)
        .map_err(|e| SiweError::SignatureFormat(e.to_string()))?;

    sig.recover_address_from_prehash(&hash)
        .map_err(|e| SiweError::SignatureRecovery(e.to_string()))
}

fn take_tagged<'a, I>(lines: &mut std::iter::Peekable<I>, tag: &str) -> Option<&'a str>
where
    I: Iterator<Item = &'a str>,
{
    let line: &'a str = *lines.peek()?;
    let value = line.strip_prefix(tag)?;
    lines.next();
    Some(value)
}

fn parse_address(raw: &str) -> Result<Address, SiweError> {
    if !raw.starts_with("0x") {
        return Err(SiweError::InvalidAddress(format!("missing 0x prefix: {}", raw)));
    }
    Address::parse_checksummed(raw, None).map_err(|e| SiweError::InvalidAddress(e.to_string()))
}

fn validate_nonce(nonce: &str) -> Result<(), SiweError> {
    if nonce.len() < MIN_NONCE_LEN || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SiweError::InvalidField {
            field: "Nonce",
            reason: format!("expected at least {} alphanumeric characters", MIN_NONCE_LEN),
        });
    }
    Ok(())
}

fn parse_datetime(field: &'static str, raw: &str) -> Result<DateTime<Utc>, SiweError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SiweError::InvalidField {
            field,
            reason: e.to_string(),
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_signature(signature: &str) -> Result<Vec<u8>, SiweError> {
    let hex_sig = signature.strip_prefix("0x").unwrap_or(signature);
    if hex_sig.len() != 130 {
        return Err(SiweError::SignatureFormat(format!(
            "expected 130 hex chars, got {}",
            hex_sig.len()
        )));
    }

    hex::decode(hex_sig).map_err(|e| SiweError::SignatureFormat(e.to_string()))
}
