//! Credential extraction.
//!
//! Two credential shapes are recognized:
//!
//! - an API key in the `ROKWIRE-API-KEY` header;
//! - a bearer token in the `Authorization` header, either a central-identity
//!   token or an administrative identity token.
//!
//! The endpoint's strategy decides which verifier a bearer token goes to.
//! [`UnverifiedToken`] only reads the unverified header and `iss` claim to
//! pick the issuer's signing key.

use axum::http::HeaderMap;
use axum::http::header::HeaderName;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Header, decode_header};
use serde::Deserialize;

use crate::verify::VerificationError;

/// Header carrying API keys of public-tier clients.
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("rokwire-api-key");

/// Returns the API key, if the header is present and non-empty.
///
/// A value that is not valid UTF-8 is returned as an empty key, which no key
/// set contains.
pub fn api_key(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(API_KEY_HEADER)?;
    if value.is_empty() {
        return None;
    }

    Some(value.to_str().map(str::trim).unwrap_or_default())
}

/// Bearer token taken from the `Authorization` header.
#[derive(Clone)]
pub struct BearerToken(Authorization<Bearer>);

impl BearerToken {
    /// Raw compact token.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.token()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BearerToken").field(&"<redacted>").finish()
    }
}

/// Returns the bearer token, `None` if there is no `Authorization` header.
///
/// A header that is present but not a well-formed bearer credential is
/// [`VerificationError::Malformed`].
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<BearerToken>, VerificationError> {
    headers
        .typed_try_get::<Authorization<Bearer>>()
        .map(|header| header.map(BearerToken))
        .map_err(|_| VerificationError::Malformed)
}

/// A credential presented by the caller.
#[derive(Debug, Clone)]
pub enum Credential<'a> {
    ApiKey(&'a str),
    Bearer(BearerToken),
}

impl<'a> Credential<'a> {
    /// Extracts the credential of a request.
    ///
    /// A present API key takes precedence over a bearer token.
    pub fn from_headers(headers: &'a HeaderMap) -> Result<Option<Self>, VerificationError> {
        if let Some(key) = api_key(headers) {
            return Ok(Some(Self::ApiKey(key)));
        }

        Ok(bearer_token(headers)?.map(Self::Bearer))
    }
}

/// Claims read before verification, used only for routing.
#[derive(Debug, Default, Deserialize)]
struct PeekedClaims {
    #[serde(default)]
    iss: Option<String>,
}

/// Structure and routing facts of a compact JWT, read without verifying it.
///
/// Nothing here may be trusted; it only selects the trust domain and key.
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    header: Header,
    issuer: Option<String>,
}

impl UnverifiedToken {
    /// Parses the header and peeks at the issuer claim.
    pub fn inspect(raw: &str) -> Result<Self, VerificationError> {
        let mut segments = raw.split('.');
        let (Some(_), Some(payload), Some(_), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(VerificationError::Malformed);
        };

        let header = decode_header(raw).map_err(|_| VerificationError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| VerificationError::Malformed)?;
        let claims: PeekedClaims =
            serde_json::from_slice(&payload).map_err(|_| VerificationError::Malformed)?;

        Ok(Self {
            header,
            issuer: claims.iss.filter(|iss| !iss.is_empty()),
        })
    }

    /// Decoded JOSE header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Unverified `iss` claim.
    #[inline]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Unverified `kid` header.
    #[inline]
    pub fn key_id(&self) -> Option<&str> {
        self.header.kid.as_deref()
    }
}
