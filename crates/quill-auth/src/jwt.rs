//! JWT (JSON Web Token) encoding and decoding

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind discriminator restricting a token to one operational purpose.
///
/// Access tokens authenticate normal API requests; refresh tokens are only
/// accepted by the token-refresh endpoint. The kind is carried as a boolean
/// claim (`access: true` / `refresh: true`) inside the signed payload, which
/// stands in for server-side token-type bookkeeping in a stateless scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn claim_name(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// JWT claims for blog API authentication
///
/// Every field except the kind flags is essential: a token missing one of
/// them fails to decode. `email` and `name` must be present but may be blank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JwtClaims {
    /// Subject (author username)
    pub sub: String,
    /// Author email
    pub email: String,
    /// Author display name
    pub name: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Not before (timestamp)
    pub nbf: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience (site base URL)
    pub aud: String,
    /// Kind flag: set to true on access tokens, absent otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<bool>,
    /// Kind flag: set to true on refresh tokens, absent otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<bool>,
}

impl JwtClaims {
    /// Whether this token carries the given kind flag set to `true`.
    pub fn has_kind(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Access => self.access == Some(true),
            TokenKind::Refresh => self.refresh == Some(true),
        }
    }
}

/// Subject identity embedded in every issued token.
#[derive(Debug, Clone)]
pub struct SubjectClaims {
    /// Username, becomes the `sub` claim
    pub sub: String,
    /// Email, may be blank
    pub email: String,
    /// Display name, may be blank
    pub name: String,
}

/// JWT errors
///
/// Callers at the HTTP layer collapse all decode variants into a uniform
/// 401 so that no validation detail leaks to the client.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT encoding error: {0}")]
    Encoding(jsonwebtoken::errors::Error),

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is missing an essential claim")]
    MissingClaim,

    #[error("Token audience does not match")]
    AudienceMismatch,

    #[error("Token issuer does not match")]
    IssuerMismatch,

    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid")]
    NotYetValid,

    #[error("Token kind does not match expected kind")]
    WrongKind,

    #[error("Invalid token")]
    InvalidToken,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidAudience => TokenError::AudienceMismatch,
            ErrorKind::InvalidIssuer => TokenError::IssuerMismatch,
            ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => TokenError::MissingClaim,
            _ => TokenError::InvalidToken,
        }
    }
}

/// Signs and verifies blog API tokens with an RSA key pair.
///
/// Constructed once at startup from configuration and shared read-only
/// across requests. Encoding signs with the private key (RS256) and tags the
/// key identifier in the header; decoding verifies against the public key
/// and enforces the essential-claim set.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    issuer: String,
    audience: String,
}

impl TokenCodec {
    /// Create a codec from PEM-encoded RSA keys.
    ///
    /// `key_id` is placed in the `kid` header of every issued token so
    /// verifiers can select the matching public key during rotation.
    pub fn from_rsa_pem(
        private_key_pem: &[u8],
        public_key_pem: &[u8],
        key_id: Option<String>,
        issuer: String,
        audience: String,
    ) -> Result<Self, TokenError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = key_id;

        Ok(Self {
            encoding_key: EncodingKey::from_rsa_pem(private_key_pem)
                .map_err(TokenError::Encoding)?,
            decoding_key: DecodingKey::from_rsa_pem(public_key_pem)
                .map_err(TokenError::Encoding)?,
            header,
            issuer,
            audience,
        })
    }

    /// Encode a signed token valid for `validity` from now.
    ///
    /// Builds the full claim set (`iat` = `nbf` = now, `exp` = now +
    /// validity, configured `aud`/`iss`, kind flag when `kind` is Some)
    /// around the supplied subject claims.
    pub fn encode(
        &self,
        validity: Duration,
        kind: Option<TokenKind>,
        subject: SubjectClaims,
    ) -> Result<String, TokenError> {
        let now = Utc::now();

        let claims = JwtClaims {
            sub: subject.sub,
            email: subject.email,
            name: subject.name,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + validity).timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            access: matches!(kind, Some(TokenKind::Access)).then_some(true),
            refresh: matches!(kind, Some(TokenKind::Refresh)).then_some(true),
        };

        encode(&self.header, &claims, &self.encoding_key).map_err(TokenError::Encoding)
    }

    /// Decode and validate a token, enforcing the expected kind.
    ///
    /// Validates the signature, expiry, not-before, audience and issuer, and
    /// requires every essential claim to be present (`email` and `name` may
    /// be blank strings). A token tagged with the wrong kind, or with no
    /// kind flag at all, fails with [`TokenError::WrongKind`].
    pub fn decode(&self, token: &str, expected_kind: TokenKind) -> Result<JwtClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);
        validation.set_required_spec_claims(&["exp", "nbf", "aud", "iss", "sub"]);
        validation.validate_nbf = true;
        // No clock-skew allowance: exp and nbf are enforced to the second
        validation.leeway = 0;

        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &validation)?;

        if !token_data.claims.has_kind(expected_kind) {
            return Err(TokenError::WrongKind);
        }

        Ok(token_data.claims)
    }
}
