//! Authentication primitives for the blog API: JWT issuance/verification
//! and password hashing.

pub mod jwt;
pub mod password;

pub use jwt::{JwtClaims, SubjectClaims, TokenCodec, TokenError, TokenKind};
pub use password::{hash_password, verify_password, PasswordError};

// Re-export useful types
pub use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
