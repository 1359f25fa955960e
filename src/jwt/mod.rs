//! Self-issued JWTs.

pub mod claims;
pub mod issuer;

pub use claims::JwtClaims;
pub use issuer::{CreateJwtResult, IssueToken, JwtIssuer};
