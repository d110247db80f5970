pub mod authority;
pub mod guard;
pub mod jwt;

pub use authority::{JwtSessionAuthority, Session, SessionAuthority, StaticSessionAuthority};
pub use guard::{GuardState, SessionGuard};
pub use jwt::{extract_bearer_token, JwtProvider, JwtVerifier};
