//! Token, session, permission, and lockout subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → tokens.rs (signature, expiry, blacklist, session cross-check)
//!     → sessions.rs (shared-store record, sliding 30-day TTL)
//!     → permissions.rs (role → resource/action/scope table)
//! Login endpoint (external) → lockout.rs (failed-attempt counter)
//! ```
//!
//! # Design Decisions
//! - Session state lives only in the shared store; every gateway process
//!   must observe the same session set, so there is no in-process cache
//! - Token verification refreshes the bound session's sliding TTL
//! - Lockout errors are distinct from bad-credential errors

pub mod lockout;
pub mod middleware;
pub mod permissions;
pub mod sessions;
pub mod tokens;

pub use lockout::LoginGuard;
pub use middleware::{auth_middleware, AuthContext};
pub use permissions::{has_permission, Role, Scope};
pub use sessions::{Session, SessionContext, SessionManager};
pub use tokens::{TokenPayload, TokenService, TokenTtls, TokenType};
