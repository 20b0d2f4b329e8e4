//! Identity & quota policy gate (§4.4).

mod identity;

pub use identity::{IdentityPolicy, ResolvedIdentity, Role};
