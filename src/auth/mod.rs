//! Credential lifecycle: persisted token, session predicate, teardown.

mod session;
mod token;

pub use session::{Navigator, Session};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
