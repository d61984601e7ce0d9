//! Session credentials issued by the backend and the store that holds them.

mod cookie;
mod credential;
mod store;

pub use cookie::{parse_set_cookie, SetCookie};
pub use credential::SessionCredential;
pub use store::{MemorySessionStore, SessionStore};
