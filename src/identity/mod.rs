//! Identity values observed from the external provider and the backend records they map to.
//! The feed is the only way identities enter the pipeline.

mod external;
mod feed;
mod record;

pub use external::{ExternalIdentity, UpsertPayload, DEFAULT_ROLE};
pub use feed::{IdentityEvents, IdentityFeed};
pub use record::{BackendUserRecord, RecordId};
