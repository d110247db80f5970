//! crew-core: framework-agnostic capability model for crew.
//!
//! Holds the capability snapshot, the shared store every gate reads from,
//! the gates themselves and the bridge that hydrates the store from a
//! server-rendered bootstrap payload.

pub mod bridge;
pub mod config;
pub mod errors;
pub mod events;
pub mod gate;
pub mod policy;
pub mod requirement;
pub mod snapshot;
pub mod store;
pub mod tenant;

pub use bridge::HydrationBridge;
pub use config::{load_env_config, CrewConfig, CrewConfigSnapshot};
pub use errors::{CrewError, ErrorKind};
pub use events::{EventPat, ListenerId, StoreEvent, StoreEventKind};
pub use gate::{CapabilityGate, GateCheck, GateOutcome};
pub use policy::CapabilityPolicy;
pub use requirement::PermissionRequirement;
pub use snapshot::{CapabilitySnapshot, SnapshotParseError, SnapshotPayload};
pub use store::{CapabilityStore, FetchTicket, HydrateOutcome, Readiness, StoreView};
pub use tenant::{LocationId, OrgId, TenantContext};
