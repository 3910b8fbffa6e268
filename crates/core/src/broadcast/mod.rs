pub mod outbound;
pub mod registry;
pub mod tracker;

pub use outbound::{OutboundSender, SendOutcome};
pub use registry::{InMemoryRegistry, Recipient, RecipientRegistry, RegistryError, TargetFilter};
pub use tracker::{BroadcastError, BroadcastJob, BroadcastTracker};
