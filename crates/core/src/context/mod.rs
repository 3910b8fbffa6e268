pub mod store;

pub use store::{ContextStore, ConversationContext, StoreStats};
