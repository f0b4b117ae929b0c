// src/streams/mod.rs
pub mod extractor;
pub mod geyser;
pub mod layout;
pub mod transaction;

pub use extractor::PoolCreationExtractor;
pub use geyser::{GeyserFeed, StreamEvent, UpdateFeed, UpdateStream};
pub use layout::{AccountRole, AccountRoles, InstructionLayout, LayoutRegistry};
pub use transaction::{InstructionView, TransactionView};
