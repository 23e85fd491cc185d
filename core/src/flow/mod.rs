//! Flow classification & per-flow state (spec.md §1 item 2, §4.4).

pub mod cache;
pub mod classifier;
pub mod key;
pub mod table;
pub mod timeout;

pub use cache::LastFlowCache;
pub use classifier::{FlowClassifier, FlowDataLayout, FlowKeyExtractor, FullPolicy};
pub use key::{FlowKey, Protocol};
pub use table::{FlowTable, TableFull};
pub use timeout::EvictionScheme;
