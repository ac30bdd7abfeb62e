pub mod branch;
pub mod config;
pub mod deep_link;
pub mod forest;
pub mod graph;
pub mod layout;
pub mod message;
pub mod sidechain;

pub use message::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
