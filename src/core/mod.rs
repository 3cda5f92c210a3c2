pub mod analysis;
pub mod completion;
pub mod conversation;
pub mod error;
pub mod ports;
