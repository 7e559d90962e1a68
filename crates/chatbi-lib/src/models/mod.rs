// Data models module
// Contains all data structures used across the library

pub mod chat;
pub mod session;
pub mod workflow;

pub use chat::*;
pub use session::*;
pub use workflow::*;
