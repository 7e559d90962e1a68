// Services module

pub mod chat;
pub mod session;
pub mod workflow;
