// Flow proxy: forwards a message to the orchestration provider.

pub mod handlers;
pub mod service;
