pub mod chain;
pub mod config;
pub mod error;
pub mod eventual;
pub mod handle;
pub mod realm;

pub(crate) mod dispatch;
pub(crate) mod registry;
pub(crate) mod resolve;
