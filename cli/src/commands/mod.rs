//! Command implementations

pub mod apps;
pub mod build;
pub mod config;
pub mod deploy;
pub mod hosts;
pub mod profiles;
pub mod runlists;
pub mod upload;
pub mod users;
pub mod version;
