pub mod aggregate;
pub mod compare;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod order;
pub mod partition;
pub mod session;
pub mod store;
