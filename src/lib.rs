pub mod endpoint;
pub mod error;
pub mod id;
pub mod registry;
pub mod server;
pub mod store;
