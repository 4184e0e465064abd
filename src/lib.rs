pub mod cli;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod gate;
pub mod http;
pub mod params;
pub mod server;

pub use config::{AuthScheme, Config, ConfigError};
pub use error::ProxyError;
pub use forwarder::Forwarder;
pub use gate::Gate;
