pub mod types;
pub mod identity;
pub mod config;
pub mod error;
pub mod events;

pub use types::*;
pub use identity::*;
pub use config::Config;
pub use error::RivalScopeError;
pub use events::*;
