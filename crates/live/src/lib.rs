mod events;
mod intent;
mod monitor;
mod projection;
mod store;
mod types;

pub use events::*;
pub use intent::*;
pub use monitor::*;
pub use projection::*;
pub use store::*;
pub use types::*;

pub use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Error>;
