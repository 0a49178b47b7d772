pub mod parser;
pub mod payload;
pub mod portal;
pub mod store;
pub mod types;

pub use portal::{PortalClient, PortalError};
pub use store::{MemoryStore, SessionStore};

pub(crate) const BASE_URL: &str = "https://my.syriatel.sy";
