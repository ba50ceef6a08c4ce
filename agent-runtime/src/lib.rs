pub mod error;
pub mod types;
pub mod price;
pub mod trigger;
pub mod oracle;
pub mod dex;
pub mod ledger;
pub mod naming;
pub mod store;
pub mod coordinator;
pub mod scanner;

pub use error::AgentError;
pub use types::*;
