pub mod config;
pub mod error;
pub mod ontology;
pub mod types;
pub mod urls;

pub use config::Config;
pub use error::RefSenseError;
pub use ontology::*;
pub use types::*;
pub use urls::*;
