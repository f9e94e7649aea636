pub mod claude;
pub mod schema;
pub mod traits;

pub use claude::Claude;
pub use schema::StructuredOutput;
pub use traits::{extract, ModelClient};
