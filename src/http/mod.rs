mod envelope;
mod executor;

pub use envelope::{Envelope, PageMeta};
pub use executor::{RequestExecutor, RequestOptions};
