//! Batch record flattening - nested batch listings into JSON Lines
//!
//! Records are pulled from the input array one at a time by [`ArrayStream`],
//! flattened by [`BatchTransformer`], and written by [`RecordWriter`].

pub mod error;
pub mod stream;
pub mod timing;
pub mod transformer;
pub mod types;
pub mod writer;

pub use error::{RecordError, StreamError};
pub use stream::ArrayStream;
pub use transformer::{sanitize_key, BatchTransformer};
pub use types::{Config, InputRecord, OutputRecord, RunSummary, StateTransition};
pub use writer::RecordWriter;
