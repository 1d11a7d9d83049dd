//! Re-exports of the tracing macros used throughout the runtime

pub use tracing::{debug, error, info, trace, warn};
