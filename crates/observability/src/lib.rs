//! Logging setup shared by every front end of the stock intake service.

pub mod tracing;

pub use self::tracing::init_with;
