//! Appender implementations

pub mod stream;

pub use stream::{StreamAppender, StreamTarget};

pub use crate::core::Appender;
