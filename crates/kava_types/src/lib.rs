//! Core data types for the kava dispatch layer.
//!
//! Pure data, no behavior beyond accessors: the value tags, the tagged
//! value type that crosses the dispatch boundary, and the error causes a
//! failed dispatch can report.

pub mod error;
pub mod tag;
pub mod value;

pub use error::Error;
pub use tag::Tag;
pub use value::Value;
