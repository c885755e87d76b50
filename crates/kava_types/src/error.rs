//! Dispatch error causes.
//!
//! The default wrapper API collapses every cause to an absent result, as
//! the runtime convention demands; the `try_` variants surface these so a
//! caller can tell a missing method from an allocation failure.

use std::error;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The runtime environment could not be created or loaded.
    Bootstrap,
    /// A null class or object handle was passed to a dispatch operation.
    InvalidHandle,
    /// No class with this name could be resolved.
    ClassNotFound(String),
    /// No method matched the (name, descriptor) pair on the target.
    MethodNotFound { name: String, descriptor: String },
    /// No field matched the (name, descriptor) pair on the target.
    FieldNotFound { name: String, descriptor: String },
    /// The runtime failed to allocate (string interning, result boxing).
    Alloc,
    /// The constructor ran but produced no instance.
    Construction,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bootstrap => write!(f, "runtime environment could not be created"),
            Error::InvalidHandle => write!(f, "null handle passed to dispatch"),
            Error::ClassNotFound(name) => write!(f, "class not found: {name}"),
            Error::MethodNotFound { name, descriptor } => {
                write!(f, "method not found: {name}{descriptor}")
            }
            Error::FieldNotFound { name, descriptor } => {
                write!(f, "field not found: {name}:{descriptor}")
            }
            Error::Alloc => write!(f, "runtime allocation failed"),
            Error::Construction => write!(f, "constructor produced no instance"),
        }
    }
}

impl error::Error for Error {}
