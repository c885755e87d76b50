//! Type-tagged dynamic dispatch over a managed-runtime ABI.
//!
//! A native caller invokes methods, constructors and fields on a managed
//! object model without compile-time knowledge of their signatures: values
//! carry their tag ([`Value`]), arguments marshal into the callee's native
//! array form ([`marshal`]), and the dispatcher resolves each target by
//! (name, descriptor) at call time ([`dispatch`]). The runtime itself is a
//! collaborator behind the [`RuntimeAbi`] trait; [`native::DynRuntime`]
//! binds it to a shared-library shim.

pub mod abi;
pub mod codec;
pub mod dispatch;
pub mod env;
pub mod fields;
pub mod marshal;
pub mod native;

pub use abi::{ABI_VERSION, FieldId, MethodId, NativeValue, RawHandle, RuntimeAbi};
pub use env::{Class, Classpath, Environment, Object, Options, Version};
pub use kava_types::{Error, Tag, Value};
pub use native::DynRuntime;
