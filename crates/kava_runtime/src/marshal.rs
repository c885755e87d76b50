//! Argument marshalling: tagged values into the callee's native array.

use kava_types::{Error, Value};
use smallvec::SmallVec;

use crate::abi::{NativeValue, RuntimeAbi};
use crate::codec;

/// The marshalled argument array. Calls up to eight arguments stay
/// inline; longer lists spill to the heap.
pub type ArgArray = SmallVec<[NativeValue; 8]>;

/// Convert the argument list into the callee's native array form.
///
/// Takes ownership of every input, so each value is consumed exactly once
/// on every path, failure included. Slot i is index-aligned with input i;
/// a `Void` input leaves its slot zeroed, so callers must never supply
/// `Void` at a real argument position. An empty list always yields an
/// empty array.
pub fn marshal(abi: &dyn RuntimeAbi, args: Vec<Value>) -> Result<ArgArray, Error> {
    let mut out = ArgArray::with_capacity(args.len());
    for value in args {
        out.push(codec::pack(abi, value)?);
    }
    Ok(out)
}
