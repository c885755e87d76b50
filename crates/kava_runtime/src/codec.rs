//! Packing and unpacking tagged values across the native boundary.

use std::slice;

use kava_types::{Error, Tag, Value};

use crate::abi::{NativeValue, RawHandle, RuntimeAbi};

/// Move one value into a callee-native slot.
///
/// Strings are interned into a runtime-owned local reference held in the
/// slot's object field; a null reference back from the runtime is an
/// allocation failure. `Void` packs a zeroed slot.
pub fn pack(abi: &dyn RuntimeAbi, value: Value) -> Result<NativeValue, Error> {
    let slot = match value {
        Value::Byte(v) => NativeValue { b: v },
        Value::Short(v) => NativeValue { s: v },
        Value::Int(v) => NativeValue { i: v },
        Value::Long(v) => NativeValue { j: v },
        Value::Float(v) => NativeValue { f: v },
        Value::Double(v) => NativeValue { d: v },
        Value::Boolean(v) => NativeValue { z: v as u8 },
        Value::Char(v) => NativeValue { c: v as u16 },
        Value::Str(v) => {
            let handle = abi.new_string(&v);
            if handle.is_null() {
                return Err(Error::Alloc);
            }
            NativeValue { l: handle.0 }
        }
        Value::Void => NativeValue::ZERO,
    };
    Ok(slot)
}

/// Read the tag-selected field of a slot back into a value.
///
/// `Void` has no payload and yields `None`; string results carry a handle,
/// not bytes, and decode through [`read_string`] instead. The dispatcher
/// writes and reads the same tag, so the slot always holds the selected
/// representation.
pub fn unpack(tag: Tag, slot: NativeValue) -> Option<Value> {
    unsafe {
        match tag {
            Tag::Byte => Some(Value::Byte(slot.b)),
            Tag::Short => Some(Value::Short(slot.s)),
            Tag::Int => Some(Value::Int(slot.i)),
            Tag::Long => Some(Value::Long(slot.j)),
            Tag::Float => Some(Value::Float(slot.f)),
            Tag::Double => Some(Value::Double(slot.d)),
            Tag::Boolean => Some(Value::Boolean(slot.z != 0)),
            Tag::Char => Some(Value::Char(
                char::from_u32(slot.c as u32).unwrap_or('\u{fffd}'),
            )),
            Tag::Str | Tag::Void => None,
        }
    }
}

/// Decode a runtime-owned string and give its reference back.
///
/// Queries the UTF length, copies exactly that many bytes out of the
/// runtime's chars buffer, then releases the borrow and the reference.
/// The chars buffer must hold standard UTF-8; a runtime handing back
/// anything else (say, a modified encoding for embedded nuls) decodes
/// to nothing rather than to a substituted payload whose byte length no
/// longer matches the declared one. A null handle also decodes to
/// nothing.
pub fn read_string(abi: &dyn RuntimeAbi, handle: RawHandle) -> Option<String> {
    if handle.is_null() {
        return None;
    }
    let len = abi.string_length(handle);
    let chars = abi.string_chars(handle);
    if chars.is_null() {
        abi.release_ref(handle);
        return None;
    }
    let bytes = unsafe { slice::from_raw_parts(chars as *const u8, len) }.to_vec();
    abi.release_string_chars(handle, chars);
    abi.release_ref(handle);
    String::from_utf8(bytes).ok()
}
