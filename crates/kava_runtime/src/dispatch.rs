//! The three dispatch operations: static call, instance call, construct.
//!
//! Every call re-resolves its target from (handle, name, descriptor);
//! nothing is cached between calls, so a dispatch carries no state beyond
//! the borrowed runtime. The marshalled argument array lives on the stack
//! of each operation and drops on every exit path.

use kava_types::{Error, Tag, Value};

use crate::abi::{NativeValue, RawHandle, RuntimeAbi};
use crate::codec;
use crate::marshal;

/// Fixed constructor name in the runtime's resolution scheme.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Invoke a static method on `class`.
///
/// `Ok(None)` is a void result (or a null string from the callee), never
/// a failure; failures report their cause in the `Err` arm.
pub fn invoke_static(
    abi: &dyn RuntimeAbi,
    class: RawHandle,
    name: &str,
    descriptor: &str,
    ret: Tag,
    args: Vec<Value>,
) -> Result<Option<Value>, Error> {
    if class.is_null() {
        return Err(Error::InvalidHandle);
    }
    let method = abi.static_method(class, name, descriptor);
    if method.is_null() {
        return Err(Error::MethodNotFound {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        });
    }
    let packed = marshal::marshal(abi, args)?;

    let slot = match ret {
        Tag::Byte => NativeValue {
            b: abi.call_static_byte(class, method, &packed),
        },
        Tag::Short => NativeValue {
            s: abi.call_static_short(class, method, &packed),
        },
        Tag::Int => NativeValue {
            i: abi.call_static_int(class, method, &packed),
        },
        Tag::Long => NativeValue {
            j: abi.call_static_long(class, method, &packed),
        },
        Tag::Float => NativeValue {
            f: abi.call_static_float(class, method, &packed),
        },
        Tag::Double => NativeValue {
            d: abi.call_static_double(class, method, &packed),
        },
        Tag::Boolean => NativeValue {
            z: abi.call_static_boolean(class, method, &packed),
        },
        Tag::Char => NativeValue {
            c: abi.call_static_char(class, method, &packed),
        },
        Tag::Str => {
            let result = abi.call_static_object(class, method, &packed);
            return Ok(codec::read_string(abi, result).map(Value::Str));
        }
        Tag::Void => {
            abi.call_static_void(class, method, &packed);
            return Ok(None);
        }
    };
    Ok(codec::unpack(ret, slot))
}

/// Invoke an instance method on `object`.
///
/// The object's runtime class is resolved first, then the method on it;
/// return handling matches [`invoke_static`], string results included.
pub fn invoke(
    abi: &dyn RuntimeAbi,
    object: RawHandle,
    name: &str,
    descriptor: &str,
    ret: Tag,
    args: Vec<Value>,
) -> Result<Option<Value>, Error> {
    if object.is_null() {
        return Err(Error::InvalidHandle);
    }
    let class = abi.object_class(object);
    if class.is_null() {
        return Err(Error::InvalidHandle);
    }
    let method = abi.instance_method(class, name, descriptor);
    if method.is_null() {
        return Err(Error::MethodNotFound {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        });
    }
    let packed = marshal::marshal(abi, args)?;

    let slot = match ret {
        Tag::Byte => NativeValue {
            b: abi.call_byte(object, method, &packed),
        },
        Tag::Short => NativeValue {
            s: abi.call_short(object, method, &packed),
        },
        Tag::Int => NativeValue {
            i: abi.call_int(object, method, &packed),
        },
        Tag::Long => NativeValue {
            j: abi.call_long(object, method, &packed),
        },
        Tag::Float => NativeValue {
            f: abi.call_float(object, method, &packed),
        },
        Tag::Double => NativeValue {
            d: abi.call_double(object, method, &packed),
        },
        Tag::Boolean => NativeValue {
            z: abi.call_boolean(object, method, &packed),
        },
        Tag::Char => NativeValue {
            c: abi.call_char(object, method, &packed),
        },
        Tag::Str => {
            let result = abi.call_object(object, method, &packed);
            return Ok(codec::read_string(abi, result).map(Value::Str));
        }
        Tag::Void => {
            abi.call_void(object, method, &packed);
            return Ok(None);
        }
    };
    Ok(codec::unpack(ret, slot))
}

/// Construct a new instance of `class`.
///
/// The constructor resolves under the fixed [`CONSTRUCTOR_NAME`] with the
/// supplied descriptor; a null instance back from the runtime is a
/// construction failure.
pub fn construct(
    abi: &dyn RuntimeAbi,
    class: RawHandle,
    descriptor: &str,
    args: Vec<Value>,
) -> Result<RawHandle, Error> {
    if class.is_null() {
        return Err(Error::InvalidHandle);
    }
    let ctor = abi.instance_method(class, CONSTRUCTOR_NAME, descriptor);
    if ctor.is_null() {
        return Err(Error::MethodNotFound {
            name: CONSTRUCTOR_NAME.to_string(),
            descriptor: descriptor.to_string(),
        });
    }
    let packed = marshal::marshal(abi, args)?;

    let instance = abi.construct(class, ctor, &packed);
    if instance.is_null() {
        Err(Error::Construction)
    } else {
        Ok(instance)
    }
}
