//! Field access on classes and objects.
//!
//! Fields resolve per access from (class, name, tag descriptor) with the
//! same statelessness as method dispatch. A field's descriptor is derived
//! from its tag's fixed type code; a `Void` tag simply never resolves.

use kava_types::{Error, Tag, Value};

use crate::abi::{FieldId, RawHandle, RuntimeAbi};
use crate::codec;

fn resolve_static(
    abi: &dyn RuntimeAbi,
    class: RawHandle,
    name: &str,
    tag: Tag,
) -> Result<FieldId, Error> {
    let field = abi.static_field_id(class, name, tag.descriptor());
    if field.is_null() {
        return Err(Error::FieldNotFound {
            name: name.to_string(),
            descriptor: tag.descriptor().to_string(),
        });
    }
    Ok(field)
}

fn resolve_instance(
    abi: &dyn RuntimeAbi,
    class: RawHandle,
    name: &str,
    tag: Tag,
) -> Result<FieldId, Error> {
    let field = abi.field_id(class, name, tag.descriptor());
    if field.is_null() {
        return Err(Error::FieldNotFound {
            name: name.to_string(),
            descriptor: tag.descriptor().to_string(),
        });
    }
    Ok(field)
}

/// Read a static field. String fields decode through the same contract as
/// string-returning calls.
pub fn read_static_field(
    abi: &dyn RuntimeAbi,
    class: RawHandle,
    name: &str,
    tag: Tag,
) -> Result<Option<Value>, Error> {
    if class.is_null() {
        return Err(Error::InvalidHandle);
    }
    let field = resolve_static(abi, class, name, tag)?;
    let slot = abi.get_static_field(class, field, tag);
    if tag == Tag::Str {
        let handle = RawHandle(unsafe { slot.l });
        return Ok(codec::read_string(abi, handle).map(Value::Str));
    }
    Ok(codec::unpack(tag, slot))
}

/// Write a static field; the field's tag is the value's own.
pub fn write_static_field(
    abi: &dyn RuntimeAbi,
    class: RawHandle,
    name: &str,
    value: Value,
) -> Result<(), Error> {
    if class.is_null() {
        return Err(Error::InvalidHandle);
    }
    let tag = value.tag();
    let field = resolve_static(abi, class, name, tag)?;
    let slot = codec::pack(abi, value)?;
    abi.set_static_field(class, field, tag, slot);
    Ok(())
}

/// Read an instance field from `object`.
pub fn read_field(
    abi: &dyn RuntimeAbi,
    object: RawHandle,
    name: &str,
    tag: Tag,
) -> Result<Option<Value>, Error> {
    if object.is_null() {
        return Err(Error::InvalidHandle);
    }
    let class = abi.object_class(object);
    if class.is_null() {
        return Err(Error::InvalidHandle);
    }
    let field = resolve_instance(abi, class, name, tag)?;
    let slot = abi.get_field(object, field, tag);
    if tag == Tag::Str {
        let handle = RawHandle(unsafe { slot.l });
        return Ok(codec::read_string(abi, handle).map(Value::Str));
    }
    Ok(codec::unpack(tag, slot))
}

/// Write an instance field on `object`.
pub fn write_field(
    abi: &dyn RuntimeAbi,
    object: RawHandle,
    name: &str,
    value: Value,
) -> Result<(), Error> {
    if object.is_null() {
        return Err(Error::InvalidHandle);
    }
    let class = abi.object_class(object);
    if class.is_null() {
        return Err(Error::InvalidHandle);
    }
    let tag = value.tag();
    let field = resolve_instance(abi, class, name, tag)?;
    let slot = codec::pack(abi, value)?;
    abi.set_field(object, field, tag, slot);
    Ok(())
}
