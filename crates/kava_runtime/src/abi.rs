//! The seam between the dispatch core and the external managed runtime.
//!
//! The runtime is injected as a trait object, so the core never links a
//! particular runtime directly. Handles are capability tokens: the core
//! checks them for null and passes them back unmodified, never
//! dereferencing them itself.

use std::fmt;
use std::ptr;

use libc::{c_char, c_void};

use kava_types::Tag;

/// Version of the shim symbol table the dynamic backend expects.
pub const ABI_VERSION: u32 = 1;

/// An opaque reference to a runtime-managed class, object or string.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawHandle(pub *mut c_void);

impl RawHandle {
    pub const NULL: RawHandle = RawHandle(ptr::null_mut());

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:p})", self.0)
    }
}

/// An opaque method or constructor identifier, resolved per call.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MethodId(pub *mut c_void);

impl MethodId {
    pub const NULL: MethodId = MethodId(ptr::null_mut());

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodId({:p})", self.0)
    }
}

/// An opaque field identifier, resolved per access.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FieldId(pub *mut c_void);

impl FieldId {
    pub const NULL: FieldId = FieldId(ptr::null_mut());

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldId({:p})", self.0)
    }
}

/// One callee-native value slot, layout-compatible with the runtime's
/// argument union.
///
/// The dispatcher writes and reads the field selected by the value's tag;
/// slots start zeroed so narrow reads never see uninitialised bytes.
#[repr(C)]
#[derive(Clone, Copy)]
pub union NativeValue {
    pub b: i8,
    pub s: i16,
    pub i: i32,
    pub j: i64,
    pub f: f32,
    pub d: f64,
    pub z: u8,
    pub c: u16,
    pub l: *mut c_void,
}

impl NativeValue {
    pub const ZERO: NativeValue = NativeValue { j: 0 };
}

impl Default for NativeValue {
    fn default() -> Self {
        NativeValue::ZERO
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The widest field covers the whole union.
        write!(f, "NativeValue({:#018x})", unsafe { self.j })
    }
}

/// The fixed call surface of the external managed runtime.
///
/// Everything the dispatch core needs, and nothing more: environment
/// lifecycle, name resolution, the per-tag call primitives, string and
/// reference lifetime, and tag-indexed field access. Implementations are
/// the dynamic-library shim binding ([`crate::native::DynRuntime`]) and
/// hand-written fakes in tests.
pub trait RuntimeAbi {
    // Lifecycle. `create` is idempotent; `destroy` is called at most once
    // by the environment that owns this backend.
    fn create(&mut self, version: u32, options: &[&str]) -> bool;
    fn destroy(&mut self);

    // Resolution. Null results mean "not found".
    fn find_class(&self, name: &str) -> RawHandle;
    fn static_method(&self, class: RawHandle, name: &str, descriptor: &str) -> MethodId;
    fn instance_method(&self, class: RawHandle, name: &str, descriptor: &str) -> MethodId;
    fn object_class(&self, object: RawHandle) -> RawHandle;
    fn static_field_id(&self, class: RawHandle, name: &str, descriptor: &str) -> FieldId;
    fn field_id(&self, class: RawHandle, name: &str, descriptor: &str) -> FieldId;

    // Static call primitives, one per return representation.
    fn call_static_byte(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> i8;
    fn call_static_short(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> i16;
    fn call_static_int(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> i32;
    fn call_static_long(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> i64;
    fn call_static_float(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> f32;
    fn call_static_double(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> f64;
    fn call_static_boolean(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> u8;
    fn call_static_char(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> u16;
    fn call_static_object(&self, class: RawHandle, method: MethodId, args: &[NativeValue])
    -> RawHandle;
    fn call_static_void(&self, class: RawHandle, method: MethodId, args: &[NativeValue]);

    // Instance call primitives.
    fn call_byte(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> i8;
    fn call_short(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> i16;
    fn call_int(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> i32;
    fn call_long(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> i64;
    fn call_float(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> f32;
    fn call_double(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> f64;
    fn call_boolean(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> u8;
    fn call_char(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> u16;
    fn call_object(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> RawHandle;
    fn call_void(&self, object: RawHandle, method: MethodId, args: &[NativeValue]);

    /// Run a constructor, yielding the new instance handle or null.
    fn construct(&self, class: RawHandle, ctor: MethodId, args: &[NativeValue]) -> RawHandle;

    // String and reference lifetime. `string_chars` borrows the
    // runtime-owned UTF bytes and must be paired with
    // `release_string_chars`; `release_ref` gives a handle back.
    fn new_string(&self, utf: &str) -> RawHandle;
    fn string_length(&self, s: RawHandle) -> usize;
    fn string_chars(&self, s: RawHandle) -> *const c_char;
    fn release_string_chars(&self, s: RawHandle, chars: *const c_char);
    fn release_ref(&self, handle: RawHandle);

    // Tag-indexed field primitives.
    fn get_static_field(&self, class: RawHandle, field: FieldId, tag: Tag) -> NativeValue;
    fn set_static_field(&self, class: RawHandle, field: FieldId, tag: Tag, value: NativeValue);
    fn get_field(&self, object: RawHandle, field: FieldId, tag: Tag) -> NativeValue;
    fn set_field(&self, object: RawHandle, field: FieldId, tag: Tag, value: NativeValue);
}
