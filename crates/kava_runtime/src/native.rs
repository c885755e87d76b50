//! Dynamic-library backend: binds the runtime shim's C symbol table.
//!
//! The shim exports a fixed, versioned set of `extern "C"` entry points
//! mirroring [`RuntimeAbi`] one-to-one. Symbols resolve once at load into
//! plain function pointers; the owning [`Library`] stays alive for as
//! long as the backend does, which keeps those pointers valid.

use std::ffi::CString;
use std::path::Path;

use kava_types::{Error, Tag};
use libc::{c_char, c_int, c_void};
use libloading::Library;

use crate::abi::{ABI_VERSION, FieldId, MethodId, NativeValue, RawHandle, RuntimeAbi};

type AbiVersionFn = unsafe extern "C" fn() -> u32;
type CreateFn = unsafe extern "C" fn(u32, c_int, *const *const c_char) -> c_int;
type DestroyFn = unsafe extern "C" fn();
type FindClassFn = unsafe extern "C" fn(*const c_char) -> *mut c_void;
type ResolveFn = unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char) -> *mut c_void;
type ObjectClassFn = unsafe extern "C" fn(*mut c_void) -> *mut c_void;
type CallByteFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *const NativeValue) -> i8;
type CallShortFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *const NativeValue) -> i16;
type CallIntFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *const NativeValue) -> i32;
type CallLongFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *const NativeValue) -> i64;
type CallFloatFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *const NativeValue) -> f32;
type CallDoubleFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *const NativeValue) -> f64;
type CallBooleanFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *const NativeValue) -> u8;
type CallCharFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *const NativeValue) -> u16;
type CallObjectFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *const NativeValue) -> *mut c_void;
type CallVoidFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *const NativeValue);
type NewStringFn = unsafe extern "C" fn(*const c_char) -> *mut c_void;
type StringLengthFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type StringCharsFn = unsafe extern "C" fn(*mut c_void) -> *const c_char;
type ReleaseCharsFn = unsafe extern "C" fn(*mut c_void, *const c_char);
type ReleaseRefFn = unsafe extern "C" fn(*mut c_void);
type GetFieldFn = unsafe extern "C" fn(*mut c_void, *mut c_void, c_int) -> NativeValue;
type SetFieldFn = unsafe extern "C" fn(*mut c_void, *mut c_void, c_int, NativeValue);

/// The resolved shim entry points.
struct Symbols {
    create: CreateFn,
    destroy: DestroyFn,
    find_class: FindClassFn,
    static_method: ResolveFn,
    instance_method: ResolveFn,
    object_class: ObjectClassFn,
    static_field_id: ResolveFn,
    field_id: ResolveFn,
    call_static_byte: CallByteFn,
    call_static_short: CallShortFn,
    call_static_int: CallIntFn,
    call_static_long: CallLongFn,
    call_static_float: CallFloatFn,
    call_static_double: CallDoubleFn,
    call_static_boolean: CallBooleanFn,
    call_static_char: CallCharFn,
    call_static_object: CallObjectFn,
    call_static_void: CallVoidFn,
    call_byte: CallByteFn,
    call_short: CallShortFn,
    call_int: CallIntFn,
    call_long: CallLongFn,
    call_float: CallFloatFn,
    call_double: CallDoubleFn,
    call_boolean: CallBooleanFn,
    call_char: CallCharFn,
    call_object: CallObjectFn,
    call_void: CallVoidFn,
    construct: CallObjectFn,
    new_string: NewStringFn,
    string_length: StringLengthFn,
    string_chars: StringCharsFn,
    release_string_chars: ReleaseCharsFn,
    release_ref: ReleaseRefFn,
    get_static_field: GetFieldFn,
    set_static_field: SetFieldFn,
    get_field: GetFieldFn,
    set_field: SetFieldFn,
}

impl Symbols {
    /// Resolve every entry point, failing the whole load on any miss.
    unsafe fn load(lib: &Library) -> Result<Symbols, libloading::Error> {
        macro_rules! sym {
            ($name:literal) => {
                *unsafe { lib.get($name) }?
            };
        }
        Ok(Symbols {
            create: sym!(b"kava_create"),
            destroy: sym!(b"kava_destroy"),
            find_class: sym!(b"kava_find_class"),
            static_method: sym!(b"kava_static_method"),
            instance_method: sym!(b"kava_instance_method"),
            object_class: sym!(b"kava_object_class"),
            static_field_id: sym!(b"kava_static_field_id"),
            field_id: sym!(b"kava_field_id"),
            call_static_byte: sym!(b"kava_call_static_byte"),
            call_static_short: sym!(b"kava_call_static_short"),
            call_static_int: sym!(b"kava_call_static_int"),
            call_static_long: sym!(b"kava_call_static_long"),
            call_static_float: sym!(b"kava_call_static_float"),
            call_static_double: sym!(b"kava_call_static_double"),
            call_static_boolean: sym!(b"kava_call_static_boolean"),
            call_static_char: sym!(b"kava_call_static_char"),
            call_static_object: sym!(b"kava_call_static_object"),
            call_static_void: sym!(b"kava_call_static_void"),
            call_byte: sym!(b"kava_call_byte"),
            call_short: sym!(b"kava_call_short"),
            call_int: sym!(b"kava_call_int"),
            call_long: sym!(b"kava_call_long"),
            call_float: sym!(b"kava_call_float"),
            call_double: sym!(b"kava_call_double"),
            call_boolean: sym!(b"kava_call_boolean"),
            call_char: sym!(b"kava_call_char"),
            call_object: sym!(b"kava_call_object"),
            call_void: sym!(b"kava_call_void"),
            construct: sym!(b"kava_construct"),
            new_string: sym!(b"kava_new_string"),
            string_length: sym!(b"kava_string_length"),
            string_chars: sym!(b"kava_string_chars"),
            release_string_chars: sym!(b"kava_release_string_chars"),
            release_ref: sym!(b"kava_release_ref"),
            get_static_field: sym!(b"kava_get_static_field"),
            set_static_field: sym!(b"kava_set_static_field"),
            get_field: sym!(b"kava_get_field"),
            set_field: sym!(b"kava_set_field"),
        })
    }
}

/// The field-access wire code for a tag, as the shim defines them.
fn tag_code(tag: Tag) -> c_int {
    match tag {
        Tag::Byte => 0,
        Tag::Short => 1,
        Tag::Int => 2,
        Tag::Long => 3,
        Tag::Float => 4,
        Tag::Double => 5,
        Tag::Boolean => 6,
        Tag::Char => 7,
        Tag::Str => 8,
        Tag::Void => 9,
    }
}

fn cstr(s: &str) -> Option<CString> {
    CString::new(s).ok()
}

/// A [`RuntimeAbi`] backend over a shared-library shim.
pub struct DynRuntime {
    symbols: Symbols,
    active: bool,
    // Dropping the library unmaps the symbols; it must outlive them.
    _library: Library,
}

impl DynRuntime {
    /// Load the shim at `path` and verify its ABI version.
    ///
    /// Load failures, missing symbols and version mismatches all collapse
    /// to [`Error::Bootstrap`]; the dynamic loader's own diagnostics are
    /// the place to look for detail.
    pub fn load(path: &Path) -> Result<DynRuntime, Error> {
        let library = unsafe { Library::new(path) }.map_err(|_| Error::Bootstrap)?;
        let version: AbiVersionFn = unsafe {
            *library
                .get(b"kava_abi_version")
                .map_err(|_| Error::Bootstrap)?
        };
        if unsafe { version() } != ABI_VERSION {
            return Err(Error::Bootstrap);
        }
        let symbols = unsafe { Symbols::load(&library) }.map_err(|_| Error::Bootstrap)?;
        Ok(DynRuntime {
            symbols,
            active: false,
            _library: library,
        })
    }
}

impl RuntimeAbi for DynRuntime {
    fn create(&mut self, version: u32, options: &[&str]) -> bool {
        if self.active {
            return true;
        }
        let Some(storage) = options
            .iter()
            .map(|opt| cstr(opt))
            .collect::<Option<Vec<_>>>()
        else {
            return false;
        };
        let ptrs: Vec<*const c_char> = storage.iter().map(|opt| opt.as_ptr()).collect();
        let ok =
            unsafe { (self.symbols.create)(version, ptrs.len() as c_int, ptrs.as_ptr()) } != 0;
        self.active = ok;
        ok
    }

    fn destroy(&mut self) {
        if self.active {
            unsafe { (self.symbols.destroy)() };
            self.active = false;
        }
    }

    fn find_class(&self, name: &str) -> RawHandle {
        let Some(name) = cstr(name) else {
            return RawHandle::NULL;
        };
        RawHandle(unsafe { (self.symbols.find_class)(name.as_ptr()) })
    }

    fn static_method(&self, class: RawHandle, name: &str, descriptor: &str) -> MethodId {
        let (Some(name), Some(descriptor)) = (cstr(name), cstr(descriptor)) else {
            return MethodId::NULL;
        };
        MethodId(unsafe {
            (self.symbols.static_method)(class.0, name.as_ptr(), descriptor.as_ptr())
        })
    }

    fn instance_method(&self, class: RawHandle, name: &str, descriptor: &str) -> MethodId {
        let (Some(name), Some(descriptor)) = (cstr(name), cstr(descriptor)) else {
            return MethodId::NULL;
        };
        MethodId(unsafe {
            (self.symbols.instance_method)(class.0, name.as_ptr(), descriptor.as_ptr())
        })
    }

    fn object_class(&self, object: RawHandle) -> RawHandle {
        RawHandle(unsafe { (self.symbols.object_class)(object.0) })
    }

    fn static_field_id(&self, class: RawHandle, name: &str, descriptor: &str) -> FieldId {
        let (Some(name), Some(descriptor)) = (cstr(name), cstr(descriptor)) else {
            return FieldId::NULL;
        };
        FieldId(unsafe {
            (self.symbols.static_field_id)(class.0, name.as_ptr(), descriptor.as_ptr())
        })
    }

    fn field_id(&self, class: RawHandle, name: &str, descriptor: &str) -> FieldId {
        let (Some(name), Some(descriptor)) = (cstr(name), cstr(descriptor)) else {
            return FieldId::NULL;
        };
        FieldId(unsafe { (self.symbols.field_id)(class.0, name.as_ptr(), descriptor.as_ptr()) })
    }

    fn call_static_byte(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> i8 {
        unsafe { (self.symbols.call_static_byte)(class.0, method.0, args.as_ptr()) }
    }

    fn call_static_short(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> i16 {
        unsafe { (self.symbols.call_static_short)(class.0, method.0, args.as_ptr()) }
    }

    fn call_static_int(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> i32 {
        unsafe { (self.symbols.call_static_int)(class.0, method.0, args.as_ptr()) }
    }

    fn call_static_long(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> i64 {
        unsafe { (self.symbols.call_static_long)(class.0, method.0, args.as_ptr()) }
    }

    fn call_static_float(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> f32 {
        unsafe { (self.symbols.call_static_float)(class.0, method.0, args.as_ptr()) }
    }

    fn call_static_double(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> f64 {
        unsafe { (self.symbols.call_static_double)(class.0, method.0, args.as_ptr()) }
    }

    fn call_static_boolean(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> u8 {
        unsafe { (self.symbols.call_static_boolean)(class.0, method.0, args.as_ptr()) }
    }

    fn call_static_char(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) -> u16 {
        unsafe { (self.symbols.call_static_char)(class.0, method.0, args.as_ptr()) }
    }

    fn call_static_object(
        &self,
        class: RawHandle,
        method: MethodId,
        args: &[NativeValue],
    ) -> RawHandle {
        RawHandle(unsafe { (self.symbols.call_static_object)(class.0, method.0, args.as_ptr()) })
    }

    fn call_static_void(&self, class: RawHandle, method: MethodId, args: &[NativeValue]) {
        unsafe { (self.symbols.call_static_void)(class.0, method.0, args.as_ptr()) }
    }

    fn call_byte(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> i8 {
        unsafe { (self.symbols.call_byte)(object.0, method.0, args.as_ptr()) }
    }

    fn call_short(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> i16 {
        unsafe { (self.symbols.call_short)(object.0, method.0, args.as_ptr()) }
    }

    fn call_int(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> i32 {
        unsafe { (self.symbols.call_int)(object.0, method.0, args.as_ptr()) }
    }

    fn call_long(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> i64 {
        unsafe { (self.symbols.call_long)(object.0, method.0, args.as_ptr()) }
    }

    fn call_float(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> f32 {
        unsafe { (self.symbols.call_float)(object.0, method.0, args.as_ptr()) }
    }

    fn call_double(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> f64 {
        unsafe { (self.symbols.call_double)(object.0, method.0, args.as_ptr()) }
    }

    fn call_boolean(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> u8 {
        unsafe { (self.symbols.call_boolean)(object.0, method.0, args.as_ptr()) }
    }

    fn call_char(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> u16 {
        unsafe { (self.symbols.call_char)(object.0, method.0, args.as_ptr()) }
    }

    fn call_object(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) -> RawHandle {
        RawHandle(unsafe { (self.symbols.call_object)(object.0, method.0, args.as_ptr()) })
    }

    fn call_void(&self, object: RawHandle, method: MethodId, args: &[NativeValue]) {
        unsafe { (self.symbols.call_void)(object.0, method.0, args.as_ptr()) }
    }

    fn construct(&self, class: RawHandle, ctor: MethodId, args: &[NativeValue]) -> RawHandle {
        RawHandle(unsafe { (self.symbols.construct)(class.0, ctor.0, args.as_ptr()) })
    }

    fn new_string(&self, utf: &str) -> RawHandle {
        let Some(utf) = cstr(utf) else {
            return RawHandle::NULL;
        };
        RawHandle(unsafe { (self.symbols.new_string)(utf.as_ptr()) })
    }

    fn string_length(&self, s: RawHandle) -> usize {
        let len = unsafe { (self.symbols.string_length)(s.0) };
        len.max(0) as usize
    }

    fn string_chars(&self, s: RawHandle) -> *const c_char {
        unsafe { (self.symbols.string_chars)(s.0) }
    }

    fn release_string_chars(&self, s: RawHandle, chars: *const c_char) {
        unsafe { (self.symbols.release_string_chars)(s.0, chars) }
    }

    fn release_ref(&self, handle: RawHandle) {
        unsafe { (self.symbols.release_ref)(handle.0) }
    }

    fn get_static_field(&self, class: RawHandle, field: FieldId, tag: Tag) -> NativeValue {
        unsafe { (self.symbols.get_static_field)(class.0, field.0, tag_code(tag)) }
    }

    fn set_static_field(&self, class: RawHandle, field: FieldId, tag: Tag, value: NativeValue) {
        unsafe { (self.symbols.set_static_field)(class.0, field.0, tag_code(tag), value) }
    }

    fn get_field(&self, object: RawHandle, field: FieldId, tag: Tag) -> NativeValue {
        unsafe { (self.symbols.get_field)(object.0, field.0, tag_code(tag)) }
    }

    fn set_field(&self, object: RawHandle, field: FieldId, tag: Tag, value: NativeValue) {
        unsafe { (self.symbols.set_field)(object.0, field.0, tag_code(tag), value) }
    }
}

impl Drop for DynRuntime {
    fn drop(&mut self) {
        // The environment normally destroys first; this covers a backend
        // dropped before bootstrap completed.
        self.destroy();
    }
}
