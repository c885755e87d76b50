//! A hand-written managed-runtime fake for exercising the dispatch core.
//!
//! Models a single class, `widget/Counter`, with enough methods and
//! fields to cover every dispatch path. Handles encode a kind and an
//! index in their address; nothing ever dereferences them. Every ABI
//! primitive appends its name to a call log so tests can assert on what
//! the core touched, and string interning is counted so marshalling
//! accounting can be checked.

// Each test binary compiles its own copy; not all of them touch every
// helper.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::ffi::{CString, c_char, c_void};
use std::rc::Rc;

use hashbrown::HashMap;
use kava_runtime::{FieldId, MethodId, NativeValue, RawHandle, RuntimeAbi, Tag};

pub const CLASS_NAME: &str = "widget/Counter";

const CLASS_HANDLE: usize = 0x1000;
const OBJECT_BASE: usize = 0x2000;
const STRING_BASE: usize = 0x4000;
const METHOD_BASE: usize = 0x6000;
const FIELD_BASE: usize = 0x8000;

const M_ADD: usize = 1;
const M_GREET: usize = 2;
const M_PING: usize = 3;
const M_ECHO_BYTE: usize = 4;
const M_ECHO_SHORT: usize = 5;
const M_ECHO_INT: usize = 6;
const M_ECHO_LONG: usize = 7;
const M_ECHO_FLOAT: usize = 8;
const M_ECHO_DOUBLE: usize = 9;
const M_ECHO_BOOLEAN: usize = 10;
const M_ECHO_CHAR: usize = 11;
const M_CTOR_INT: usize = 12;
const M_CTOR_DEFAULT: usize = 13;
const M_INCREMENT: usize = 14;
const M_VALUE: usize = 15;
const M_LABEL: usize = 16;

const F_CURRENT: usize = 1;
const F_MOTTO: usize = 2;
const F_GENERATION: usize = 3;

fn handle(addr: usize) -> RawHandle {
    RawHandle(addr as *mut c_void)
}

fn addr(h: RawHandle) -> usize {
    h.0 as usize
}

/// Observable state, shared between the test and the backend it moved
/// into the environment.
pub struct State {
    pub created: Cell<bool>,
    pub fail_create: Cell<bool>,
    pub create_calls: Cell<u32>,
    pub destroy_calls: Cell<u32>,
    pub launch_version: Cell<u32>,
    pub launch_options: RefCell<Vec<String>>,
    /// Names of every ABI primitive the core invoked, in order.
    pub calls: RefCell<Vec<String>>,
    strings: RefCell<Vec<Option<CString>>>,
    pub strings_created: Cell<u32>,
    pub string_refs_released: Cell<u32>,
    /// Outstanding chars borrows; zero when every decode paired its
    /// borrow with a release.
    pub chars_borrowed: Cell<i32>,
    /// When set, `new_string` succeeds this many more times, then fails.
    pub string_budget: Cell<Option<u32>>,
    pub fail_construct: Cell<bool>,
    objects: RefCell<Vec<i32>>,
    pub pings: Cell<i32>,
    pub motto: RefCell<String>,
    pub generation: Cell<i32>,
}

#[derive(Clone)]
pub struct FakeVm {
    pub state: Rc<State>,
    static_methods: Rc<HashMap<(&'static str, &'static str), usize>>,
    instance_methods: Rc<HashMap<(&'static str, &'static str), usize>>,
    static_fields: Rc<HashMap<(&'static str, &'static str), usize>>,
    instance_fields: Rc<HashMap<(&'static str, &'static str), usize>>,
}

impl FakeVm {
    pub fn new() -> FakeVm {
        let static_methods: HashMap<_, _> = [
            (("add", "(II)I"), M_ADD),
            (("greet", "(Ljava/lang/String;)Ljava/lang/String;"), M_GREET),
            (("ping", "()V"), M_PING),
            (("echoByte", "(B)B"), M_ECHO_BYTE),
            (("echoShort", "(S)S"), M_ECHO_SHORT),
            (("echoInt", "(I)I"), M_ECHO_INT),
            (("echoLong", "(J)J"), M_ECHO_LONG),
            (("echoFloat", "(F)F"), M_ECHO_FLOAT),
            (("echoDouble", "(D)D"), M_ECHO_DOUBLE),
            (("echoBoolean", "(Z)Z"), M_ECHO_BOOLEAN),
            (("echoChar", "(C)C"), M_ECHO_CHAR),
        ]
        .into_iter()
        .collect();
        let instance_methods: HashMap<_, _> = [
            (("<init>", "(I)V"), M_CTOR_INT),
            (("<init>", "()V"), M_CTOR_DEFAULT),
            (("increment", "()V"), M_INCREMENT),
            (("value", "()I"), M_VALUE),
            (("label", "()Ljava/lang/String;"), M_LABEL),
        ]
        .into_iter()
        .collect();
        let static_fields: HashMap<_, _> = [
            (("motto", "Ljava/lang/String;"), F_MOTTO),
            (("generation", "I"), F_GENERATION),
        ]
        .into_iter()
        .collect();
        let instance_fields: HashMap<_, _> = [(("current", "I"), F_CURRENT)].into_iter().collect();

        FakeVm {
            state: Rc::new(State {
                created: Cell::new(false),
                fail_create: Cell::new(false),
                create_calls: Cell::new(0),
                destroy_calls: Cell::new(0),
                launch_version: Cell::new(0),
                launch_options: RefCell::new(Vec::new()),
                calls: RefCell::new(Vec::new()),
                strings: RefCell::new(Vec::new()),
                strings_created: Cell::new(0),
                string_refs_released: Cell::new(0),
                chars_borrowed: Cell::new(0),
                string_budget: Cell::new(None),
                fail_construct: Cell::new(false),
                objects: RefCell::new(Vec::new()),
                pings: Cell::new(0),
                motto: RefCell::new(String::new()),
                generation: Cell::new(0),
            }),
            static_methods: Rc::new(static_methods),
            instance_methods: Rc::new(instance_methods),
            static_fields: Rc::new(static_fields),
            instance_fields: Rc::new(instance_fields),
        }
    }

    pub fn class_handle(&self) -> RawHandle {
        handle(CLASS_HANDLE)
    }

    pub fn log(&self) -> Vec<String> {
        self.state.calls.borrow().clone()
    }

    /// The UTF byte length the fake reports for the string behind `h`.
    fn declared_length(&self, h: RawHandle) -> Option<usize> {
        let idx = addr(h).checked_sub(STRING_BASE)?;
        let strings = self.state.strings.borrow();
        strings.get(idx)?.as_ref().map(|c| c.as_bytes().len())
    }

    fn record(&self, entry: &str) {
        self.state.calls.borrow_mut().push(entry.to_string());
    }

    fn intern(&self, s: &str) -> RawHandle {
        if let Some(budget) = self.state.string_budget.get() {
            if budget == 0 {
                return RawHandle::NULL;
            }
            self.state.string_budget.set(Some(budget - 1));
        }
        let mut strings = self.state.strings.borrow_mut();
        strings.push(Some(CString::new(s).expect("fake strings carry no nul")));
        self.state
            .strings_created
            .set(self.state.strings_created.get() + 1);
        handle(STRING_BASE + strings.len() - 1)
    }

    /// Plant a string slot holding raw bytes the runtime never produced
    /// through interning, for exercising decode of a corrupt buffer.
    pub fn plant_string_bytes(&self, bytes: &[u8]) -> RawHandle {
        let mut strings = self.state.strings.borrow_mut();
        strings.push(Some(CString::new(bytes).expect("planted bytes carry no nul")));
        handle(STRING_BASE + strings.len() - 1)
    }

    fn string_content(&self, h: RawHandle) -> Option<String> {
        let idx = addr(h).checked_sub(STRING_BASE)?;
        let strings = self.state.strings.borrow();
        strings
            .get(idx)?
            .as_ref()
            .map(|c| c.to_str().expect("fake strings are utf-8").to_string())
    }

    fn method_of(&self, method: MethodId) -> usize {
        addr(RawHandle(method.0)) - METHOD_BASE
    }

    fn field_of(&self, field: FieldId) -> usize {
        addr(RawHandle(field.0)) - FIELD_BASE
    }

    fn object_index(&self, object: RawHandle) -> Option<usize> {
        let idx = addr(object).checked_sub(OBJECT_BASE)?;
        if idx < self.state.objects.borrow().len() {
            Some(idx)
        } else {
            None
        }
    }
}

impl RuntimeAbi for FakeVm {
    fn create(&mut self, version: u32, options: &[&str]) -> bool {
        self.record("create");
        self.state.create_calls.set(self.state.create_calls.get() + 1);
        if self.state.fail_create.get() {
            return false;
        }
        if self.state.created.get() {
            return true;
        }
        self.state.launch_version.set(version);
        *self.state.launch_options.borrow_mut() =
            options.iter().map(|s| s.to_string()).collect();
        self.state.created.set(true);
        true
    }

    fn destroy(&mut self) {
        self.record("destroy");
        self.state
            .destroy_calls
            .set(self.state.destroy_calls.get() + 1);
        self.state.created.set(false);
    }

    fn find_class(&self, name: &str) -> RawHandle {
        self.record("find_class");
        if name == CLASS_NAME {
            handle(CLASS_HANDLE)
        } else {
            RawHandle::NULL
        }
    }

    fn static_method(&self, class: RawHandle, name: &str, descriptor: &str) -> MethodId {
        self.record("static_method");
        if addr(class) != CLASS_HANDLE {
            return MethodId::NULL;
        }
        match self.static_methods.get(&(name, descriptor)) {
            Some(id) => MethodId((METHOD_BASE + id) as *mut c_void),
            None => MethodId::NULL,
        }
    }

    fn instance_method(&self, class: RawHandle, name: &str, descriptor: &str) -> MethodId {
        self.record("instance_method");
        if addr(class) != CLASS_HANDLE {
            return MethodId::NULL;
        }
        match self.instance_methods.get(&(name, descriptor)) {
            Some(id) => MethodId((METHOD_BASE + id) as *mut c_void),
            None => MethodId::NULL,
        }
    }

    fn object_class(&self, object: RawHandle) -> RawHandle {
        self.record("object_class");
        match self.object_index(object) {
            Some(_) => handle(CLASS_HANDLE),
            None => RawHandle::NULL,
        }
    }

    fn static_field_id(&self, class: RawHandle, name: &str, descriptor: &str) -> FieldId {
        self.record("static_field_id");
        if addr(class) != CLASS_HANDLE {
            return FieldId::NULL;
        }
        match self.static_fields.get(&(name, descriptor)) {
            Some(id) => FieldId((FIELD_BASE + id) as *mut c_void),
            None => FieldId::NULL,
        }
    }

    fn field_id(&self, class: RawHandle, name: &str, descriptor: &str) -> FieldId {
        self.record("field_id");
        if addr(class) != CLASS_HANDLE {
            return FieldId::NULL;
        }
        match self.instance_fields.get(&(name, descriptor)) {
            Some(id) => FieldId((FIELD_BASE + id) as *mut c_void),
            None => FieldId::NULL,
        }
    }

    fn call_static_byte(&self, _class: RawHandle, method: MethodId, args: &[NativeValue]) -> i8 {
        self.record("call_static_byte");
        match self.method_of(method) {
            M_ECHO_BYTE => unsafe { args[0].b },
            _ => 0,
        }
    }

    fn call_static_short(&self, _class: RawHandle, method: MethodId, args: &[NativeValue]) -> i16 {
        self.record("call_static_short");
        match self.method_of(method) {
            M_ECHO_SHORT => unsafe { args[0].s },
            _ => 0,
        }
    }

    fn call_static_int(&self, _class: RawHandle, method: MethodId, args: &[NativeValue]) -> i32 {
        self.record("call_static_int");
        match self.method_of(method) {
            M_ADD => unsafe { args[0].i + args[1].i },
            M_ECHO_INT => unsafe { args[0].i },
            _ => 0,
        }
    }

    fn call_static_long(&self, _class: RawHandle, method: MethodId, args: &[NativeValue]) -> i64 {
        self.record("call_static_long");
        match self.method_of(method) {
            M_ECHO_LONG => unsafe { args[0].j },
            _ => 0,
        }
    }

    fn call_static_float(&self, _class: RawHandle, method: MethodId, args: &[NativeValue]) -> f32 {
        self.record("call_static_float");
        match self.method_of(method) {
            M_ECHO_FLOAT => unsafe { args[0].f },
            _ => 0.0,
        }
    }

    fn call_static_double(
        &self,
        _class: RawHandle,
        method: MethodId,
        args: &[NativeValue],
    ) -> f64 {
        self.record("call_static_double");
        match self.method_of(method) {
            M_ECHO_DOUBLE => unsafe { args[0].d },
            _ => 0.0,
        }
    }

    fn call_static_boolean(
        &self,
        _class: RawHandle,
        method: MethodId,
        args: &[NativeValue],
    ) -> u8 {
        self.record("call_static_boolean");
        match self.method_of(method) {
            M_ECHO_BOOLEAN => unsafe { args[0].z },
            _ => 0,
        }
    }

    fn call_static_char(&self, _class: RawHandle, method: MethodId, args: &[NativeValue]) -> u16 {
        self.record("call_static_char");
        match self.method_of(method) {
            M_ECHO_CHAR => unsafe { args[0].c },
            _ => 0,
        }
    }

    fn call_static_object(
        &self,
        _class: RawHandle,
        method: MethodId,
        args: &[NativeValue],
    ) -> RawHandle {
        self.record("call_static_object");
        match self.method_of(method) {
            M_GREET => {
                let input = self
                    .string_content(RawHandle(unsafe { args[0].l }))
                    .unwrap_or_default();
                self.intern(&format!("hello, {input}"))
            }
            _ => RawHandle::NULL,
        }
    }

    fn call_static_void(&self, _class: RawHandle, method: MethodId, _args: &[NativeValue]) {
        self.record("call_static_void");
        if self.method_of(method) == M_PING {
            self.state.pings.set(self.state.pings.get() + 1);
        }
    }

    fn call_byte(&self, _object: RawHandle, _method: MethodId, _args: &[NativeValue]) -> i8 {
        self.record("call_byte");
        0
    }

    fn call_short(&self, _object: RawHandle, _method: MethodId, _args: &[NativeValue]) -> i16 {
        self.record("call_short");
        0
    }

    fn call_int(&self, object: RawHandle, method: MethodId, _args: &[NativeValue]) -> i32 {
        self.record("call_int");
        match (self.method_of(method), self.object_index(object)) {
            (M_VALUE, Some(idx)) => self.state.objects.borrow()[idx],
            _ => 0,
        }
    }

    fn call_long(&self, _object: RawHandle, _method: MethodId, _args: &[NativeValue]) -> i64 {
        self.record("call_long");
        0
    }

    fn call_float(&self, _object: RawHandle, _method: MethodId, _args: &[NativeValue]) -> f32 {
        self.record("call_float");
        0.0
    }

    fn call_double(&self, _object: RawHandle, _method: MethodId, _args: &[NativeValue]) -> f64 {
        self.record("call_double");
        0.0
    }

    fn call_boolean(&self, _object: RawHandle, _method: MethodId, _args: &[NativeValue]) -> u8 {
        self.record("call_boolean");
        0
    }

    fn call_char(&self, _object: RawHandle, _method: MethodId, _args: &[NativeValue]) -> u16 {
        self.record("call_char");
        0
    }

    fn call_object(
        &self,
        object: RawHandle,
        method: MethodId,
        _args: &[NativeValue],
    ) -> RawHandle {
        self.record("call_object");
        match (self.method_of(method), self.object_index(object)) {
            (M_LABEL, Some(idx)) => {
                let current = self.state.objects.borrow()[idx];
                self.intern(&format!("counter#{idx}={current}"))
            }
            _ => RawHandle::NULL,
        }
    }

    fn call_void(&self, object: RawHandle, method: MethodId, _args: &[NativeValue]) {
        self.record("call_void");
        if let (M_INCREMENT, Some(idx)) = (self.method_of(method), self.object_index(object)) {
            self.state.objects.borrow_mut()[idx] += 1;
        }
    }

    fn construct(&self, _class: RawHandle, ctor: MethodId, args: &[NativeValue]) -> RawHandle {
        self.record("construct");
        if self.state.fail_construct.get() {
            return RawHandle::NULL;
        }
        let initial = match self.method_of(ctor) {
            M_CTOR_INT => unsafe { args[0].i },
            M_CTOR_DEFAULT => 0,
            _ => return RawHandle::NULL,
        };
        let mut objects = self.state.objects.borrow_mut();
        objects.push(initial);
        handle(OBJECT_BASE + objects.len() - 1)
    }

    fn new_string(&self, utf: &str) -> RawHandle {
        self.record("new_string");
        self.intern(utf)
    }

    fn string_length(&self, s: RawHandle) -> usize {
        self.record("string_length");
        self.declared_length(s).unwrap_or(0)
    }

    fn string_chars(&self, s: RawHandle) -> *const c_char {
        self.record("string_chars");
        let idx = match addr(s).checked_sub(STRING_BASE) {
            Some(idx) => idx,
            None => return std::ptr::null(),
        };
        let strings = self.state.strings.borrow();
        match strings.get(idx).and_then(|slot| slot.as_ref()) {
            Some(content) => {
                self.state
                    .chars_borrowed
                    .set(self.state.chars_borrowed.get() + 1);
                // The CString's buffer is stable while the slot is live.
                content.as_ptr()
            }
            None => std::ptr::null(),
        }
    }

    fn release_string_chars(&self, _s: RawHandle, _chars: *const c_char) {
        self.record("release_string_chars");
        self.state
            .chars_borrowed
            .set(self.state.chars_borrowed.get() - 1);
    }

    fn release_ref(&self, h: RawHandle) {
        self.record("release_ref");
        if let Some(idx) = addr(h).checked_sub(STRING_BASE) {
            let mut strings = self.state.strings.borrow_mut();
            if let Some(slot) = strings.get_mut(idx) {
                if slot.take().is_some() {
                    self.state
                        .string_refs_released
                        .set(self.state.string_refs_released.get() + 1);
                }
            }
        }
    }

    fn get_static_field(&self, _class: RawHandle, field: FieldId, tag: Tag) -> NativeValue {
        self.record("get_static_field");
        match (self.field_of(field), tag) {
            (F_MOTTO, Tag::Str) => NativeValue {
                l: self.intern(&self.state.motto.borrow()).0,
            },
            (F_GENERATION, Tag::Int) => NativeValue {
                i: self.state.generation.get(),
            },
            _ => NativeValue::ZERO,
        }
    }

    fn set_static_field(&self, _class: RawHandle, field: FieldId, tag: Tag, value: NativeValue) {
        self.record("set_static_field");
        match (self.field_of(field), tag) {
            (F_MOTTO, Tag::Str) => {
                if let Some(s) = self.string_content(RawHandle(unsafe { value.l })) {
                    *self.state.motto.borrow_mut() = s;
                }
            }
            (F_GENERATION, Tag::Int) => self.state.generation.set(unsafe { value.i }),
            _ => {}
        }
    }

    fn get_field(&self, object: RawHandle, field: FieldId, tag: Tag) -> NativeValue {
        self.record("get_field");
        match (self.field_of(field), tag, self.object_index(object)) {
            (F_CURRENT, Tag::Int, Some(idx)) => NativeValue {
                i: self.state.objects.borrow()[idx],
            },
            _ => NativeValue::ZERO,
        }
    }

    fn set_field(&self, object: RawHandle, field: FieldId, tag: Tag, value: NativeValue) {
        self.record("set_field");
        if let (F_CURRENT, Tag::Int, Some(idx)) = (self.field_of(field), tag, self.object_index(object))
        {
            self.state.objects.borrow_mut()[idx] = unsafe { value.i };
        }
    }
}
