//! Environment lifecycle and the class/object wrapper surface.
//!
//! The environment is an explicit context object: it owns the runtime
//! backend, is created at most once per process by the runtime's own
//! rules, and tears the runtime down exactly once, on `close` or drop.
//! Classes and objects borrow it, so nothing outlives the runtime.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use kava_types::{Error, Tag, Value};

use crate::abi::{RawHandle, RuntimeAbi};
use crate::native::DynRuntime;
use crate::{dispatch, fields};

/// Runtime interface versions the launch arguments can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
    V12,
    V14,
    V16,
    V18,
}

impl Version {
    /// The version word the runtime's init arguments carry.
    pub(crate) fn code(self) -> u32 {
        match self {
            Version::V12 => 0x0001_0002,
            Version::V14 => 0x0001_0004,
            Version::V16 => 0x0001_0006,
            Version::V18 => 0x0001_0008,
        }
    }
}

/// An ordered list of directories and archives the runtime searches when
/// resolving a class by name.
#[derive(Clone, Debug, Default)]
pub struct Classpath {
    entries: Vec<PathBuf>,
}

impl Classpath {
    pub fn new() -> Classpath {
        Classpath::default()
    }

    pub fn add(mut self, path: impl Into<PathBuf>) -> Classpath {
        self.entries.push(path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Join the entries with the platform's search-path separator.
    pub(crate) fn render(&self) -> String {
        let sep = if cfg!(windows) { ';' } else { ':' };
        let mut out = String::new();
        for entry in &self.entries {
            if !out.is_empty() {
                out.push(sep);
            }
            out.push_str(&entry.to_string_lossy());
        }
        out
    }
}

/// Launch options for the runtime environment: version, classpath, and
/// free-form system properties.
#[derive(Clone, Debug)]
pub struct Options {
    version: Version,
    classpath: Classpath,
    properties: HashMap<String, String>,
}

impl Options {
    pub fn new() -> Options {
        Options {
            version: Version::V16,
            classpath: Classpath::new(),
            properties: HashMap::new(),
        }
    }

    pub fn version(mut self, version: Version) -> Options {
        self.version = version;
        self
    }

    pub fn classpath(mut self, classpath: Classpath) -> Options {
        self.classpath = classpath;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Options {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Render the option strings the runtime's bootstrap consumes.
    pub(crate) fn render(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(1 + self.properties.len());
        if !self.classpath.is_empty() {
            out.push(format!("-Djava.class.path={}", self.classpath.render()));
        }
        let mut props: Vec<_> = self.properties.iter().collect();
        props.sort();
        for (key, value) in props {
            out.push(format!("-D{key}={value}"));
        }
        out
    }

    pub(crate) fn version_code(&self) -> u32 {
        self.version.code()
    }
}

impl Default for Options {
    fn default() -> Options {
        Options::new()
    }
}

/// A live runtime environment.
///
/// Construction bootstraps the runtime through the injected backend and
/// fails with [`Error::Bootstrap`] if the runtime refuses. Teardown runs
/// exactly once, on [`Environment::close`] or on drop.
pub struct Environment {
    abi: Box<dyn RuntimeAbi>,
    open: bool,
}

impl Environment {
    /// Bootstrap the runtime over an injected backend.
    pub fn new(mut abi: Box<dyn RuntimeAbi>, options: &Options) -> Result<Environment, Error> {
        let rendered = options.render();
        let launch: Vec<&str> = rendered.iter().map(String::as_str).collect();
        if !abi.create(options.version_code(), &launch) {
            return Err(Error::Bootstrap);
        }
        Ok(Environment { abi, open: true })
    }

    /// Bootstrap over the shared-library shim at `library`.
    pub fn load(library: impl AsRef<Path>, options: &Options) -> Result<Environment, Error> {
        let backend = DynRuntime::load(library.as_ref())?;
        Environment::new(Box::new(backend), options)
    }

    /// Resolve a class by its binary name.
    pub fn try_class(&self, name: &str) -> Result<Class<'_>, Error> {
        let handle = self.abi.find_class(name);
        if handle.is_null() {
            return Err(Error::ClassNotFound(name.to_string()));
        }
        Ok(Class { env: self, handle })
    }

    /// Resolve a class, collapsing the failure cause.
    pub fn class(&self, name: &str) -> Option<Class<'_>> {
        self.try_class(name).ok()
    }

    /// Tear the runtime down now instead of at drop.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.open {
            self.abi.destroy();
            self.open = false;
        }
    }

    pub(crate) fn abi(&self) -> &dyn RuntimeAbi {
        self.abi.as_ref()
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A resolved class (not an instance of it).
#[derive(Clone, Copy)]
pub struct Class<'env> {
    env: &'env Environment,
    handle: RawHandle,
}

impl<'env> Class<'env> {
    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    /// Construct an instance through the constructor matching `descriptor`.
    pub fn try_construct(&self, descriptor: &str, args: Vec<Value>) -> Result<Object<'env>, Error> {
        let handle = dispatch::construct(self.env.abi(), self.handle, descriptor, args)?;
        Ok(Object {
            env: self.env,
            handle,
        })
    }

    pub fn construct(&self, descriptor: &str, args: Vec<Value>) -> Option<Object<'env>> {
        self.try_construct(descriptor, args).ok()
    }

    /// Invoke a static method. `Ok(None)` is a void result.
    pub fn try_call_static(
        &self,
        name: &str,
        descriptor: &str,
        ret: Tag,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Error> {
        dispatch::invoke_static(self.env.abi(), self.handle, name, descriptor, ret, args)
    }

    /// Invoke a static method, collapsing void results and failures alike
    /// to `None`.
    pub fn call_static(
        &self,
        name: &str,
        descriptor: &str,
        ret: Tag,
        args: Vec<Value>,
    ) -> Option<Value> {
        self.try_call_static(name, descriptor, ret, args)
            .ok()
            .flatten()
    }

    pub fn try_static_field(&self, name: &str, tag: Tag) -> Result<Option<Value>, Error> {
        fields::read_static_field(self.env.abi(), self.handle, name, tag)
    }

    pub fn static_field(&self, name: &str, tag: Tag) -> Option<Value> {
        self.try_static_field(name, tag).ok().flatten()
    }

    pub fn try_set_static_field(&self, name: &str, value: Value) -> Result<(), Error> {
        fields::write_static_field(self.env.abi(), self.handle, name, value)
    }

    pub fn set_static_field(&self, name: &str, value: Value) -> bool {
        self.try_set_static_field(name, value).is_ok()
    }
}

/// An instance of a class, owned by the runtime.
#[derive(Clone, Copy)]
pub struct Object<'env> {
    env: &'env Environment,
    handle: RawHandle,
}

impl Object<'_> {
    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    /// Invoke an instance method. `Ok(None)` is a void result.
    pub fn try_call(
        &self,
        name: &str,
        descriptor: &str,
        ret: Tag,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Error> {
        dispatch::invoke(self.env.abi(), self.handle, name, descriptor, ret, args)
    }

    /// Invoke an instance method, collapsing void results and failures
    /// alike to `None`.
    pub fn call(&self, name: &str, descriptor: &str, ret: Tag, args: Vec<Value>) -> Option<Value> {
        self.try_call(name, descriptor, ret, args).ok().flatten()
    }

    pub fn try_field(&self, name: &str, tag: Tag) -> Result<Option<Value>, Error> {
        fields::read_field(self.env.abi(), self.handle, name, tag)
    }

    pub fn field(&self, name: &str, tag: Tag) -> Option<Value> {
        self.try_field(name, tag).ok().flatten()
    }

    pub fn try_set_field(&self, name: &str, value: Value) -> Result<(), Error> {
        fields::write_field(self.env.abi(), self.handle, name, value)
    }

    pub fn set_field(&self, name: &str, value: Value) -> bool {
        self.try_set_field(name, value).is_ok()
    }
}
