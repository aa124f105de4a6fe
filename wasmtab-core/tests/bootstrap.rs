use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use mlua::StdLib;
use wasmtab_core::{
    BootstrapError, Created, GeneratedTables, LibraryLoaded, LuaHost, RegistrationError, Runtime,
    RuntimeConfig, RuntimeHost, TableProvider, TableSet, bootstrap, bootstrap_with, tables,
};

type Calls = Rc<RefCell<Vec<&'static str>>>;

/// Wraps a `LuaHost`, recording each step and optionally failing creation.
struct RecordingHost {
    inner: LuaHost,
    calls: Calls,
    fail_create: bool,
}

impl RecordingHost {
    fn new(calls: &Calls) -> Self {
        Self {
            inner: LuaHost::default(),
            calls: Rc::clone(calls),
            fail_create: false,
        }
    }
}

impl RuntimeHost for RecordingHost {
    fn create_runtime(&mut self) -> Result<Runtime<Created>, BootstrapError> {
        self.calls.borrow_mut().push("create");
        if self.fail_create {
            return Err(BootstrapError::Allocation("not enough memory".into()));
        }
        self.inner.create_runtime()
    }

    fn load_standard_library(
        &mut self,
        runtime: Runtime<Created>,
    ) -> Result<Runtime<LibraryLoaded>, BootstrapError> {
        self.calls.borrow_mut().push("load");
        self.inner.load_standard_library(runtime)
    }
}

struct RecordingProvider {
    inner: GeneratedTables,
    calls: Calls,
}

impl TableProvider for RecordingProvider {
    fn names(&self) -> Vec<String> {
        self.inner.names()
    }

    fn inject(&self, runtime: &Runtime<LibraryLoaded>) -> Result<(), RegistrationError> {
        // The standard library must already be in place.
        assert!(runtime.lua().globals().contains_key("string").unwrap());
        self.calls.borrow_mut().push("register");
        self.inner.inject(runtime)
    }
}

fn recording_provider(calls: &Calls) -> RecordingProvider {
    RecordingProvider {
        inner: GeneratedTables::builtin().unwrap(),
        calls: Rc::clone(calls),
    }
}

#[test]
fn steps_run_in_order() {
    let calls = Calls::default();
    let mut host = RecordingHost::new(&calls);
    let provider = recording_provider(&calls);

    bootstrap_with(&mut host, &provider).unwrap();
    assert_eq!(*calls.borrow(), ["create", "load", "register"]);
}

#[test]
fn failed_creation_stops_the_sequence() {
    let calls = Calls::default();
    let mut host = RecordingHost::new(&calls);
    host.fail_create = true;
    let provider = recording_provider(&calls);

    let err = bootstrap_with(&mut host, &provider).err().unwrap();
    assert!(matches!(err, BootstrapError::Allocation(_)));
    assert_eq!(*calls.borrow(), ["create"]);
}

#[test]
fn every_declared_name_resolves_from_a_script() {
    let runtime = bootstrap(&RuntimeConfig::default()).unwrap();
    let set = tables::builtin().unwrap();
    for name in set.names() {
        let kind: String = runtime
            .eval(&format!("return type({name})"))
            .unwrap();
        assert_eq!(kind, "table", "{name}");
    }
}

#[test]
fn only_table_names_are_added_to_globals() {
    let config = RuntimeConfig::default();

    let mut host = LuaHost::new(config.clone());
    let fresh = host.create_runtime().unwrap();
    let fresh = host.load_standard_library(fresh).unwrap();
    let mut expected = fresh.global_names().unwrap();
    drop(fresh);

    expected.extend(tables::builtin().unwrap().names().map(str::to_string));
    expected.sort();

    let runtime = bootstrap(&config).unwrap();
    assert_eq!(runtime.global_names().unwrap(), expected);
}

#[test]
fn scripts_can_build_a_module_description() {
    let runtime = bootstrap(&RuntimeConfig::default()).unwrap();
    let params: i64 = runtime
        .eval(
            r#"
            local wasm = require("wasm")
            local sig = wasm.func_type_t.new(-0x20, nil, { -1, -1 }, nil, { -1 })
            local types = W_Type_Section(nil, { sig })

            local limit = resizable_limit_t(1, 1, 16)
            local import = import_entry_t.new(3, "env", 6, "memory", 2, memory_type_t(limit))
            local imports = W_Import_Section(1, { import })
            assert(imports:entries()[1]:type():resizable_limit():maximum() == 16)

            assert(types:count() == 1)
            return types:entries()[1]:param_count()
            "#,
        )
        .unwrap();
    assert_eq!(params, 2);
}

#[test]
fn import_type_follows_import_kind() {
    let runtime = bootstrap(&RuntimeConfig::default()).unwrap();
    runtime
        .exec(
            r#"
            local func = import_entry_t.new(3, "env", 1, "f", 0, 7)
            assert(func:type() == 7)
            local ok = pcall(import_entry_t.new, 3, "env", 1, "g", 3, 7)
            assert(not ok)
            "#,
        )
        .unwrap();
}

#[test]
fn memory_limit_fails_before_registration() {
    let calls = Calls::default();
    let mut host = LuaHost::new(RuntimeConfig::new().with_memory_limit(1));
    let provider = recording_provider(&calls);

    let err = bootstrap_with(&mut host, &provider).err().unwrap();
    assert!(matches!(err, BootstrapError::StandardLibrary(_)));
    assert!(calls.borrow().is_empty());
}

#[test]
fn colliding_names_fail_registration() {
    let set = TableSet::from_json(
        r#"{ "read": [ { "tag": "m", "name": "math", "fields": [] } ] }"#,
    )
    .unwrap();
    let provider = GeneratedTables::new(Arc::new(set));
    let mut host = LuaHost::default();

    let err = bootstrap_with(&mut host, &provider).err().unwrap();
    assert!(matches!(
        err,
        BootstrapError::Registration(RegistrationError::NameCollision(ref name)) if name == "math"
    ));
}

#[test]
fn libraries_follow_configuration() {
    let config = RuntimeConfig::new()
        .with_libraries(StdLib::STRING | StdLib::TABLE)
        .with_module_name(None);
    let runtime = bootstrap(&config).unwrap();
    let names = runtime.global_names().unwrap();
    assert!(names.iter().any(|n| n == "string"));
    assert!(!names.iter().any(|n| n == "io"));
    assert!(names.iter().any(|n| n == "W_Start_Section"));
}

#[test]
fn runtimes_are_independent() {
    let a = bootstrap(&RuntimeConfig::default()).unwrap();
    let b = bootstrap(&RuntimeConfig::default()).unwrap();
    a.exec("W_Start_Section = nil").unwrap();
    drop(a);
    let kind: String = b.eval("return type(W_Start_Section)").unwrap();
    assert_eq!(kind, "table");
}

#[test]
fn entry_point_completes_without_arguments() {
    assert_eq!(wasmtab_core::run(), std::process::ExitCode::SUCCESS);
}
