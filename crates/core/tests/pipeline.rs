use bhl_core::pipeline::{CompilationExecutor, CompilationUnit, CompileStats};
use bhl_core::{CompileConf, CompileError, Result, SourceLocation, TypeSystem};

/// Declares `exports` as globals; checking builds a module-local body and
/// resolves `imports` from inside it.
struct Unit {
    name: String,
    exports: Vec<&'static str>,
    imports: Vec<&'static str>,
}

impl Unit {
    fn boxed(name: &str, exports: &[&'static str], imports: &[&'static str]) -> Box<dyn CompilationUnit> {
        Box::new(Unit {
            name: name.to_string(),
            exports: exports.to_vec(),
            imports: imports.to_vec(),
        })
    }

    fn loc(&self) -> Option<SourceLocation> {
        Some(SourceLocation::new(format!("{}.bhl", self.name), 1, 1))
    }
}

impl CompilationUnit for Unit {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare(&self, ts: &TypeSystem) -> Result<()> {
        for export in &self.exports {
            let func = ts.new_script_func(export, ts.type_ref("void")?, self.loc());
            ts.define(func)?;
        }
        Ok(())
    }

    fn check(&self, ts: &TypeSystem) -> Result<()> {
        let module = ts.new_module(&self.name);
        let body = ts.new_script_func("$body", ts.type_ref("void")?, self.loc());
        ts.define_in(module, body)?;
        let local = ts.new_variable("tmp", ts.type_ref("int")?, self.loc());
        ts.define_in(body, local)?;
        assert_eq!(ts.resolve_in(body, "tmp")?, Some(local));
        for import in &self.imports {
            ts.require(body, import, self.loc().as_ref())?;
        }
        Ok(())
    }
}

fn conf(threads: usize) -> CompileConf {
    CompileConf {
        max_threads: threads,
        ..CompileConf::default()
    }
}

#[test]
fn units_see_each_others_declarations() {
    let ts = TypeSystem::new().unwrap();
    let mut units = vec![
        Unit::boxed("a", &["alpha"], &["beta", "gamma"]),
        Unit::boxed("b", &["beta"], &["alpha"]),
        Unit::boxed("c", &["gamma"], &["alpha", "beta", "start"]),
    ];
    let stats = CompilationExecutor::new(conf(4)).exec(&ts, &mut units).unwrap();
    assert_eq!(stats, CompileStats { units: 3, threads: 4 });
}

#[test]
fn duplicate_across_units_fails_in_declare_phase() {
    let ts = TypeSystem::new().unwrap();
    let mut units = vec![
        Unit::boxed("a", &["shared"], &[]),
        Unit::boxed("b", &["shared"], &[]),
    ];
    let err = CompilationExecutor::new(conf(2)).exec(&ts, &mut units).unwrap_err();
    match err {
        CompileError::DuplicateSymbol { at, name } => {
            assert_eq!(at, "b.bhl:1:1");
            assert_eq!(name, "shared");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn first_check_error_in_unit_order_wins() {
    let ts = TypeSystem::new().unwrap();
    let mut units = vec![
        Unit::boxed("z", &[], &[]),
        Unit::boxed("y", &[], &["missing_y"]),
        Unit::boxed("x", &[], &["missing_x"]),
    ];
    let conf = CompileConf {
        deterministic: true,
        ..conf(3)
    };
    let err = CompilationExecutor::new(conf).exec(&ts, &mut units).unwrap_err();
    assert_eq!(err.to_string(), "x.bhl:1:1: symbol 'missing_x' not resolved");
    assert_eq!(units[0].name(), "x");
}

#[test]
fn zero_threads_is_treated_as_one() {
    let ts = TypeSystem::new().unwrap();
    let mut units = vec![Unit::boxed("only", &["main"], &["main"])];
    let stats = CompilationExecutor::new(conf(0)).exec(&ts, &mut units).unwrap();
    assert_eq!(stats.threads, 1);
}
