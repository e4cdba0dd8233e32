use bhl_core::symbol::ClassFlavor;
use bhl_core::{CompileError, SourceLocation, TypeSystem, UpValue};

fn loc(line: u32) -> Option<SourceLocation> {
    Some(SourceLocation::new("game.bhl", line, 1))
}

#[test]
fn defined_symbol_resolves_in_every_scope_kind() {
    let ts = TypeSystem::new().unwrap();
    let module = ts.new_module("game");
    let class = ts.new_class("Unit", None, ClassFlavor::Script, loc(1)).unwrap();
    let func = ts.new_script_func("tick", ts.type_ref("void").unwrap(), loc(2));
    let color = ts.new_enum("Color", loc(3));

    for (scope, name) in [(module, "a"), (class, "b"), (func, "c")] {
        let sym = ts.new_variable(name, ts.type_ref("int").unwrap(), None);
        ts.define_in(scope, sym).unwrap();
        assert_eq!(ts.resolve_in(scope, name).unwrap(), Some(sym));
    }
    let red = ts.try_add_item(color, "Red", 0, None).unwrap();
    assert_eq!(ts.resolve_in(color, "Red").unwrap(), Some(red));
}

#[test]
fn duplicate_definition_leaves_scope_untouched() {
    let ts = TypeSystem::new().unwrap();
    let class = ts.new_class("Unit", None, ClassFlavor::Script, None).unwrap();
    let hp = ts.new_field("hp", ts.type_ref("int").unwrap(), loc(4));
    ts.define_in(class, hp).unwrap();

    let again = ts.new_field("hp", ts.type_ref("float").unwrap(), loc(9));
    let err = ts.define_in(class, again).unwrap_err();
    assert_eq!(err.to_string(), "game.bhl:9:1: already defined symbol 'hp'");
    assert_eq!(ts.members(class).unwrap().len(), 1);
    assert_eq!(ts.resolve_member(class, "hp").unwrap(), Some(hp));
}

#[test]
fn inherited_members_keep_base_slots() {
    let ts = TypeSystem::new().unwrap();
    let a = ts.new_class("A", None, ClassFlavor::Script, loc(1)).unwrap();
    ts.define(a).unwrap();
    let x = ts.new_field("x", ts.type_ref("int").unwrap(), loc(1));
    ts.define_in(a, x).unwrap();

    let b = ts.new_class("B", Some(a), ClassFlavor::Script, loc(2)).unwrap();
    ts.define(b).unwrap();
    let y = ts.new_field("y", ts.type_ref("int").unwrap(), loc(2));
    ts.define_in(b, y).unwrap();

    assert_eq!(ts.resolve_member(b, "y").unwrap(), Some(y));
    assert_eq!(ts.scope_idx(y).unwrap(), Some(1));
    assert_eq!(ts.resolve_member(b, "x").unwrap(), Some(x));
    assert_eq!(ts.scope_idx(x).unwrap(), Some(0));
}

#[test]
fn every_level_of_a_hierarchy_shares_slots() {
    let ts = TypeSystem::new().unwrap();
    let base = ts.new_class("Base", None, ClassFlavor::Script, None).unwrap();
    for name in ["a", "b"] {
        let f = ts.new_field(name, ts.type_ref("int").unwrap(), None);
        ts.define_in(base, f).unwrap();
    }
    let mid = ts.new_class("Mid", Some(base), ClassFlavor::Script, None).unwrap();
    let c = ts.new_field("c", ts.type_ref("int").unwrap(), None);
    ts.define_in(mid, c).unwrap();
    let leaf = ts.new_class("Leaf", Some(mid), ClassFlavor::Script, None).unwrap();

    for name in ["a", "b"] {
        let in_base = ts.resolve_member(base, name).unwrap().unwrap();
        let in_leaf = ts.resolve_member(leaf, name).unwrap().unwrap();
        assert_eq!(ts.scope_idx(in_base).unwrap(), ts.scope_idx(in_leaf).unwrap());
    }
    assert_eq!(ts.scope_idx(c).unwrap(), Some(2));

    let shadow = ts.new_field("a", ts.type_ref("int").unwrap(), None);
    assert!(matches!(
        ts.define_in(leaf, shadow),
        Err(CompileError::DuplicateSymbol { .. })
    ));
}

#[test]
fn nested_closures_chain_upvalues() {
    let ts = TypeSystem::new().unwrap();
    let void = ts.type_ref("void").unwrap();
    let f = ts.new_script_func("f", void.clone(), loc(1));
    ts.define(f).unwrap();
    let arg = ts.new_arg("n", ts.type_ref("int").unwrap(), false, loc(1));
    ts.define_arg(f, arg, false).unwrap();
    let v = ts.new_variable("v", ts.type_ref("int").unwrap(), loc(2));
    ts.define_in(f, v).unwrap();

    let l1 = ts.new_lambda("l1", void.clone(), &[f], loc(3)).unwrap();
    let own = ts.new_variable("own", ts.type_ref("int").unwrap(), loc(4));
    ts.define_in(l1, own).unwrap();
    let l2 = ts.new_lambda("l2", void, &[f, l1], loc(5)).unwrap();

    let from_l2 = ts.resolve_in(l2, "v").unwrap().unwrap();
    assert_ne!(from_l2, v);
    let copy_in_l1 = ts.resolve_local(l1, "v").unwrap().unwrap();
    assert_ne!(copy_in_l1, v);

    assert_eq!(
        ts.upvalues(l1).unwrap(),
        vec![UpValue { name: "v".to_string(), dst_idx: 1, src_idx: 1 }]
    );
    assert_eq!(
        ts.upvalues(l2).unwrap(),
        vec![UpValue { name: "v".to_string(), dst_idx: 0, src_idx: 1 }]
    );

    // arguments are captured the same way
    ts.resolve_in(l2, "n").unwrap().unwrap();
    assert_eq!(ts.upvalues(l2).unwrap().len(), 2);
    assert_eq!(ts.upvalues(l1).unwrap().len(), 2);
}

#[test]
fn closed_blocks_are_not_captured() {
    let ts = TypeSystem::new().unwrap();
    let void = ts.type_ref("void").unwrap();
    let f = ts.new_script_func("f", void.clone(), None);
    let block = ts.open_block(f, None).unwrap();
    let tmp = ts.new_variable("tmp", ts.type_ref("int").unwrap(), None);
    ts.define_in(block, tmp).unwrap();
    ts.close_block(block).unwrap();

    let l = ts.new_lambda("l", void, &[f], None).unwrap();
    assert_eq!(ts.resolve_in(l, "tmp").unwrap(), None);
    assert!(ts.upvalues(l).unwrap().is_empty());
}

#[test]
fn linked_scopes_are_searched_and_guarded() {
    let ts = TypeSystem::new().unwrap();
    let lib = ts.new_module("lib");
    let helper = ts.new_script_func("helper", ts.type_ref("void").unwrap(), loc(1));
    ts.define_in(lib, helper).unwrap();
    ts.link(lib).unwrap();
    ts.link(lib).unwrap();
    assert_eq!(ts.links().unwrap(), vec![lib]);

    assert_eq!(ts.resolve("helper").unwrap(), Some(helper));

    let clash = ts.new_script_func("helper", ts.type_ref("void").unwrap(), loc(7));
    let err = ts.define(clash).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateSymbol { ref at, .. } if at == "game.bhl:7:1"));
}
