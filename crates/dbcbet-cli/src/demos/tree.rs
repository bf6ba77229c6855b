//! A full binary tree: every node is a leaf or has both subtrees.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use dbcbet_check::contracts::adapters::{argument_types, post_state, state};
use dbcbet_check::{
    CallError, ContractRegistry, Domain, FinitizationRegistry, Invariant, OperationDecl,
};
use dbcbet_core::{Instance, TypeId, Value, ValueKind};

use super::{Setup, SetupError};

fn is_leaf(t: &Instance) -> bool {
    t.get("left").map_or(true, Value::is_null) && t.get("right").map_or(true, Value::is_null)
}

fn is_full(t: &Instance) -> bool {
    t.get("left").is_some_and(|v| v.as_instance().is_some())
        && t.get("right").is_some_and(|v| v.as_instance().is_some())
}

fn subtree(t: &Instance, side: &str) -> Option<Instance> {
    t.get(side)?.as_instance().cloned()
}

fn render(t: &Instance) -> String {
    let value = t.get("value").map(ToString::to_string).unwrap_or_default();
    match (subtree(t, "left"), subtree(t, "right")) {
        (Some(l), Some(r)) => format!("({value} {} {})", render(&l), render(&r)),
        _ => value,
    }
}

/// Declares an operation storing its argument as the `side` subtree.
fn setter(
    reg: &mut ContractRegistry,
    tree: TypeId,
    name: &str,
    side: &'static str,
    full_required: bool,
) -> Result<dbcbet_core::OperationId, SetupError> {
    let op = reg.declare_operation(
        tree,
        OperationDecl::method(name, 1, move |_, inst, a| {
            inst.set(side, a[0].clone());
            Ok(Value::Null)
        }),
    )?;
    if full_required {
        reg.add_precondition(op, state("is_full", is_full))?;
    }
    reg.add_precondition(op, argument_types([ValueKind::instance_of(tree, "FullBinaryTree")]))?;
    Ok(op)
}

pub fn setup() -> Result<Setup, SetupError> {
    let mut reg = ContractRegistry::new();
    let tree = reg.declare_type("FullBinaryTree", &[])?;
    let tree_kind = || ValueKind::instance_of(tree, "FullBinaryTree");

    reg.add_invariant(
        tree,
        Invariant::new("full_tree_invariant", |t| is_leaf(t) || is_full(t)),
    )?;
    let ctor = reg.declare_operation(
        tree,
        OperationDecl::constructor(1, |_, inst, a| {
            inst.set("value", a[0].clone());
            inst.set("left", Value::Null);
            inst.set("right", Value::Null);
            Ok(Value::Null)
        }),
    )?;

    reg.declare_operation(
        tree,
        OperationDecl::method("leaf", 0, |_, inst, _| Ok(Value::Bool(is_leaf(inst)))),
    )?;
    reg.declare_operation(
        tree,
        OperationDecl::method("full", 0, |_, inst, _| Ok(Value::Bool(is_full(inst)))),
    )?;
    reg.declare_operation(
        tree,
        OperationDecl::method("nodes", 0, |reg, inst, _| {
            let (Some(mut left), Some(mut right)) = (subtree(inst, "left"), subtree(inst, "right"))
            else {
                return Ok(Value::Int(1));
            };
            let count = |reg: &ContractRegistry, t: &mut Instance| -> Result<i64, CallError> {
                reg.call(t, "nodes", &[])?
                    .as_int()
                    .ok_or_else(|| CallError::type_error("nodes returned a non-integer"))
            };
            Ok(Value::Int(1 + count(reg, &mut left)? + count(reg, &mut right)?))
        }),
    )?;

    setter(&mut reg, tree, "add_left_subtree", "left", false)?;
    setter(&mut reg, tree, "add_right_subtree", "right", false)?;

    let add_subtrees = reg.declare_operation(
        tree,
        OperationDecl::method("add_subtrees", 2, |_, inst, a| {
            inst.set("left", a[0].clone());
            inst.set("right", a[1].clone());
            Ok(Value::Null)
        }),
    )?;
    reg.add_precondition(add_subtrees, argument_types([tree_kind(), tree_kind()]))?;
    reg.add_precondition(add_subtrees, state("is_leaf", is_leaf))?;
    reg.add_postcondition(add_subtrees, post_state("is_full", is_full))?;

    let replace_left = setter(&mut reg, tree, "replace_left_subtree", "left", true)?;
    setter(&mut reg, tree, "replace_right_subtree", "right", true)?;

    reg.declare_operation(
        tree,
        OperationDecl::display(|_, inst, _| Ok(Value::Str(render(inst)))),
    )?;
    reg.declare_operation(
        tree,
        OperationDecl::equality(|_, inst, a| {
            Ok(Value::Bool(
                a[0].as_instance().is_some_and(|other| other.fields() == inst.fields()),
            ))
        }),
    )?;
    reg.declare_operation(
        tree,
        OperationDecl::hash(|_, inst, _| {
            let mut hasher = DefaultHasher::new();
            render(inst).hash(&mut hasher);
            Ok(Value::Int(hasher.finish() as i64))
        }),
    )?;
    reg.compose_all()?;

    let leaf = |v: i64| reg.construct(tree, &[Value::Int(v)]);
    let mut fin = FinitizationRegistry::new();
    fin.attach_arguments(ctor, vec![Domain::ints(1..5)]);
    let leaves = Domain::new([leaf(2)?, leaf(3)?]);
    fin.attach_arguments(add_subtrees, vec![leaves.clone(), leaves]);
    fin.attach_arguments(replace_left, vec![Domain::new([leaf(4)?])]);

    Ok(Setup {
        registry: reg,
        finitizations: fin,
        targets: vec![tree],
    })
}
