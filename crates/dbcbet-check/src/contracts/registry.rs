//! ContractRegistry: declared types, their operations, and every contract.
//!
//! The registry is the single entry point for declaring a type under
//! contract and for calling its operations. Types are declared with their
//! direct bases; operations are declared with a visibility and a body.
//! Public operations are wrapped by the invocation interceptor at
//! declaration time, so every call through [`ContractRegistry::invoke`] or
//! [`ContractRegistry::call`] is checked.
//!
//! Contract components are attached by id after declaration. Inherited
//! contracts are merged by the composition pass in
//! [`compose`](crate::contracts::compose), which must run once all
//! declarations are in place.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::{Bfs, Reversed};
use petgraph::Directed;

use dbcbet_core::{
    CoreError, ExceptionHierarchy, ExceptionId, Instance, OperationId, OperationKind, TypeId,
    Value, Visibility, CONSTRUCTOR,
};

use crate::contracts::intercept::{intercept, Invoke, RawCall};
use crate::contracts::predicate::{Invariant, Postcondition, Precondition};
use crate::contracts::spec::{ContractSpec, InvariantSpec};
use crate::contracts::OperationRef;
use crate::error::{CallError, ContractDeclarationError, EngineError};

/// Concrete implementation of an operation. Receives the registry so it can
/// make nested checked calls and construct other types.
pub type OperationBody = Arc<
    dyn Fn(&ContractRegistry, &mut Instance, &[Value]) -> Result<Value, CallError> + Send + Sync,
>;

/// Per-type snapshot capability. An `Err` is an engine failure.
pub type SnapshotFn = Arc<dyn Fn(&Instance) -> Result<Instance, String> + Send + Sync>;

/// Declaration of one operation on a type.
pub struct OperationDecl {
    name: String,
    kind: OperationKind,
    visibility: Visibility,
    arity: usize,
    body: OperationBody,
}

impl OperationDecl {
    fn with_kind(
        name: impl Into<String>,
        kind: OperationKind,
        arity: usize,
        body: impl Fn(&ContractRegistry, &mut Instance, &[Value]) -> Result<Value, CallError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        OperationDecl {
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            arity,
            body: Arc::new(body),
        }
    }

    /// A public method taking `arity` arguments.
    pub fn method(
        name: impl Into<String>,
        arity: usize,
        body: impl Fn(&ContractRegistry, &mut Instance, &[Value]) -> Result<Value, CallError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self::with_kind(name, OperationKind::Method, arity, body)
    }

    /// The constructor. Runs on a bare instance carrying the field defaults.
    pub fn constructor(
        arity: usize,
        body: impl Fn(&ContractRegistry, &mut Instance, &[Value]) -> Result<Value, CallError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self::with_kind(CONSTRUCTOR, OperationKind::Constructor, arity, body)
    }

    /// Structural equality against one argument.
    pub fn equality(
        body: impl Fn(&ContractRegistry, &mut Instance, &[Value]) -> Result<Value, CallError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self::with_kind("eq", OperationKind::Equality, 1, body)
    }

    pub fn hash(
        body: impl Fn(&ContractRegistry, &mut Instance, &[Value]) -> Result<Value, CallError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self::with_kind("hash", OperationKind::Hash, 0, body)
    }

    /// String conversion.
    pub fn display(
        body: impl Fn(&ContractRegistry, &mut Instance, &[Value]) -> Result<Value, CallError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self::with_kind("to_string", OperationKind::Display, 0, body)
    }

    /// Marks a method private. Has no effect on the always-public kinds.
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }
}

/// A declared operation with its contract and installed invoker.
pub struct OperationEntry {
    pub(super) owner: TypeId,
    pub(super) name: String,
    pub(super) kind: OperationKind,
    pub(super) visibility: Visibility,
    pub(super) arity: usize,
    pub(super) invoker: Arc<dyn Invoke>,
    pub(super) contract: ContractSpec,
}

impl OperationEntry {
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Effective visibility for contract purposes.
    pub fn is_public(&self) -> bool {
        self.kind.is_public(self.visibility)
    }

    pub fn contract(&self) -> &ContractSpec {
        &self.contract
    }

    /// Whether calls go through the invocation interceptor.
    pub fn is_checked(&self) -> bool {
        self.invoker.is_checked()
    }
}

pub(super) struct TypeEntry {
    pub(super) name: String,
    /// Direct bases in declaration order.
    pub(super) bases: Vec<TypeId>,
    /// Every ancestor, depth-first in base declaration order.
    pub(super) lineage: Vec<TypeId>,
    pub(super) defaults: IndexMap<String, Value>,
    pub(super) operations: IndexMap<String, OperationId>,
    pub(super) invariants: InvariantSpec,
    pub(super) snapshot: Option<SnapshotFn>,
}

/// Registry of types under contract.
pub struct ContractRegistry {
    pub(super) types: Vec<TypeEntry>,
    type_names: HashMap<String, TypeId>,
    pub(super) operations: Vec<OperationEntry>,
    exceptions: ExceptionHierarchy,
    /// Edges point from a derived type to each direct base. Node index equals
    /// type index.
    pub(super) hierarchy: StableGraph<TypeId, (), Directed, u32>,
    /// `(derived, base)` pairs already composed.
    pub(super) merged: HashSet<(TypeId, TypeId)>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        ContractRegistry {
            types: Vec::new(),
            type_names: HashMap::new(),
            operations: Vec::new(),
            exceptions: ExceptionHierarchy::new(),
            hierarchy: StableGraph::new(),
            merged: HashSet::new(),
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Declares a type extending `bases` (direct bases, in order).
    pub fn declare_type(&mut self, name: &str, bases: &[TypeId]) -> Result<TypeId, CoreError> {
        if self.type_names.contains_key(name) {
            return Err(CoreError::DuplicateTypeName {
                name: name.to_string(),
            });
        }
        let mut lineage: Vec<TypeId> = Vec::new();
        for base in bases {
            let entry = self.type_entry(*base)?;
            for ancestor in std::iter::once(*base).chain(entry.lineage.iter().copied()) {
                if !lineage.contains(&ancestor) {
                    lineage.push(ancestor);
                }
            }
        }

        let id = TypeId(self.types.len() as u32);
        let node = self.hierarchy.add_node(id);
        debug_assert_eq!(node.index(), id.index());
        for base in bases {
            self.hierarchy.add_edge(node, NodeIndex::new(base.index()), ());
        }
        self.types.push(TypeEntry {
            name: name.to_string(),
            bases: bases.to_vec(),
            lineage,
            defaults: IndexMap::new(),
            operations: IndexMap::new(),
            invariants: InvariantSpec::new(),
            snapshot: None,
        });
        self.type_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Declares a field and the value a bare instance starts with.
    pub fn declare_field(
        &mut self,
        ty: TypeId,
        name: &str,
        default: impl Into<Value>,
    ) -> Result<(), CoreError> {
        self.type_entry_mut(ty)?
            .defaults
            .insert(name.to_string(), default.into());
        Ok(())
    }

    /// Installs a snapshot capability for `ty` and its subtypes.
    pub fn set_snapshot(
        &mut self,
        ty: TypeId,
        f: impl Fn(&Instance) -> Result<Instance, String> + Send + Sync + 'static,
    ) -> Result<(), CoreError> {
        self.type_entry_mut(ty)?.snapshot = Some(Arc::new(f));
        Ok(())
    }

    /// Declares an operation. Public operations are intercepted.
    pub fn declare_operation(
        &mut self,
        ty: TypeId,
        decl: OperationDecl,
    ) -> Result<OperationId, CoreError> {
        let entry = self.type_entry(ty)?;
        if entry.operations.contains_key(&decl.name) {
            return Err(CoreError::DuplicateOperation {
                type_name: entry.name.clone(),
                operation: decl.name,
            });
        }

        let raw: Arc<dyn Invoke> = Arc::new(RawCall::new(decl.body));
        let invoker = if decl.kind.is_public(decl.visibility) {
            intercept(raw)
        } else {
            raw
        };

        let id = OperationId(self.operations.len() as u32);
        self.operations.push(OperationEntry {
            owner: ty,
            name: decl.name.clone(),
            kind: decl.kind,
            visibility: decl.visibility,
            arity: decl.arity,
            invoker,
            contract: ContractSpec::new(),
        });
        self.type_entry_mut(ty)?.operations.insert(decl.name, id);
        Ok(id)
    }

    /// Declares a user exception category.
    pub fn declare_exception(
        &mut self,
        name: &str,
        parent: ExceptionId,
    ) -> Result<ExceptionId, CoreError> {
        self.exceptions.declare(name, parent)
    }

    pub fn exceptions(&self) -> &ExceptionHierarchy {
        &self.exceptions
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn lookup_type(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    pub fn type_name(&self, ty: TypeId) -> Result<&str, CoreError> {
        Ok(&self.type_entry(ty)?.name)
    }

    pub fn bases(&self, ty: TypeId) -> Result<&[TypeId], CoreError> {
        Ok(&self.type_entry(ty)?.bases)
    }

    /// Every ancestor of `ty`, depth-first.
    pub fn ancestors(&self, ty: TypeId) -> Result<&[TypeId], CoreError> {
        Ok(&self.type_entry(ty)?.lineage)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn operation(&self, op: OperationId) -> Result<&OperationEntry, CoreError> {
        self.operations
            .get(op.index())
            .ok_or(CoreError::OperationNotFound { id: op })
    }

    /// Finds `name` on `ty`, then on its ancestors depth-first.
    pub fn resolve(&self, ty: TypeId, name: &str) -> Option<OperationId> {
        let entry = self.types.get(ty.index())?;
        std::iter::once(ty)
            .chain(entry.lineage.iter().copied())
            .find_map(|t| self.types.get(t.index())?.operations.get(name).copied())
    }

    /// Operations declared directly on `ty`, in declaration order.
    pub fn own_operations(&self, ty: TypeId) -> Result<Vec<OperationId>, CoreError> {
        Ok(self.type_entry(ty)?.operations.values().copied().collect())
    }

    /// Public operations callable on `ty`: its own first, then inherited
    /// ones not overridden, in ancestor order.
    pub fn public_operations(&self, ty: TypeId) -> Result<Vec<OperationId>, CoreError> {
        let entry = self.type_entry(ty)?;
        let mut seen: HashSet<&str> = HashSet::new();
        let mut result = Vec::new();
        for t in std::iter::once(ty).chain(entry.lineage.iter().copied()) {
            for (name, op) in &self.type_entry(t)?.operations {
                if seen.insert(name.as_str()) && self.operation(*op)?.is_public() {
                    result.push(*op);
                }
            }
        }
        Ok(result)
    }

    pub fn contract(&self, op: OperationId) -> Result<&ContractSpec, CoreError> {
        Ok(&self.operation(op)?.contract)
    }

    pub fn invariants(&self, ty: TypeId) -> Result<&InvariantSpec, CoreError> {
        Ok(&self.type_entry(ty)?.invariants)
    }

    /// `TypeName.operation` identity as seen on an instance of `runtime`.
    pub fn operation_ref(
        &self,
        runtime: &Instance,
        op: OperationId,
    ) -> Result<OperationRef, CoreError> {
        Ok(OperationRef {
            type_name: runtime.type_name().to_string(),
            operation: self.operation(op)?.name.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Contract declarations
    // ------------------------------------------------------------------

    /// Appends to the operation's own precondition group (AND).
    pub fn add_precondition(
        &mut self,
        op: OperationId,
        p: Precondition,
    ) -> Result<(), ContractDeclarationError> {
        self.ensure_not_final(op)?;
        self.operation_mut(op)?.contract.push_precondition(p);
        Ok(())
    }

    /// Freezes the operation's precondition. Subtype overrides inherit it
    /// verbatim and nothing may modify it afterwards.
    pub fn mark_final_precondition(
        &mut self,
        op: OperationId,
    ) -> Result<(), ContractDeclarationError> {
        self.operation_mut(op)?.contract.set_final();
        Ok(())
    }

    pub fn add_postcondition(
        &mut self,
        op: OperationId,
        p: Postcondition,
    ) -> Result<(), ContractDeclarationError> {
        self.operation_mut(op)?.contract.push_postcondition(p);
        Ok(())
    }

    pub fn add_invariant(
        &mut self,
        ty: TypeId,
        p: Invariant,
    ) -> Result<(), ContractDeclarationError> {
        self.type_entry_mut(ty)?.invariants.push(p);
        Ok(())
    }

    /// Adds categories to the allowed set. Fails, leaving the set unchanged,
    /// if an override on any subtype, direct or transitive, already allows a
    /// category the widened set does not cover.
    pub fn add_allowed_exceptions(
        &mut self,
        op: OperationId,
        categories: &[ExceptionId],
    ) -> Result<(), ContractDeclarationError> {
        for c in categories {
            self.exceptions.get(*c)?;
        }
        let entry = self.operation(op)?;
        let mut widened: Vec<ExceptionId> = entry
            .contract
            .allowed_exceptions()
            .map(<[ExceptionId]>::to_vec)
            .unwrap_or_default();
        for c in categories {
            if !widened.contains(c) {
                widened.push(*c);
            }
        }

        for (derived, derived_op) in self.subtype_overrides(entry.owner, &entry.name) {
            let Some(declared) = self.operation(derived_op)?.contract.allowed_exceptions() else {
                continue;
            };
            if let Some(category) = declared
                .iter()
                .find(|c| !self.exceptions.covered_by(**c, &widened))
            {
                return Err(ContractDeclarationError::WidenedExceptions {
                    derived: self.type_name(derived)?.to_string(),
                    base: self.type_name(entry.owner)?.to_string(),
                    operation: entry.name.clone(),
                    category: self.exceptions.name(*category).to_string(),
                });
            }
        }

        self.operation_mut(op)?.contract.extend_allowed(categories);
        Ok(())
    }

    /// Overrides of `name` declared on every subtype of `owner`, nearest first.
    fn subtype_overrides(&self, owner: TypeId, name: &str) -> Vec<(TypeId, OperationId)> {
        let subtypes = Reversed(&self.hierarchy);
        let mut bfs = Bfs::new(subtypes, NodeIndex::new(owner.index()));
        let mut overrides = Vec::new();
        while let Some(node) = bfs.next(subtypes) {
            let derived = TypeId(node.index() as u32);
            if derived == owner {
                continue;
            }
            if let Some(op) = self
                .types
                .get(derived.index())
                .and_then(|t| t.operations.get(name))
            {
                overrides.push((derived, *op));
            }
        }
        overrides
    }

    fn ensure_not_final(&self, op: OperationId) -> Result<(), ContractDeclarationError> {
        let entry = self.operation(op)?;
        if entry.contract.is_final() {
            return Err(ContractDeclarationError::FinalPrecondition {
                type_name: self.type_name(entry.owner)?.to_string(),
                operation: entry.name.clone(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// An instance of `ty` holding only field defaults, ancestors' first.
    pub fn bare_instance(&self, ty: TypeId) -> Result<Instance, CoreError> {
        let entry = self.type_entry(ty)?;
        let mut inst = Instance::new(ty, entry.name.clone(), entry.lineage.iter().copied());
        for t in entry.lineage.iter().rev().chain(std::iter::once(&ty)) {
            for (name, value) in &self.type_entry(*t)?.defaults {
                inst.set(name.clone(), value.clone());
            }
        }
        Ok(inst)
    }

    /// Builds an instance through the (possibly inherited) constructor. A
    /// type without a constructor yields its bare instance.
    pub fn construct(&self, ty: TypeId, args: &[Value]) -> Result<Instance, CallError> {
        let mut inst = self.bare_instance(ty)?;
        match self.resolve(ty, CONSTRUCTOR) {
            Some(op) => {
                self.invoke(op, &mut inst, args)?;
            }
            None if args.is_empty() => {}
            None => {
                return Err(EngineError::ArityMismatch {
                    operation: format!("{}.{CONSTRUCTOR}", inst.type_name()),
                    expected: 0,
                    got: args.len(),
                }
                .into())
            }
        }
        Ok(inst)
    }

    /// Calls `name` on `inst`, dispatching on its runtime type.
    pub fn call(
        &self,
        inst: &mut Instance,
        name: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let op = self
            .resolve(inst.type_id(), name)
            .ok_or_else(|| EngineError::UnknownOperation {
                type_name: inst.type_name().to_string(),
                operation: name.to_string(),
            })?;
        self.invoke(op, inst, args)
    }

    /// Calls a specific operation through its installed invoker.
    pub fn invoke(
        &self,
        op: OperationId,
        inst: &mut Instance,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let entry = self.operation(op)?;
        if args.len() != entry.arity {
            return Err(EngineError::ArityMismatch {
                operation: format!("{}.{}", inst.type_name(), entry.name),
                expected: entry.arity,
                got: args.len(),
            }
            .into());
        }
        entry.invoker.invoke(self, op, inst, args)
    }

    /// Independent copy of `inst` via the nearest snapshot capability on
    /// its lineage, or a structural clone.
    pub fn snapshot(&self, inst: &Instance) -> Result<Instance, EngineError> {
        let capability = inst
            .lineage()
            .iter()
            .find_map(|t| self.types.get(t.index())?.snapshot.as_ref());
        match capability {
            Some(f) => f(inst).map_err(|reason| EngineError::SnapshotFailed {
                type_name: inst.type_name().to_string(),
                reason,
            }),
            None => Ok(inst.clone()),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(super) fn type_entry(&self, ty: TypeId) -> Result<&TypeEntry, CoreError> {
        self.types
            .get(ty.index())
            .ok_or(CoreError::TypeNotFound { id: ty })
    }

    pub(super) fn type_entry_mut(&mut self, ty: TypeId) -> Result<&mut TypeEntry, CoreError> {
        self.types
            .get_mut(ty.index())
            .ok_or(CoreError::TypeNotFound { id: ty })
    }

    pub(super) fn operation_mut(
        &mut self,
        op: OperationId,
    ) -> Result<&mut OperationEntry, CoreError> {
        self.operations
            .get_mut(op.index())
            .ok_or(CoreError::OperationNotFound { id: op })
    }
}

impl Default for ContractRegistry {
    fn default() -> Self {
        Self::new()
    }
}
