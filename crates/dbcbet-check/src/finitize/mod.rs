//! Finite candidate domains for fields and operation arguments.
//!
//! A finitization bounds the search: field domains describe the instance
//! states to synthesize for a type, argument domains describe the calls to
//! attempt for an operation. Both are declared once and read-only during a
//! run.

pub mod candidate;
pub mod enumerate;

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use dbcbet_core::{OperationId, TypeId, Value};

pub use candidate::CandidateBuilder;
pub use enumerate::{combinations, total_combinations, Combinations, IndexVectors};

/// Ordered, finite sequence of candidate values.
///
/// `Value::Null` is an ordinary candidate; it is only present when listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain(Vec<Value>);

impl Domain {
    pub fn new(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Domain(values.into_iter().map(Into::into).collect())
    }

    /// Integer domain, e.g. `Domain::ints(-1..3)`.
    pub fn ints(range: impl IntoIterator<Item = i64>) -> Self {
        Domain(range.into_iter().map(Value::Int).collect())
    }

    /// Puts `Value::Null` first, unless already present.
    pub fn with_null(mut self) -> Self {
        if !self.0.contains(&Value::Null) {
            self.0.insert(0, Value::Null);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }
}

impl FromIterator<Value> for Domain {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Domain(iter.into_iter().collect())
    }
}

/// One field set: field name to assigned value, in declaration order.
pub type FieldAssignment = IndexMap<String, Value>;

/// Renders a field set as `{x: -1, y: null}`.
pub fn format_assignment(assignment: &FieldAssignment) -> String {
    struct Fields<'a>(&'a FieldAssignment);

    impl fmt::Display for Fields<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{{")?;
            for (i, (name, value)) in self.0.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{name}: {value}")?;
            }
            write!(f, "}}")
        }
    }

    Fields(assignment).to_string()
}

/// Field domains per type and argument domains per operation.
#[derive(Debug, Clone, Default)]
pub struct FinitizationRegistry {
    fields: HashMap<TypeId, IndexMap<String, Domain>>,
    arguments: HashMap<OperationId, Vec<Domain>>,
}

impl FinitizationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares field domains for `ty`. Later declarations of the same field
    /// replace earlier ones.
    pub fn attach_fields<N: Into<String>>(
        &mut self,
        ty: TypeId,
        fields: impl IntoIterator<Item = (N, Domain)>,
    ) {
        let entry = self.fields.entry(ty).or_default();
        for (name, domain) in fields {
            entry.insert(name.into(), domain);
        }
    }

    /// Declares per-parameter argument domains for `op`, in parameter order.
    pub fn attach_arguments(&mut self, op: OperationId, domains: Vec<Domain>) {
        if self.arguments.insert(op, domains).is_some() {
            tracing::warn!(operation = %op, "argument finitization replaced");
        }
    }

    pub fn fields(&self, ty: TypeId) -> Option<&IndexMap<String, Domain>> {
        self.fields.get(&ty)
    }

    pub fn arguments(&self, op: OperationId) -> Option<&[Domain]> {
        self.arguments.get(&op).map(Vec::as_slice)
    }

    /// Every field set of `ty` in mixed-radix order, the first field
    /// varying fastest. A type without field domains yields one empty set.
    pub fn field_assignments(&self, ty: TypeId) -> impl Iterator<Item = FieldAssignment> + '_ {
        let (names, domains): (Vec<&str>, Vec<Domain>) = self
            .fields
            .get(&ty)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(name, domain)| (name.as_str(), domain.clone()))
                    .unzip()
            })
            .unwrap_or_default();
        let indices = IndexVectors::new(domains.iter().map(Domain::len).collect(), None);
        indices.map(move |index| {
            names
                .iter()
                .zip(&domains)
                .zip(index)
                .filter_map(|((name, domain), i)| Some((name.to_string(), domain.get(i)?.clone())))
                .collect()
        })
    }
}
