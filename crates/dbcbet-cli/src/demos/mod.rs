//! Demonstration domains: contract-annotated types with finitizations,
//! ready for a bounded-exhaustive run.

pub mod complex;
pub mod example;
pub mod inheritance;
pub mod throws;
pub mod tree;

use dbcbet_check::{
    CallError, ContractDeclarationError, ContractRegistry, FinitizationRegistry,
};
use dbcbet_core::{CoreError, TypeId, Value};

/// Errors while declaring a demo domain.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Declaration(#[from] ContractDeclarationError),

    /// Building a fixture instance failed.
    #[error("fixture construction failed: {0}")]
    Fixture(#[from] CallError),
}

/// A composed registry, its finitizations, and the types to run.
pub struct Setup {
    pub registry: ContractRegistry,
    pub finitizations: FinitizationRegistry,
    pub targets: Vec<TypeId>,
}

pub struct Demo {
    pub name: &'static str,
    pub about: &'static str,
    build: fn() -> Result<Setup, SetupError>,
}

impl Demo {
    pub fn build(&self) -> Result<Setup, SetupError> {
        (self.build)()
    }
}

pub const DEMOS: &[Demo] = &[
    Demo {
        name: "example",
        about: "ExampleClass.do_something with an invariant, two preconditions and two postconditions",
        build: example::setup,
    },
    Demo {
        name: "inheritance",
        about: "Contracts composed from TestBaseClass into TestSubClass",
        build: inheritance::setup,
    },
    Demo {
        name: "throws",
        about: "Allowed exceptions narrowed along a three-level hierarchy",
        build: throws::setup,
    },
    Demo {
        name: "complex",
        about: "Polar and Rectangular complex numbers sharing ComplexOps contracts",
        build: complex::setup,
    },
    Demo {
        name: "tree",
        about: "Full binary tree with a leaf-or-full invariant",
        build: tree::setup,
    },
];

pub fn find(name: &str) -> Option<&'static Demo> {
    DEMOS.iter().find(|d| d.name == name)
}

// ---------------------------------------------------------------------------
// Shared helpers for operation bodies and predicates
// ---------------------------------------------------------------------------

/// Numeric argument, or a `TypeError`.
pub(crate) fn number(v: &Value) -> Result<f64, CallError> {
    v.as_float()
        .ok_or_else(|| CallError::type_error(format!("expected a number, got {v}")))
}

/// Integer argument, or a `TypeError`.
pub(crate) fn integer(v: &Value) -> Result<i64, CallError> {
    v.as_int()
        .ok_or_else(|| CallError::type_error(format!("expected an int, got {v}")))
}
