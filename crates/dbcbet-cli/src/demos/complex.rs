//! Complex numbers in polar and rectangular form.
//!
//! `Complex` declares the accessor contracts, `ComplexOps` the arithmetic
//! contracts, and `Polar` / `Rectangular` supply representations. Accessor
//! postconditions compare against the other representation, so they are
//! checked with a relative tolerance. Arithmetic bodies go through the
//! checked accessors, so an accessor violation surfaces as a failure of the
//! arithmetic call.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use dbcbet_check::contracts::adapters::{argument_types, returns};
use dbcbet_check::{
    CallError, ContractRegistry, Domain, FinitizationRegistry, Invariant, OperationDecl,
    Postcondition, Snapshot,
};
use dbcbet_core::{ExceptionId, Instance, TypeId, Value, ValueKind};

use super::{number, Setup, SetupError};

const TOLERANCE: f64 = 0.005;

/// Relative comparison. Two values summing to zero must match exactly.
fn approx_equal(a: f64, b: f64) -> bool {
    if a + b == 0.0 {
        return a == b;
    }
    (a - b).abs() / (a.abs() + b.abs()) / 2.0 < TOLERANCE
}

/// Maps an angle into `[-pi, pi]`.
fn standardize_angle(rad: f64) -> Result<f64, CallError> {
    if !rad.is_finite() {
        return Err(CallError::raise(
            ExceptionId::VALUE_ERROR,
            format!("cannot standardize angle {rad}"),
        ));
    }
    let rad = rad % TAU;
    Ok(if rad > PI {
        rad - TAU
    } else if rad < -PI {
        rad + TAU
    } else {
        rad
    })
}

/// Both coordinate forms of a complex instance, read from its fields.
#[derive(Debug, Clone, Copy)]
struct Parts {
    re: f64,
    im: f64,
    mag: f64,
    ang: f64,
}

fn parts(inst: &Instance) -> Option<Parts> {
    if inst.has("re") {
        let (re, im) = (inst.get_float("re")?, inst.get_float("img")?);
        Some(Parts {
            re,
            im,
            mag: (re * re + im * im).sqrt(),
            ang: im.atan2(re),
        })
    } else {
        let (mag, ang) = (inst.get_float("mag")?, inst.get_float("ang")?);
        Some(Parts {
            re: mag * ang.cos(),
            im: mag * ang.sin(),
            mag,
            ang,
        })
    }
}

fn rectangular_parts(inst: &Instance) -> Result<Parts, CallError> {
    parts(inst).ok_or_else(|| CallError::type_error("malformed rectangular value"))
}

fn returned_parts(ret: &Value) -> Option<Parts> {
    parts(ret.as_instance()?)
}

/// The single complex argument of a binary operation.
fn operand(args: &[Value]) -> Option<Parts> {
    parts(args.first()?.as_instance()?)
}

/// Calls a zero-argument accessor through its checked entry point.
fn accessor(reg: &ContractRegistry, inst: &mut Instance, name: &str) -> Result<f64, CallError> {
    number(&reg.call(inst, name, &[])?)
}

/// Real and imaginary part, or magnitude and angle, via the accessors.
fn coordinates(
    reg: &ContractRegistry,
    inst: &mut Instance,
    polar: bool,
) -> Result<(f64, f64), CallError> {
    if polar {
        Ok((accessor(reg, inst, "magnitude")?, accessor(reg, inst, "angle")?))
    } else {
        Ok((accessor(reg, inst, "real_part")?, accessor(reg, inst, "imaginary_part")?))
    }
}

fn operand_instance(args: &[Value]) -> Result<Instance, CallError> {
    args[0]
        .as_instance()
        .cloned()
        .ok_or_else(|| CallError::type_error(format!("expected a complex number, got {}", args[0])))
}

/// Postcondition for an accessor: the returned number matches `expected`
/// computed from the post-state.
fn accessor_post(
    name: &str,
    expected: fn(&Parts) -> f64,
) -> Postcondition {
    Postcondition::new(name, move |s, _, r, _| {
        match (parts(s), r.as_float()) {
            (Some(p), Some(r)) => approx_equal(expected(&p), r),
            _ => false,
        }
    })
}

struct Types {
    complex: TypeId,
    ops: TypeId,
    polar: TypeId,
    rectangular: TypeId,
}

pub fn setup() -> Result<Setup, SetupError> {
    let mut reg = ContractRegistry::new();
    let complex = reg.declare_type("Complex", &[])?;
    let ops = reg.declare_type("ComplexOps", &[complex])?;
    let types = Types {
        complex,
        ops,
        polar: reg.declare_type("Polar", &[ops])?,
        rectangular: reg.declare_type("Rectangular", &[ops])?,
    };

    declare_accessors(&mut reg, &types)?;
    let add = declare_arithmetic(&mut reg, &types)?;
    declare_polar(&mut reg, types.polar)?;
    declare_rectangular(&mut reg, types.rectangular)?;
    reg.compose_all()?;

    let mut fin = FinitizationRegistry::new();
    let angles = || Domain::new([-PI, 0.0, FRAC_PI_4, FRAC_PI_2]);
    fin.attach_fields(types.polar, [("mag", Domain::ints(-1..2)), ("ang", angles())]);
    if let Some(ctor) = reg.resolve(types.polar, dbcbet_core::CONSTRUCTOR) {
        fin.attach_arguments(ctor, vec![Domain::ints(-1..2), angles()]);
    }
    fin.attach_fields(
        types.rectangular,
        [("re", Domain::ints(-2..80)), ("img", Domain::ints(-1..2))],
    );
    if let Some(ctor) = reg.resolve(types.rectangular, dbcbet_core::CONSTRUCTOR) {
        fin.attach_arguments(
            ctor,
            vec![Domain::ints(-1..2).with_null(), Domain::ints(-1..2).with_null()],
        );
    }

    let fixtures = [(0, 1), (1, 0), (1, 1)]
        .into_iter()
        .map(|(re, img)| reg.construct(types.rectangular, &[Value::Int(re), Value::Int(img)]))
        .collect::<Result<Vec<_>, _>>()?;
    fin.attach_arguments(add, vec![Domain::new(fixtures)]);

    Ok(Setup {
        registry: reg,
        finitizations: fin,
        targets: vec![types.polar, types.rectangular],
    })
}

/// Accessors on `Complex`. The bodies are placeholders every
/// representation overrides; the contracts are inherited.
fn declare_accessors(reg: &mut ContractRegistry, types: &Types) -> Result<(), SetupError> {
    let accessors: [(&str, fn(&Parts) -> f64); 4] = [
        ("real_part", |p| p.mag * p.ang.cos()),
        ("imaginary_part", |p| p.mag * p.ang.sin()),
        ("magnitude", |p| (p.re * p.re + p.im * p.im).sqrt()),
        ("angle", |p| p.im.atan2(p.re)),
    ];
    for (name, expected) in accessors {
        let op = reg.declare_operation(
            types.complex,
            OperationDecl::method(name, 0, |_, inst, _| {
                Err(CallError::type_error(format!(
                    "{} does not provide a representation",
                    inst.type_name()
                )))
            }),
        )?;
        reg.add_postcondition(op, accessor_post(&format!("{name}_post"), expected))?;
    }
    Ok(())
}

/// `add`, `sub`, `mul` and `div` on `ComplexOps`. Returns `add`.
fn declare_arithmetic(
    reg: &mut ContractRegistry,
    types: &Types,
) -> Result<dbcbet_core::OperationId, SetupError> {
    let (polar, rectangular) = (types.polar, types.rectangular);
    let complex_arg = || [ValueKind::instance_of(types.complex, "Complex")];

    let add = reg.declare_operation(
        types.ops,
        OperationDecl::method("add", 1, move |reg, inst, a| {
            let mut b = operand_instance(a)?;
            let (re, im) = coordinates(reg, inst, false)?;
            let (b_re, b_im) = coordinates(reg, &mut b, false)?;
            let sum = reg.construct(
                rectangular,
                &[Value::Float(re + b_re), Value::Float(im + b_im)],
            )?;
            Ok(Value::from(sum))
        }),
    )?;
    reg.add_precondition(add, argument_types(complex_arg()))?;
    reg.add_postcondition(add, returns("add_post1", |r| !r.is_null()))?;
    reg.add_postcondition(
        add,
        Postcondition::new("add_post2", |s, _, r, a| {
            match (parts(s), operand(a), returned_parts(r)) {
                (Some(x), Some(y), Some(z)) => approx_equal(x.re + y.re, z.re),
                _ => false,
            }
        }),
    )?;
    reg.add_postcondition(
        add,
        Postcondition::new("add_post3", |s, _, r, a| {
            match (parts(s), operand(a), returned_parts(r)) {
                (Some(x), Some(y), Some(z)) => approx_equal(x.im + y.im, z.im),
                _ => false,
            }
        }),
    )?;

    let sub = reg.declare_operation(
        types.ops,
        OperationDecl::method("sub", 1, move |reg, inst, a| {
            let mut b = operand_instance(a)?;
            let (re, im) = coordinates(reg, inst, false)?;
            let (b_re, b_im) = coordinates(reg, &mut b, false)?;
            let diff = reg.construct(
                rectangular,
                &[Value::Float(re - b_re), Value::Float(im - b_im)],
            )?;
            Ok(Value::from(diff))
        }),
    )?;
    reg.add_postcondition(
        sub,
        Postcondition::new("sub_post", |s, _, r, a| {
            match (parts(s), operand(a), returned_parts(r)) {
                (Some(x), Some(y), Some(z)) => {
                    approx_equal(x.re - y.re, z.re) && approx_equal(x.im - y.im, z.im)
                }
                _ => false,
            }
        }),
    )?;

    // mul and div fall back to a NaN rectangular value when the polar
    // constructor rejects the result.
    let polar_or_nan =
        move |reg: &ContractRegistry, mag: f64, ang: f64| -> Result<Value, CallError> {
            match reg.construct(polar, &[Value::Float(mag), Value::Float(ang)]) {
                Ok(p) => Ok(Value::from(p)),
                Err(CallError::Raised(e)) if e.class == ExceptionId::VALUE_ERROR => {
                    let nan = reg.construct(rectangular, &[Value::Float(f64::NAN), Value::Null])?;
                    Ok(Value::from(nan))
                }
                Err(e) => Err(e),
            }
        };

    let mul = reg.declare_operation(
        types.ops,
        OperationDecl::method("mul", 1, move |reg, inst, a| {
            let mut b = operand_instance(a)?;
            let (mag, ang) = coordinates(reg, inst, true)?;
            let (b_mag, b_ang) = coordinates(reg, &mut b, true)?;
            polar_or_nan(reg, mag * b_mag, ang + b_ang)
        }),
    )?;
    reg.add_postcondition(
        mul,
        Postcondition::new("mul_post", |s, old, r, a| product_post(s, old, r, a, false)),
    )?;

    let div = reg.declare_operation(
        types.ops,
        OperationDecl::method("div", 1, move |reg, inst, a| {
            let mut b = operand_instance(a)?;
            let (mag, ang) = coordinates(reg, inst, true)?;
            let (b_mag, b_ang) = coordinates(reg, &mut b, true)?;
            polar_or_nan(reg, mag / b_mag, ang - b_ang)
        }),
    )?;
    reg.add_postcondition(
        div,
        Postcondition::new("div_post", |s, old, r, a| product_post(s, old, r, a, true)),
    )?;

    Ok(add)
}

/// Shared postcondition of `mul` and `div`: magnitudes multiply (divide)
/// and angles add (subtract).
fn product_post(s: &Instance, _old: &Snapshot, r: &Value, a: &[Value], divide: bool) -> bool {
    let (Some(x), Some(y), Some(z)) = (parts(s), operand(a), returned_parts(r)) else {
        return false;
    };
    let (mag, ang) = if divide {
        (x.mag / y.mag, x.ang - y.ang)
    } else {
        (x.mag * y.mag, x.ang + y.ang)
    };
    if mag.is_nan() || x.ang.is_nan() || y.ang.is_nan() {
        return z.re.is_nan() && z.im == 0.0;
    }
    approx_equal(mag, z.mag) && standardize_angle(ang).is_ok_and(|ang| approx_equal(ang, z.ang))
}

fn numeric_fields(names: [&'static str; 2]) -> impl Fn(&Instance) -> bool + Send + Sync {
    move |s| names.iter().all(|n| s.get_float(n).is_some())
}

fn declare_polar(reg: &mut ContractRegistry, polar: TypeId) -> Result<(), SetupError> {
    reg.add_invariant(polar, Invariant::new("polar_invariant", numeric_fields(["mag", "ang"])))?;
    let ctor = reg.declare_operation(
        polar,
        OperationDecl::constructor(2, |_, inst, a| {
            let (mut mag, mut angle) = (number(&a[0])?, number(&a[1])?);
            if mag.is_nan() {
                return Err(CallError::raise(ExceptionId::VALUE_ERROR, "magnitude is NaN"));
            }
            if mag < 0.0 {
                mag = -mag;
                angle += PI;
            }
            inst.set("mag", mag);
            inst.set("ang", standardize_angle(angle)?);
            Ok(Value::Null)
        }),
    )?;
    reg.add_precondition(ctor, argument_types([ValueKind::Number, ValueKind::Number]))?;
    reg.add_allowed_exceptions(ctor, &[ExceptionId::VALUE_ERROR])?;

    let field = |name: &'static str| {
        move |_: &ContractRegistry, inst: &mut Instance, _: &[Value]| -> Result<Value, CallError> {
            Ok(Value::Float(inst.get_float(name).unwrap_or(f64::NAN)))
        }
    };
    reg.declare_operation(
        polar,
        OperationDecl::method("real_part", 0, |_, inst, _| {
            let p = parts(inst).ok_or_else(|| CallError::type_error("malformed polar value"))?;
            Ok(Value::Float(p.re))
        }),
    )?;
    reg.declare_operation(
        polar,
        OperationDecl::method("imaginary_part", 0, |_, inst, _| {
            let p = parts(inst).ok_or_else(|| CallError::type_error("malformed polar value"))?;
            Ok(Value::Float(p.im))
        }),
    )?;
    reg.declare_operation(polar, OperationDecl::method("magnitude", 0, field("mag")))?;
    reg.declare_operation(polar, OperationDecl::method("angle", 0, field("ang")))?;
    reg.declare_operation(
        polar,
        OperationDecl::display(|_, inst, _| {
            Ok(Value::Str(format!(
                "({}, {})",
                inst.get_float("mag").unwrap_or(f64::NAN),
                inst.get_float("ang").unwrap_or(f64::NAN)
            )))
        }),
    )?;
    Ok(())
}

fn declare_rectangular(reg: &mut ContractRegistry, rectangular: TypeId) -> Result<(), SetupError> {
    reg.add_invariant(
        rectangular,
        Invariant::new("rectangular_invariant", numeric_fields(["re", "img"])),
    )?;
    let ctor = reg.declare_operation(
        rectangular,
        OperationDecl::constructor(2, |_, inst, a| {
            let or_zero = |v: &Value| if v.is_null() { Ok(0.0) } else { number(v) };
            let re = or_zero(&a[0])?;
            let img = if re.is_nan() { 0.0 } else { or_zero(&a[1])? };
            inst.set("re", re);
            inst.set("img", img);
            Ok(Value::Null)
        }),
    )?;
    reg.add_precondition(ctor, argument_types([ValueKind::Number, ValueKind::Number]))?;

    let computed = |f: fn(&Parts) -> f64| {
        move |_: &ContractRegistry, inst: &mut Instance, _: &[Value]| -> Result<Value, CallError> {
            let p = rectangular_parts(inst)?;
            Ok(Value::Float(f(&p)))
        }
    };
    reg.declare_operation(rectangular, OperationDecl::method("real_part", 0, computed(|p| p.re)))?;
    reg.declare_operation(
        rectangular,
        OperationDecl::method("imaginary_part", 0, computed(|p| p.im)),
    )?;
    reg.declare_operation(rectangular, OperationDecl::method("magnitude", 0, computed(|p| p.mag)))?;
    reg.declare_operation(rectangular, OperationDecl::method("angle", 0, computed(|p| p.ang)))?;
    reg.declare_operation(
        rectangular,
        OperationDecl::display(|_, inst, _| {
            let p = rectangular_parts(inst)?;
            Ok(Value::Str(format!("{:?} + {:?}*i", p.re, p.im)))
        }),
    )?;
    Ok(())
}
