//! Operation dispatch, generic over the floating-point width.

use super::task::OpKind;
use crate::config::Precision;

/// Floating-point type the worker can compute in.
pub trait Numeric: Copy + Send + 'static {
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
    fn sin(self) -> Self;
    fn sqrt(self) -> Self;
    fn square(self) -> Self;
}

impl Numeric for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn sin(self) -> Self {
        f64::sin(self)
    }

    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    fn square(self) -> Self {
        self * self
    }
}

impl Numeric for f32 {
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn sin(self) -> Self {
        f32::sin(self)
    }

    fn sqrt(self) -> Self {
        f32::sqrt(self)
    }

    fn square(self) -> Self {
        self * self
    }
}

/// Apply `kind` to `argument` in `T`. `None` for unrecognized kinds.
///
/// Domain errors follow IEEE semantics: `sqrt` of a negative is NaN.
pub fn evaluate<T: Numeric>(kind: OpKind, argument: f64) -> Option<f64> {
    let x = T::from_f64(argument);
    let y = match kind {
        OpKind::Sine => x.sin(),
        OpKind::SquareRoot => x.sqrt(),
        OpKind::Square => x.square(),
        OpKind::Unrecognized(_) => return None,
    };
    Some(y.to_f64())
}

pub fn evaluate_with(precision: Precision, kind: OpKind, argument: f64) -> Option<f64> {
    match precision {
        Precision::Single => evaluate::<f32>(kind, argument),
        Precision::Double => evaluate::<f64>(kind, argument),
    }
}
