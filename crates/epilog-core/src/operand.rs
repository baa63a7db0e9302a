use std::fmt;

use half::{bf16, f16};

use crate::activation::{Activation, ShiftedLeakyRelu};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::tile::Tile;

// Operand — Runtime-typed input for the dynamic entry point
//
// The generic functions in `activation` only accept float element types, so a
// wrong input is a compile error there. Operand exists for callers that only
// know the element type at runtime (a graph executor, an FFI boundary, a
// kernel dispatcher keyed by DType). It carries every DType a tile can hold
// plus two non-numeric values, and the activation rejects anything that is
// not a float tile with `Error::TypeMismatch`.
//
// Scalars are rank-0 tiles.

/// A value handed to the activation whose type is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    F16(Tile<f16>),
    BF16(Tile<bf16>),
    F32(Tile<f32>),
    F64(Tile<f64>),
    U8(Tile<u8>),
    U32(Tile<u32>),
    I64(Tile<i64>),
    Bool(bool),
    Str(String),
}

impl Operand {
    /// Element dtype, or `None` for non-numeric operands.
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Operand::F16(_) => Some(DType::F16),
            Operand::BF16(_) => Some(DType::BF16),
            Operand::F32(_) => Some(DType::F32),
            Operand::F64(_) => Some(DType::F64),
            Operand::U8(_) => Some(DType::U8),
            Operand::U32(_) => Some(DType::U32),
            Operand::I64(_) => Some(DType::I64),
            Operand::Bool(_) | Operand::Str(_) => None,
        }
    }

    /// Tile shape, or `None` for non-numeric operands.
    pub fn shape(&self) -> Option<&Shape> {
        match self {
            Operand::F16(t) => Some(t.shape()),
            Operand::BF16(t) => Some(t.shape()),
            Operand::F32(t) => Some(t.shape()),
            Operand::F64(t) => Some(t.shape()),
            Operand::U8(t) => Some(t.shape()),
            Operand::U32(t) => Some(t.shape()),
            Operand::I64(t) => Some(t.shape()),
            Operand::Bool(_) | Operand::Str(_) => None,
        }
    }

    pub fn is_float(&self) -> bool {
        self.dtype().is_some_and(|d| d.is_float())
    }

    /// Widen a numeric operand to f64 values in row-major order.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        match self {
            Operand::F16(t) => Ok(t.to_f64_vec()),
            Operand::BF16(t) => Ok(t.to_f64_vec()),
            Operand::F32(t) => Ok(t.to_f64_vec()),
            Operand::F64(t) => Ok(t.to_f64_vec()),
            Operand::U8(t) => Ok(t.data().iter().map(|&v| v as f64).collect()),
            Operand::U32(t) => Ok(t.data().iter().map(|&v| v as f64).collect()),
            Operand::I64(t) => Ok(t.data().iter().map(|&v| v as f64).collect()),
            Operand::Bool(_) | Operand::Str(_) => {
                Err(Error::TypeMismatch {
                    op: "to_f64_vec",
                    expected: "numeric",
                    got: self.to_string(),
                })
            }
        }
    }

    /// Apply an activation, keeping dtype and shape.
    pub fn apply<A: Activation>(&self, act: &A) -> Result<Operand> {
        log::debug!("{} on {}", act.name(), self);
        match self {
            Operand::F16(t) => Ok(Operand::F16(act.apply_tile(t))),
            Operand::BF16(t) => Ok(Operand::BF16(act.apply_tile(t))),
            Operand::F32(t) => Ok(Operand::F32(act.apply_tile(t))),
            Operand::F64(t) => Ok(Operand::F64(act.apply_tile(t))),
            _ => Err(Error::not_float(act.name(), self)),
        }
    }

    /// The epilogue activation (`y = x + 1; y >= 0 ? y : 0.01 * y`).
    pub fn leaky_relu(&self) -> Result<Operand> {
        self.apply(&ShiftedLeakyRelu::new())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.dtype(), self.shape()) {
            (Some(dtype), Some(shape)) => write!(f, "{dtype}{shape}"),
            _ => match self {
                Operand::Bool(_) => write!(f, "bool"),
                _ => write!(f, "str"),
            },
        }
    }
}

macro_rules! operand_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Tile<$ty>> for Operand {
                fn from(t: Tile<$ty>) -> Self {
                    Operand::$variant(t)
                }
            }

            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::$variant(Tile::scalar(v))
                }
            }
        )*
    };
}

operand_from!(
    f16 => F16,
    bf16 => BF16,
    f32 => F32,
    f64 => F64,
    u8 => U8,
    u32 => U32,
    i64 => I64,
);

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Operand::Bool(v)
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Operand::Str(v.to_string())
    }
}

impl From<String> for Operand {
    fn from(v: String) -> Self {
        Operand::Str(v)
    }
}
