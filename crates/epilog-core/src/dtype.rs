use std::fmt;

use num_traits::Float;

// DType — Element types a tile can carry
//
// The activation is only defined for the float dtypes. The integer dtypes
// exist because an enclosing kernel hands over whatever it loaded (indices,
// masks, quantized codes) and the dynamic entry point has to name them when
// it rejects them.
//
//   F16  — 16-bit IEEE half float
//   BF16 — 16-bit brain float
//   F32  — 32-bit float, the usual GEMM accumulator
//   F64  — 64-bit float
//   U8   — unsigned byte, used for select masks
//   U32  — unsigned 32-bit int
//   I64  — signed 64-bit int

/// Enum of all supported element data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F16,
    BF16,
    F32,
    F64,
    U8,
    U32,
    I64,
}

impl DType {
    /// Whether this dtype is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F16 | DType::BF16 | DType::F32 | DType::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::U8 => "u8",
            DType::U32 => "u32",
            DType::I64 => "i64",
        };
        write!(f, "{}", s)
    }
}

// FloatElem — Rust float types the activation can run on
//
// Arithmetic happens in the element's own precision through num_traits::Float,
// so `0.01 * y` on an f32 tile multiplies by the f32 rounding of 0.01, and
// f16/bf16 go through half's native ops.

/// Trait implemented by the Rust float types that can be stored in a tile.
pub trait FloatElem: Float + Copy + Send + Sync + fmt::Debug + 'static {
    /// The corresponding DType enum variant.
    const DTYPE: DType;

    /// Widen this value to f64 (for host-side inspection). Exact for every
    /// implementor.
    fn as_f64(self) -> f64;

    /// Create a value of this type from f64, rounding to the nearest value.
    fn from_f64(v: f64) -> Self;
}

impl FloatElem for f32 {
    const DTYPE: DType = DType::F32;
    fn as_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl FloatElem for f64 {
    const DTYPE: DType = DType::F64;
    fn as_f64(self) -> f64 {
        self
    }
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl FloatElem for half::f16 {
    const DTYPE: DType = DType::F16;
    fn as_f64(self) -> f64 {
        self.to_f64()
    }
    fn from_f64(v: f64) -> Self {
        half::f16::from_f64(v)
    }
}

impl FloatElem for half::bf16 {
    const DTYPE: DType = DType::BF16;
    fn as_f64(self) -> f64 {
        self.to_f64()
    }
    fn from_f64(v: f64) -> Self {
        half::bf16::from_f64(v)
    }
}
