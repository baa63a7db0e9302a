use crate::shape::Shape;

/// All errors that can occur within epilog.
///
/// The activation itself cannot fail on float input; every variant here
/// describes a caller handing over something that is not a float tile, or a
/// backend (CUDA/NVRTC) failure reported through `Msg`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operand is not of a floating-point kind the operation accepts.
    #[error("type mismatch in {op}: expected {expected}, got {got}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        got: String,
    },

    /// Shape mismatch between tiles in a select/combine operation.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// Dimension index out of range for the tile's rank.
    #[error("dimension out of range: dim {dim} for tile with {rank} dimensions")]
    DimOutOfRange { dim: usize, rank: usize },

    /// Multi-dimensional index past the end of a dimension.
    #[error("index out of bounds: index {index} for dim {dim} of size {size}")]
    IndexOutOfBounds { index: usize, dim: usize, size: usize },

    /// Asked for the single value of a tile holding zero or several.
    #[error("not a scalar: tile has shape {shape}")]
    NotAScalar { shape: Shape },

    /// Element count mismatch when creating a tile from a vec.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    /// Shorthand for a `TypeMismatch` where the operation wanted a float.
    pub fn not_float(op: &'static str, got: impl std::fmt::Display) -> Self {
        Error::TypeMismatch {
            op,
            expected: "floating-point (f16, bf16, f32, f64)",
            got: got.to_string(),
        }
    }
}

/// Convenience Result type used throughout epilog.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    #[test]
    fn test_type_mismatch_message() {
        let e = Error::not_float("leaky_relu", DType::I64);
        let msg = e.to_string();
        assert!(msg.contains("leaky_relu"));
        assert!(msg.contains("i64"));
    }

    #[test]
    fn test_bail_macro() {
        fn fails() -> Result<()> {
            crate::bail!("kernel {} missing", "leaky_relu_f32");
        }
        let e = fails().unwrap_err();
        assert_eq!(e.to_string(), "kernel leaky_relu_f32 missing");
    }
}
