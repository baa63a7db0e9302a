// Shifted leaky-ReLU — The GEMM epilogue nonlinearity
//
//   y   = x + 1
//   out = y >= 0 ? y : 0.01 * y
//
// Note the shift happens before the threshold, so the kink sits at x = -1,
// not at x = 0 as in a textbook leaky ReLU. Existing pipelines depend on this
// exact curve; do not "fix" it here. Callers wanting the textbook form can
// build a ShiftedLeakyRelu with `offset = 0`.
//
// Three entry points, from the inside of a kernel outwards:
//
//   leaky_relu(x)           — one element
//   leaky_relu_lanes([x;N]) — a fixed-width register tile, monomorphised per N
//   leaky_relu_tile(&tile)  — a loaded block of any shape
//
// All arithmetic runs in the element type. The literals 1 and 0.01 are rounded
// to T before use, which is what a tensor language does with a float
// literal applied to an f32/f16 tile.

use crate::config::LeakyReluConfig;
use crate::dtype::FloatElem;
use crate::error::Result;
use crate::tile::Tile;

/// An elementwise activation.
pub trait Activation: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Apply to a single element.
    fn apply<T: FloatElem>(&self, x: T) -> T;

    /// Apply to every element of a tile. Shape is preserved.
    fn apply_tile<T: FloatElem>(&self, x: &Tile<T>) -> Tile<T> {
        x.map(|v| self.apply(v))
    }
}

/// Leaky ReLU with a pre-threshold shift.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShiftedLeakyRelu {
    config: LeakyReluConfig,
}

impl ShiftedLeakyRelu {
    /// The epilogue activation (offset 1, slope 0.01, threshold 0).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LeakyReluConfig) -> Self {
        ShiftedLeakyRelu { config }
    }

    pub fn config(&self) -> &LeakyReluConfig {
        &self.config
    }

    /// The same computation written as separate tile ops, the way the
    /// epilogue is expressed before fusion:
    ///
    ///   y = x + offset; where(y >= threshold, y, slope * y)
    ///
    /// Agrees elementwise with `apply_tile`; it allocates three
    /// intermediates, so prefer `apply_tile` on hot paths.
    pub fn apply_tile_unfused<T: FloatElem>(&self, x: &Tile<T>) -> Result<Tile<T>> {
        let y = x.add_scalar(self.config.offset);
        let mask = y.ge_scalar(self.config.threshold);
        let scaled = y.mul_scalar(self.config.negative_slope);
        Tile::where_cond(&mask, &y, &scaled)
    }
}

impl Activation for ShiftedLeakyRelu {
    fn name(&self) -> &'static str {
        "leaky_relu"
    }

    #[inline]
    fn apply<T: FloatElem>(&self, x: T) -> T {
        let y = x + T::from_f64(self.config.offset);
        if y >= T::from_f64(self.config.threshold) {
            y
        } else {
            T::from_f64(self.config.negative_slope) * y
        }
    }
}

/// The epilogue activation on one element.
#[inline]
pub fn leaky_relu<T: FloatElem>(x: T) -> T {
    ShiftedLeakyRelu::new().apply(x)
}

/// The epilogue activation on a fixed-width lane group.
pub fn leaky_relu_lanes<T: FloatElem, const N: usize>(x: [T; N]) -> [T; N] {
    x.map(leaky_relu)
}

/// The epilogue activation on a tile of any shape.
pub fn leaky_relu_tile<T: FloatElem>(x: &Tile<T>) -> Tile<T> {
    ShiftedLeakyRelu::new().apply_tile(x)
}
