use rayon::prelude::*;

use crate::dtype::FloatElem;
use crate::error::{Error, Result};
use crate::shape::Shape;

// Tile — A contiguous block of already-loaded values
//
// A Tile is what the epilogue sees: the enclosing kernel has already loaded
// (or accumulated) a block of values, and every op here produces a new block
// of the same shape. There are no views and no strides beyond row-major, so
// element i of the output always corresponds to element i of the input.
//
// Ops mirror the handful of tensor-language primitives an epilogue is built
// from:
//
//   add_scalar / mul_scalar  — arithmetic against a literal in the tile dtype
//   ge_scalar                — comparison producing a Mask (u8, 0 or 1)
//   where_cond               — per-element select between two tiles
//
// Large tiles are processed on the rayon pool. The split is by element, so the
// result is identical to the sequential path.

/// Element count above which `map` and `where_cond` go parallel.
pub const PAR_THRESHOLD: usize = 1 << 15;

/// A row-major block of elements with a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile<T> {
    shape: Shape,
    data: Vec<T>,
}

/// Result of a comparison: 1 where the predicate held, 0 elsewhere.
pub type Mask = Tile<u8>;

impl<T: Copy + Send + Sync> Tile<T> {
    /// Create a tile from row-major data. `data.len()` must equal the shape's
    /// element count.
    pub fn from_vec(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        let expected = shape.elem_count();
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(Tile { shape, data })
    }

    /// A rank-0 tile holding one value.
    pub fn scalar(value: T) -> Self {
        Tile {
            shape: Shape::from(()),
            data: vec![value],
        }
    }

    /// A tile with every element set to `value`.
    pub fn full(shape: impl Into<Shape>, value: T) -> Self {
        let shape = shape.into();
        let data = vec![value; shape.elem_count()];
        Tile { shape, data }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn elem_count(&self) -> usize {
        self.data.len()
    }

    /// Row-major element slice.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Element at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Result<T> {
        Ok(self.data[self.shape.flat_index(index)?])
    }

    /// The single value of a rank-0 (or one-element) tile.
    pub fn to_scalar(&self) -> Result<T> {
        match self.data.as_slice() {
            [v] => Ok(*v),
            _ => Err(Error::NotAScalar {
                shape: self.shape.clone(),
            }),
        }
    }

    /// Apply `f` to every element, keeping the shape.
    pub fn map<U, F>(&self, f: F) -> Tile<U>
    where
        U: Copy + Send + Sync,
        F: Fn(T) -> U + Send + Sync,
    {
        let data: Vec<U> = if self.data.len() >= PAR_THRESHOLD {
            log::trace!("tile map: {} elements on the rayon pool", self.data.len());
            self.data.par_iter().map(|&x| f(x)).collect()
        } else {
            self.data.iter().map(|&x| f(x)).collect()
        };
        Tile {
            shape: self.shape.clone(),
            data,
        }
    }

    /// Element-wise select: `out[i] = if mask[i] != 0 { on_true[i] } else { on_false[i] }`.
    ///
    /// All three shapes must be identical; there is no broadcasting.
    pub fn where_cond(mask: &Mask, on_true: &Tile<T>, on_false: &Tile<T>) -> Result<Tile<T>> {
        for other in [on_true.shape(), on_false.shape()] {
            if other != mask.shape() {
                return Err(Error::ShapeMismatch {
                    expected: mask.shape().clone(),
                    got: other.clone(),
                });
            }
        }

        let pick = |((&m, &t), &f): ((&u8, &T), &T)| if m != 0 { t } else { f };
        let data: Vec<T> = if mask.data.len() >= PAR_THRESHOLD {
            mask.data
                .par_iter()
                .zip(on_true.data.par_iter())
                .zip(on_false.data.par_iter())
                .map(pick)
                .collect()
        } else {
            mask.data
                .iter()
                .zip(on_true.data.iter())
                .zip(on_false.data.iter())
                .map(pick)
                .collect()
        };
        Ok(Tile {
            shape: mask.shape.clone(),
            data,
        })
    }
}

impl<T: FloatElem> Tile<T> {
    /// Build a tile of `T` from f64 values, rounding each to `T`.
    pub fn from_f64_slice(data: &[f64], shape: impl Into<Shape>) -> Result<Self> {
        Self::from_vec(data.iter().map(|&v| T::from_f64(v)).collect(), shape)
    }

    /// Widen every element to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.iter().map(|&v| v.as_f64()).collect()
    }

    /// `x + v`, with `v` rounded to `T` first.
    pub fn add_scalar(&self, v: f64) -> Tile<T> {
        let v = T::from_f64(v);
        self.map(move |x| x + v)
    }

    /// `v * x`, with `v` rounded to `T` first.
    pub fn mul_scalar(&self, v: f64) -> Tile<T> {
        let v = T::from_f64(v);
        self.map(move |x| v * x)
    }

    /// Mask of `x >= v`. NaN compares false.
    pub fn ge_scalar(&self, v: f64) -> Mask {
        let v = T::from_f64(v);
        self.map(move |x| u8::from(x >= v))
    }
}
