use std::fmt;

use crate::error::{Error, Result};

// Shape — Geometry of a tile
//
//   []         scalar, one element
//   [128]      a lane group
//   [64, 64]   a GEMM accumulator block
//
// Elementwise ops never change a shape, and select operands must agree
// exactly. The only other job a shape has is turning a multi-dimensional
// index into an offset into row-major data.

/// Dimension sizes of a tile, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Product of the dims: 1 for a scalar, 0 if any dim is 0.
    pub fn elem_count(&self) -> usize {
        self.0.iter().product()
    }

    /// Size of dimension `d`.
    pub fn dim(&self, d: usize) -> Result<usize> {
        self.0.get(d).copied().ok_or(Error::DimOutOfRange {
            dim: d,
            rank: self.rank(),
        })
    }

    /// Row-major offset of `index`. The index must name every dimension and
    /// stay inside each one.
    pub fn flat_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.rank() {
            return Err(Error::DimOutOfRange {
                dim: index.len(),
                rank: self.rank(),
            });
        }
        // Horner over the dims: ((i0 * d1 + i1) * d2 + i2) ...
        index
            .iter()
            .zip(&self.0)
            .enumerate()
            .try_fold(0, |flat, (dim, (&i, &size))| {
                if i >= size {
                    Err(Error::IndexOutOfBounds {
                        index: i,
                        dim,
                        size,
                    })
                } else {
                    Ok(flat * size + i)
                }
            })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}

impl From<()> for Shape {
    fn from(_: ()) -> Self {
        Shape(Vec::new())
    }
}

impl From<usize> for Shape {
    fn from(n: usize) -> Self {
        Shape(vec![n])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Shape(vec![rows, cols])
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape(dims.to_vec())
    }
}
