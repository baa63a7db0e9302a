//! # epilog-core
//!
//! The shifted leaky-ReLU used as the epilogue of a matmul pipeline, plus the
//! small amount of tile machinery needed to run it on the CPU.
//!
//! This crate provides:
//! - [`leaky_relu`] / [`leaky_relu_lanes`] / [`leaky_relu_tile`] — the activation
//!   on one element, a fixed-width lane group, and a tile of any shape
//! - [`ShiftedLeakyRelu`] / [`LeakyReluConfig`] — the activation object and its constants
//! - [`Tile`] / [`Mask`] — row-major element blocks with `where_cond` select
//! - [`Operand`] — runtime-typed entry point that rejects non-float input
//! - [`DType`] / [`FloatElem`] — element types (F16, BF16, F32, F64, U8, U32, I64)
// - Activation: y = x + 1; y >= 0 ? y : 0.01 * y (kink at x = -1)
// - Tile: what the enclosing kernel has already loaded
// - Operand: dynamic dispatch on DType for callers without static types

pub mod activation;
pub mod config;
pub mod dtype;
pub mod error;
pub mod operand;
pub mod shape;
pub mod tile;

pub use activation::{leaky_relu, leaky_relu_lanes, leaky_relu_tile, Activation, ShiftedLeakyRelu};
pub use config::LeakyReluConfig;
pub use dtype::{DType, FloatElem};
pub use error::{Error, Result};
pub use operand::Operand;
pub use shape::Shape;
pub use tile::{Mask, Tile, PAR_THRESHOLD};
