// Integration tests for the shifted leaky-ReLU epilogue
//
// Exercises the public API the way an enclosing kernel or executor would:
// scalars, lane groups, tiles of several ranks, and the dynamic Operand path.

use approx::assert_relative_eq;
use epilog_core::{
    leaky_relu, leaky_relu_lanes, leaky_relu_tile, Activation, DType, Error, FloatElem,
    LeakyReluConfig, Operand, ShiftedLeakyRelu, Tile, PAR_THRESHOLD,
};
use half::{bf16, f16};
use proptest::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Reference points

#[test]
fn test_reference_points() {
    init_logging();
    assert_eq!(leaky_relu(0.0f64), 1.0);
    assert_eq!(leaky_relu(-1.0f64), 0.0);
    assert_eq!(leaky_relu(-2.0f64), 0.01 * -1.0);
    assert_relative_eq!(leaky_relu(-2.0f64), -0.01);
}

#[test]
fn test_threshold_sits_at_minus_one() {
    // just above -1: pass-through of a tiny positive value
    assert_relative_eq!(leaky_relu(-0.999f64), 0.001, epsilon = 1e-12);
    // just below -1: scaled
    assert_relative_eq!(leaky_relu(-1.001f64), -0.00001, epsilon = 1e-12);
}

// Tiles

#[test]
fn test_tile_ranks() -> epilog_core::Result<()> {
    for dims in [vec![], vec![7], vec![3, 5], vec![2, 3, 4]] {
        let n: usize = dims.iter().product();
        let vals: Vec<f64> = (0..n).map(|i| i as f64 - 4.0).collect();
        let t = Tile::<f32>::from_f64_slice(&vals, dims.clone())?;
        let out = leaky_relu_tile(&t);
        assert_eq!(out.dims(), dims.as_slice());
        for (i, &x) in t.data().iter().enumerate() {
            assert_eq!(out.data()[i], leaky_relu(x));
        }
    }
    Ok(())
}

#[test]
fn test_empty_tile() -> epilog_core::Result<()> {
    let t = Tile::<f32>::from_vec(vec![], (0, 16))?;
    let out = leaky_relu_tile(&t);
    assert_eq!(out.elem_count(), 0);
    assert_eq!(out.dims(), &[0, 16]);
    Ok(())
}

#[test]
fn test_large_tile_uses_same_values() -> epilog_core::Result<()> {
    init_logging();
    let n = PAR_THRESHOLD * 2 + 3;
    let vals: Vec<f64> = (0..n).map(|i| (i as f64) / 1000.0 - 40.0).collect();
    let t = Tile::<f64>::from_f64_slice(&vals, n)?;
    let out = leaky_relu_tile(&t);
    for (x, y) in vals.iter().zip(out.data()) {
        assert_eq!(*y, leaky_relu(*x));
    }
    Ok(())
}

#[test]
fn test_lanes_match_scalar() {
    let xs = [-4.0f32, -1.5, -1.0, -0.25, 0.0, 0.75, 3.0, 100.0];
    let ys = leaky_relu_lanes(xs);
    for (x, y) in xs.iter().zip(ys) {
        assert_eq!(y, leaky_relu(*x));
    }
}

#[test]
fn test_f16_tile() -> epilog_core::Result<()> {
    let t = Tile::<f16>::from_f64_slice(&[-5.0, -1.0, 0.0, 2.0], 4)?;
    let out = leaky_relu_tile(&t);
    let expected = [
        f16::from_f64(0.01) * f16::from_f64(-4.0),
        f16::ZERO,
        f16::ONE,
        f16::from_f64(3.0),
    ];
    assert_eq!(out.data(), &expected);
    Ok(())
}

// NaN and infinities

fn check_specials<T: FloatElem>(out: &[T]) {
    assert!(out[0].is_nan(), "{:?}", out[0]);
    assert_eq!(out[1], T::infinity());
    assert_eq!(out[2], T::neg_infinity());
}

fn specials_tile<T: FloatElem>() -> Tile<T> {
    Tile::from_vec(vec![T::nan(), T::infinity(), T::neg_infinity()], 3).unwrap()
}

#[test]
fn test_specials_through_tile_every_precision() {
    check_specials(leaky_relu_tile(&specials_tile::<f32>()).data());
    check_specials(leaky_relu_tile(&specials_tile::<f64>()).data());
    check_specials(leaky_relu_tile(&specials_tile::<f16>()).data());
    check_specials(leaky_relu_tile(&specials_tile::<bf16>()).data());
}

#[test]
fn test_specials_through_unfused_half() {
    let act = ShiftedLeakyRelu::new();
    check_specials(act.apply_tile_unfused(&specials_tile::<f16>()).unwrap().data());
    check_specials(act.apply_tile_unfused(&specials_tile::<bf16>()).unwrap().data());
}

#[test]
fn test_specials_through_operand() -> epilog_core::Result<()> {
    for x in [
        Operand::from(specials_tile::<f16>()),
        Operand::from(specials_tile::<bf16>()),
        Operand::from(specials_tile::<f32>()),
    ] {
        let dtype = x.dtype();
        let out = x.leaky_relu()?;
        assert_eq!(out.dtype(), dtype);
        let vals = out.to_f64_vec()?;
        assert!(vals[0].is_nan());
        assert_eq!(&vals[1..], &[f64::INFINITY, f64::NEG_INFINITY]);
    }
    Ok(())
}

// Configured activation

#[test]
fn test_custom_slope_and_offset() {
    let act = ShiftedLeakyRelu::with_config(
        LeakyReluConfig::default()
            .with_offset(0.5)
            .with_negative_slope(0.2),
    );
    assert_eq!(act.name(), "leaky_relu");
    assert_relative_eq!(act.apply(-1.5f64), -0.2);
    assert_relative_eq!(act.apply(1.0f64), 1.5);
}

// Dynamic operands

#[test]
fn test_operand_matches_static_path() -> epilog_core::Result<()> {
    let t = Tile::<f32>::from_f64_slice(&[-3.0, -1.0, 0.0, 4.0], (2, 2))?;
    let expected = leaky_relu_tile(&t);
    let out = Operand::from(t).leaky_relu()?;
    assert_eq!(out, Operand::from(expected));
    Ok(())
}

#[test]
fn test_operand_type_mismatch() {
    for bad in [
        Operand::from(Tile::full(3, 1u8)),
        Operand::from(7u32),
        Operand::from(-1i64),
        Operand::from(true),
        Operand::from("not a number"),
    ] {
        let err = bad.leaky_relu().unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }), "{bad}: {err}");
    }
}

#[test]
fn test_operand_dtypes() {
    assert_eq!(Operand::from(1.0f32).dtype(), Some(DType::F32));
    assert_eq!(Operand::from(f16::ONE).dtype(), Some(DType::F16));
    assert_eq!(Operand::from("s").dtype(), None);
    assert!(Operand::from(1.0f64).is_float());
    assert!(!Operand::from(1u8).is_float());
}

// Properties

proptest! {
    #[test]
    fn prop_pass_through_at_or_above_minus_one(x in -1.0f64..1e6) {
        prop_assert_eq!(leaky_relu(x), x + 1.0);
    }

    #[test]
    fn prop_scaled_below_minus_one(x in -1e6f64..-1.0) {
        prop_assume!(x + 1.0 < 0.0);
        prop_assert_eq!(leaky_relu(x), 0.01 * (x + 1.0));
    }

    #[test]
    fn prop_f32_matches_formula(x in -1e4f32..1e4) {
        let y = x + 1.0f32;
        let expected = if y >= 0.0 { y } else { 0.01f32 * y };
        prop_assert_eq!(leaky_relu(x), expected);
    }

    #[test]
    fn prop_tile_is_elementwise(vals in prop::collection::vec(-100.0f64..100.0, 0..64)) {
        let n = vals.len();
        let t = Tile::<f64>::from_vec(vals.clone(), n).unwrap();
        let out = leaky_relu_tile(&t);
        prop_assert_eq!(out.dims(), &[n][..]);
        for (i, x) in vals.iter().enumerate() {
            prop_assert_eq!(out.data()[i], leaky_relu(*x));
        }
    }

    #[test]
    fn prop_unfused_matches_fused(vals in prop::collection::vec(-10.0f32..10.0, 1..32)) {
        let n = vals.len();
        let t = Tile::<f32>::from_vec(vals, n).unwrap();
        let act = ShiftedLeakyRelu::new();
        prop_assert_eq!(act.apply_tile_unfused(&t).unwrap(), act.apply_tile(&t));
    }
}
