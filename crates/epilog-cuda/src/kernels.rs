// CUDA Kernel Source Code — Compiled to PTX at runtime via NVRTC
//
// The epilogue lives here twice:
//
//   DEVICE_SOURCE — `__device__` helpers another kernel calls on values it
//                   already holds in registers (a GEMM calls them on its
//                   accumulator before the store). Splice it in front of that
//                   kernel's source with `with_epilogue`.
//   KERNEL_SOURCE — DEVICE_SOURCE plus standalone `__global__` entry points
//                   that apply the helper to a contiguous buffer.
//
// DESIGN DECISIONS:
// - offset / slope / threshold are kernel arguments, not literals, so one
//   compiled module serves every LeakyReluConfig
// - F16/BF16 promote to F32, but the shifted value is rounded back to the
//   storage type before the compare and the multiply. With constants already
//   rounded on the host this reproduces half-precision arithmetic exactly
// - F16 conversions use inline PTX assembly; BF16 uses bit manipulation,
//   with NaN special-cased (the device's canonical NaN 0x7FFFFFFF would
//   otherwise round to -0.0)

/// `__device__` helpers only. Safe to prepend to any kernel source.
pub const DEVICE_SOURCE: &str = r#"
#ifndef EPILOG_DEVICE_HELPERS
#define EPILOG_DEVICE_HELPERS

__device__ __forceinline__ float f16_to_f32(unsigned short h) {
    float f;
    asm("{ cvt.f32.f16 %0, %1; }" : "=f"(f) : "h"(h));
    return f;
}

__device__ __forceinline__ unsigned short f32_to_f16(float f) {
    unsigned short h;
    asm("{ cvt.rn.f16.f32 %0, %1; }" : "=h"(h) : "f"(f));
    return h;
}

__device__ __forceinline__ float bf16_to_f32(unsigned short h) {
    unsigned int bits = ((unsigned int)h) << 16;
    return __int_as_float(bits);
}

__device__ __forceinline__ unsigned short f32_to_bf16(float f) {
    unsigned int bits = __float_as_int(f);
    // NaN: keep it quiet instead of letting the rounding carry into the sign
    if ((bits & 0x7FFFFFFFu) > 0x7F800000u) return (unsigned short)((bits >> 16) | 0x0040);
    unsigned int rounding_bias = ((bits >> 16) & 1) + 0x7FFF;
    return (unsigned short)((bits + rounding_bias) >> 16);
}

// y = x + offset; y >= threshold ? y : slope * y
__device__ __forceinline__ float epilog_leaky_relu_f32(float x, float offset, float slope, float threshold) {
    float y = x + offset;
    return y >= threshold ? y : slope * y;
}

__device__ __forceinline__ double epilog_leaky_relu_f64(double x, double offset, double slope, double threshold) {
    double y = x + offset;
    return y >= threshold ? y : slope * y;
}

__device__ __forceinline__ unsigned short epilog_leaky_relu_f16(unsigned short x, float offset, float slope, float threshold) {
    float y = f16_to_f32(f32_to_f16(f16_to_f32(x) + offset));
    return y >= threshold ? f32_to_f16(y) : f32_to_f16(slope * y);
}

__device__ __forceinline__ unsigned short epilog_leaky_relu_bf16(unsigned short x, float offset, float slope, float threshold) {
    float y = bf16_to_f32(f32_to_bf16(bf16_to_f32(x) + offset));
    return y >= threshold ? f32_to_bf16(y) : f32_to_bf16(slope * y);
}

#endif
"#;

const GLOBAL_SOURCE: &str = r#"
extern "C" __global__ void leaky_relu_f32(const float* inp, float* out, float offset, float slope, float threshold, unsigned int n) {
    unsigned int idx = blockIdx.x * blockDim.x + threadIdx.x;
    if (idx < n) out[idx] = epilog_leaky_relu_f32(inp[idx], offset, slope, threshold);
}

extern "C" __global__ void leaky_relu_f64(const double* inp, double* out, double offset, double slope, double threshold, unsigned int n) {
    unsigned int idx = blockIdx.x * blockDim.x + threadIdx.x;
    if (idx < n) out[idx] = epilog_leaky_relu_f64(inp[idx], offset, slope, threshold);
}

extern "C" __global__ void leaky_relu_f16(const unsigned short* inp, unsigned short* out, float offset, float slope, float threshold, unsigned int n) {
    unsigned int idx = blockIdx.x * blockDim.x + threadIdx.x;
    if (idx < n) out[idx] = epilog_leaky_relu_f16(inp[idx], offset, slope, threshold);
}

extern "C" __global__ void leaky_relu_bf16(const unsigned short* inp, unsigned short* out, float offset, float slope, float threshold, unsigned int n) {
    unsigned int idx = blockIdx.x * blockDim.x + threadIdx.x;
    if (idx < n) out[idx] = epilog_leaky_relu_bf16(inp[idx], offset, slope, threshold);
}
"#;

/// Prepend the device helpers to a kernel that calls `epilog_leaky_relu_*`.
pub fn with_epilogue(kernel_source: &str) -> String {
    let mut src = String::with_capacity(DEVICE_SOURCE.len() + kernel_source.len() + 1);
    src.push_str(DEVICE_SOURCE);
    src.push('\n');
    src.push_str(kernel_source);
    src
}

/// Full source of the standalone module: device helpers + entry points.
pub fn kernel_source() -> String {
    with_epilogue(GLOBAL_SOURCE)
}

/// All kernel names to load from the standalone module.
pub const KERNEL_NAMES: &[&str] = &[
    "leaky_relu_f32",
    "leaky_relu_f64",
    "leaky_relu_f16",
    "leaky_relu_bf16",
];

/// Module name used in cudarc's PTX loading.
pub const MODULE_NAME: &str = "epilog_kernels";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entry_point_is_defined() {
        let src = kernel_source();
        for name in KERNEL_NAMES {
            assert!(
                src.contains(&format!("__global__ void {name}(")),
                "{name} missing from kernel source"
            );
        }
    }

    #[test]
    fn test_device_source_has_no_entry_points() {
        assert!(!DEVICE_SOURCE.contains("__global__"));
    }

    #[test]
    fn test_bf16_rounding_guards_nan() {
        let helper = DEVICE_SOURCE
            .split("f32_to_bf16(float f) {")
            .nth(1)
            .unwrap();
        let nan_check = helper.find("0x7F800000u").unwrap();
        let rounding = helper.find("rounding_bias").unwrap();
        assert!(nan_check < rounding);
    }

    #[test]
    fn test_with_epilogue_puts_helpers_first() {
        let src = with_epilogue("extern \"C\" __global__ void k() {}");
        let helper = src.find("epilog_leaky_relu_f32").unwrap();
        let kernel = src.find("void k()").unwrap();
        assert!(helper < kernel);
    }
}
