// CUDA Backend — The epilogue activation on NVIDIA GPUs via cudarc
//
// The kernel is CUDA C compiled at runtime by NVRTC, so a device gets code
// targeted at its own compute capability without a build-time toolchain.
//
// ARCHITECTURE:
// - CudaDevice wraps cudarc's device handle and owns the compiled module
// - CudaStorage is an enum over CudaSlice<T> for the four float dtypes
// - CudaTile is storage + shape; it never changes shape
// - F16 and BF16 are stored as CudaSlice<u16> and computed via promote-to-F32
//   device helpers that round back to the storage type between steps
// - Other kernels reuse the helpers by compiling `with_epilogue(their_src)`
//   through `CudaDevice::compile_module`
//
// USAGE:
//   let device = CudaDevice::new(0)?;  // GPU ordinal 0
//   let x = device.upload(&Operand::from(tile))?;
//   let y = device.leaky_relu(&x, &LeakyReluConfig::default())?;
//   let host = device.download(&y)?;

mod kernels;

use cudarc::driver::{CudaFunction, CudaSlice, DeviceSlice, LaunchAsync, LaunchConfig};
use cudarc::nvrtc::{compile_ptx_with_opts, CompileOptions};
use half::{bf16, f16};
use std::fmt;
use std::sync::Arc;

use epilog_core::dtype::DType;
use epilog_core::error::{Error, Result};
use epilog_core::shape::Shape;
use epilog_core::tile::Tile;
use epilog_core::{LeakyReluConfig, Operand};

pub use kernels::{kernel_source, with_epilogue, DEVICE_SOURCE, KERNEL_NAMES, MODULE_NAME};

// BlockConfig — Threads per block for the elementwise launch

/// Launch geometry for elementwise kernels: one thread per element,
/// `block_size` threads per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockConfig {
    pub block_size: u32,
}

impl Default for BlockConfig {
    fn default() -> Self {
        BlockConfig { block_size: 256 }
    }
}

impl BlockConfig {
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// cudarc launch configuration covering `n` elements.
    pub fn launch_cfg(&self, n: u32) -> LaunchConfig {
        let block = self.block_size.max(1);
        let grid = n.div_ceil(block);
        LaunchConfig {
            block_dim: (block, 1, 1),
            grid_dim: (grid.max(1), 1, 1),
            shared_mem_bytes: 0,
        }
    }
}

// CudaDevice — Wraps a cudarc CUDA device with the compiled epilogue module

/// A CUDA device handle with the epilogue kernels loaded. Clonable (uses Arc
/// internally).
#[derive(Clone)]
pub struct CudaDevice {
    dev: Arc<cudarc::driver::CudaDevice>,
    arch: &'static str,
    block: BlockConfig,
    ordinal: usize,
}

impl CudaDevice {
    /// Create a new CUDA device for the given GPU ordinal (0, 1, ...).
    /// Compiles the epilogue kernels on creation.
    pub fn new(ordinal: usize) -> Result<Self> {
        let dev = cudarc::driver::CudaDevice::new(ordinal)
            .map_err(|e| Error::msg(format!("CUDA device creation failed: {e}")))?;

        // Target the device's own compute capability with NVRTC.
        // sm_XX (native SASS) avoids PTX version mismatches between the
        // toolkit and the driver.
        let major = dev
            .attribute(cudarc::driver::sys::CUdevice_attribute_enum::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)
            .unwrap_or(8);
        let minor = dev
            .attribute(cudarc::driver::sys::CUdevice_attribute_enum::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)
            .unwrap_or(0);
        let arch: &'static str = Box::leak(format!("sm_{major}{minor}").into_boxed_str());

        let device = CudaDevice {
            dev,
            arch,
            block: BlockConfig::default(),
            ordinal,
        };
        device.compile_module(MODULE_NAME, &kernel_source(), KERNEL_NAMES)?;
        Ok(device)
    }

    /// Use a different launch geometry for elementwise kernels.
    pub fn with_block_config(mut self, block: BlockConfig) -> Self {
        self.block = block;
        self
    }

    /// Get the underlying cudarc device handle.
    pub fn device(&self) -> &Arc<cudarc::driver::CudaDevice> {
        &self.dev
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn block_config(&self) -> BlockConfig {
        self.block
    }

    /// Compile `source` with NVRTC for this device and load it as `module`.
    ///
    /// Kernels that call `epilog_leaky_relu_*` should pass
    /// `with_epilogue(their_source)`.
    pub fn compile_module(
        &self,
        module: &'static str,
        source: &str,
        names: &'static [&'static str],
    ) -> Result<()> {
        log::debug!(
            "compiling module '{module}' ({} kernels) for {} on cuda:{}",
            names.len(),
            self.arch,
            self.ordinal
        );
        let opts = CompileOptions {
            arch: Some(self.arch),
            ..Default::default()
        };
        let ptx = compile_ptx_with_opts(source, opts)
            .map_err(|e| Error::msg(format!("NVRTC compilation failed: {e}")))?;
        self.dev
            .load_ptx(ptx, module, names)
            .map_err(|e| Error::msg(format!("PTX load failed: {e}")))
    }

    /// Get a compiled kernel function by module and name.
    pub fn get_func(&self, module: &str, name: &str) -> Result<CudaFunction> {
        self.dev
            .get_func(module, name)
            .ok_or_else(|| Error::msg(format!("CUDA kernel '{module}::{name}' not found")))
    }

    //  Host <-> device

    /// Copy a float operand to the device. Non-float operands are rejected.
    pub fn upload(&self, operand: &Operand) -> Result<CudaTile> {
        let shape = operand
            .shape()
            .cloned()
            .ok_or_else(|| Error::not_float("upload", operand))?;
        let storage = match operand {
            Operand::F16(t) => CudaStorage::F16(self.htod(t.data().iter().map(|v| v.to_bits()).collect())?),
            Operand::BF16(t) => CudaStorage::BF16(self.htod(t.data().iter().map(|v| v.to_bits()).collect())?),
            Operand::F32(t) => CudaStorage::F32(self.htod(t.data().to_vec())?),
            Operand::F64(t) => CudaStorage::F64(self.htod(t.data().to_vec())?),
            _ => return Err(Error::not_float("upload", operand)),
        };
        Ok(CudaTile { storage, shape })
    }

    /// Copy a device tile back into a host operand of the same dtype.
    pub fn download(&self, tile: &CudaTile) -> Result<Operand> {
        let shape = tile.shape.clone();
        match &tile.storage {
            CudaStorage::F16(s) => {
                let bits = self.dtoh(s)?;
                let data = bits.into_iter().map(f16::from_bits).collect();
                Ok(Operand::F16(Tile::from_vec(data, shape)?))
            }
            CudaStorage::BF16(s) => {
                let bits = self.dtoh(s)?;
                let data = bits.into_iter().map(bf16::from_bits).collect();
                Ok(Operand::BF16(Tile::from_vec(data, shape)?))
            }
            CudaStorage::F32(s) => Ok(Operand::F32(Tile::from_vec(self.dtoh(s)?, shape)?)),
            CudaStorage::F64(s) => Ok(Operand::F64(Tile::from_vec(self.dtoh(s)?, shape)?)),
        }
    }

    fn htod<T: cudarc::driver::DeviceRepr + Unpin>(&self, data: Vec<T>) -> Result<CudaSlice<T>> {
        self.dev
            .htod_copy(data)
            .map_err(|e| Error::msg(format!("htod copy: {e}")))
    }

    fn dtoh<T: cudarc::driver::DeviceRepr + Default + Clone + Unpin>(
        &self,
        src: &CudaSlice<T>,
    ) -> Result<Vec<T>> {
        self.dev
            .dtoh_sync_copy(src)
            .map_err(|e| Error::msg(format!("dtoh copy: {e}")))
    }

    fn alloc<T: cudarc::driver::DeviceRepr + cudarc::driver::ValidAsZeroBits>(
        &self,
        n: usize,
    ) -> Result<CudaSlice<T>> {
        self.dev
            .alloc_zeros(n)
            .map_err(|e| Error::msg(format!("alloc: {e}")))
    }

    //  Activation

    /// `y = x + offset; y >= threshold ? y : slope * y` on every element.
    ///
    /// The constants are rounded to the tile's dtype on the host, matching
    /// `epilog_core::ShiftedLeakyRelu` bit for bit.
    pub fn leaky_relu(&self, input: &CudaTile, cfg: &LeakyReluConfig) -> Result<CudaTile> {
        let n = input.elem_count();
        if n == 0 {
            return Ok(input.clone());
        }
        let n32 = u32::try_from(n)
            .map_err(|_| Error::msg(format!("leaky_relu: {n} elements exceed u32 indexing")))?;
        let launch = self.block.launch_cfg(n32);
        let func = self.get_func(MODULE_NAME, &format!("leaky_relu_{}", input.dtype()))?;
        log::trace!(
            "launch leaky_relu_{} n={n} grid={:?} block={:?}",
            input.dtype(),
            launch.grid_dim,
            launch.block_dim
        );

        let storage = match &input.storage {
            CudaStorage::F32(inp) => {
                let mut out = self.alloc::<f32>(n)?;
                let (o, s, t) = (cfg.offset as f32, cfg.negative_slope as f32, cfg.threshold as f32);
                unsafe { func.launch(launch, (inp, &mut out, o, s, t, n32)) }
                    .map_err(|e| Error::msg(format!("leaky_relu launch: {e}")))?;
                CudaStorage::F32(out)
            }
            CudaStorage::F64(inp) => {
                let mut out = self.alloc::<f64>(n)?;
                let (o, s, t) = (cfg.offset, cfg.negative_slope, cfg.threshold);
                unsafe { func.launch(launch, (inp, &mut out, o, s, t, n32)) }
                    .map_err(|e| Error::msg(format!("leaky_relu launch: {e}")))?;
                CudaStorage::F64(out)
            }
            CudaStorage::F16(inp) => {
                let mut out = self.alloc::<u16>(n)?;
                let round = |v: f64| f16::from_f64(v).to_f32();
                let (o, s, t) = (round(cfg.offset), round(cfg.negative_slope), round(cfg.threshold));
                unsafe { func.launch(launch, (inp, &mut out, o, s, t, n32)) }
                    .map_err(|e| Error::msg(format!("leaky_relu launch: {e}")))?;
                CudaStorage::F16(out)
            }
            CudaStorage::BF16(inp) => {
                let mut out = self.alloc::<u16>(n)?;
                let round = |v: f64| bf16::from_f64(v).to_f32();
                let (o, s, t) = (round(cfg.offset), round(cfg.negative_slope), round(cfg.threshold));
                unsafe { func.launch(launch, (inp, &mut out, o, s, t, n32)) }
                    .map_err(|e| Error::msg(format!("leaky_relu launch: {e}")))?;
                CudaStorage::BF16(out)
            }
        };
        Ok(CudaTile {
            storage,
            shape: input.shape.clone(),
        })
    }
}

impl fmt::Debug for CudaDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CudaDevice(cuda:{}, {})", self.ordinal, self.arch)
    }
}

// CudaStorage — Device memory for each float dtype

/// GPU-side storage. F16 and BF16 are stored as CudaSlice<u16> (bit-level
/// representation).
#[derive(Clone)]
pub enum CudaStorage {
    F16(CudaSlice<u16>),
    BF16(CudaSlice<u16>),
    F32(CudaSlice<f32>),
    F64(CudaSlice<f64>),
}

impl CudaStorage {
    pub fn dtype(&self) -> DType {
        match self {
            CudaStorage::F16(_) => DType::F16,
            CudaStorage::BF16(_) => DType::BF16,
            CudaStorage::F32(_) => DType::F32,
            CudaStorage::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CudaStorage::F16(s) => s.len(),
            CudaStorage::BF16(s) => s.len(),
            CudaStorage::F32(s) => s.len(),
            CudaStorage::F64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CudaStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CudaStorage::{:?}(len={})", self.dtype(), self.len())
    }
}

// CudaTile — Device storage with a shape

/// A tile resident on a CUDA device.
#[derive(Debug, Clone)]
pub struct CudaTile {
    storage: CudaStorage,
    shape: Shape,
}

impl CudaTile {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    pub fn elem_count(&self) -> usize {
        self.shape.elem_count()
    }

    pub fn storage(&self) -> &CudaStorage {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_cfg_covers_all_elements() {
        let cfg = BlockConfig::default().launch_cfg(1000);
        assert_eq!(cfg.block_dim, (256, 1, 1));
        assert_eq!(cfg.grid_dim, (4, 1, 1));

        let cfg = BlockConfig::default().with_block_size(128).launch_cfg(129);
        assert_eq!(cfg.grid_dim, (2, 1, 1));
    }

    #[test]
    fn test_launch_cfg_at_u32_limit() {
        let cfg = BlockConfig::default().launch_cfg(u32::MAX);
        assert_eq!(cfg.grid_dim, (u32::MAX.div_ceil(256), 1, 1));
    }

    #[test]
    fn test_launch_cfg_never_empty_grid() {
        let cfg = BlockConfig::default().launch_cfg(0);
        assert_eq!(cfg.grid_dim, (1, 1, 1));
    }
}
