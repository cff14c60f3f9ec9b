// power_iter.rs — GPU power iteration toward the dominant eigenvector of AᵗA.
//
// AᵗA is never formed. Each iteration chains two mat-vec kernels on the
// device: the rows stage computes A·v (length rows), the cols stage feeds
// that intermediate through Aᵗ back into the estimate buffer (length cols).
// One pair of dispatches applies AᵗA once at O(rows·cols) cost, and the
// ping-pong wiring keeps all intermediate state on the device; the host
// only touches the estimate before and after the iteration loop.
//
// Convergence is not detected. Callers pick an iteration count and rely on
// the geometric (λ₂/λ₁)^k rate; the CLI runs 100 single-iteration calls so
// the estimate is renormalized every step.
//
// A failed run leaves the host estimate exactly as it was before the call:
// the readback lands in a fresh vector and only replaces the estimate once
// every device operation has succeeded.

use rand::Rng;

use crate::gpu::context::{
    Arg, BufferIndex, ComputeContext, ContextConfig, ContextError, GlobalSize, KernelIndex,
    MapMode,
};
use crate::gpu::device::AdapterPreference;
use crate::matrix::{Sample3, SampleMatrix, CHANNELS};

// Slot layout inside the engine's ComputeContext. The stages below carry
// the actual wiring; these are just the allocation order.
const ROW_MATRIX: BufferIndex = BufferIndex(0);
const COL_MATRIX: BufferIndex = BufferIndex(1);
const INTERMEDIATE: BufferIndex = BufferIndex(2);
const ESTIMATE: BufferIndex = BufferIndex(3);

const ROWS_KERNEL: KernelIndex = KernelIndex(0);
const COLS_KERNEL: KernelIndex = KernelIndex(1);

/// Tunables for engine construction.
#[derive(Debug, Clone)]
pub struct PowerIterOptions {
    pub adapter: AdapterPreference,
    /// Invocations per workgroup for both stages.
    pub workgroup_width: u32,
}

impl Default for PowerIterOptions {
    fn default() -> Self {
        PowerIterOptions {
            adapter: AdapterPreference::Auto,
            workgroup_width: 64,
        }
    }
}

/// Uniform parameters of one `apply` dispatch. Layout must match
/// `ApplyParams` in apply.wgsl: two u32 fields padded to 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ApplyParams {
    /// Input vector length (elements reduced per output).
    inner: u32,
    /// Output vector length.
    outer: u32,
    _pad0: u32,
    _pad1: u32,
}

/// One stage of the two-stage pipeline: which kernel slot runs, which
/// matrix it reads, and which vector buffers it consumes and produces.
struct Stage {
    kernel: KernelIndex,
    matrix: BufferIndex,
    input: BufferIndex,
    output: BufferIndex,
    /// Input vector length.
    inner: u32,
    /// Output vector length; also the dispatch's global size.
    outer: u32,
}

impl Stage {
    fn args(&self) -> Vec<Arg> {
        let params = ApplyParams {
            inner: self.inner,
            outer: self.outer,
            _pad0: 0,
            _pad1: 0,
        };
        vec![
            Arg::Storage(self.matrix),
            Arg::Uniform(bytemuck::bytes_of(&params).to_vec()),
            Arg::Storage(self.input),
            Arg::Storage(self.output),
        ]
    }
}

/// Power-iteration engine. Owns its ComputeContext and the host-side
/// estimate vector; single-owner, synchronous, not thread-safe.
pub struct PowerIteration {
    ctx: ComputeContext,
    /// Current estimate, length = matrix cols. Mutated in place by `run`.
    vector: Vec<Sample3>,
    /// A·v stage: estimate in, intermediate out.
    rows_stage: Stage,
    /// Aᵗ·(A·v) stage: intermediate in, estimate out.
    cols_stage: Stage,
}

impl PowerIteration {
    /// Build an engine for `matrix` with default options and an OS-seeded
    /// starting estimate.
    pub fn new(matrix: &SampleMatrix) -> Result<Self, PowerIterError> {
        Self::with_options(matrix, PowerIterOptions::default(), &mut rand::thread_rng())
    }

    /// Build an engine with explicit options and random source. The matrix
    /// is copied into device buffers during construction and is not
    /// referenced afterwards; callers may drop it immediately.
    pub fn with_options<R: Rng>(
        matrix: &SampleMatrix,
        options: PowerIterOptions,
        rng: &mut R,
    ) -> Result<Self, PowerIterError> {
        if matrix.rows() == 0 || matrix.cols() == 0 {
            return Err(PowerIterError::EmptyMatrix);
        }
        let rows = u32::try_from(matrix.rows())
            .map_err(|_| PowerIterError::TooManyElements(matrix.rows()))?;
        let cols = u32::try_from(matrix.cols())
            .map_err(|_| PowerIterError::TooManyElements(matrix.cols()))?;

        let mut config = ContextConfig::new(include_str!("shaders/apply.wgsl"));
        config.kernels = vec!["apply".to_string(), "apply".to_string()];
        config.buffers = buffer_sizes(matrix.rows(), matrix.cols()).to_vec();
        config.workgroup_width = options.workgroup_width;
        config.adapter = options.adapter;

        let mut ctx = ComputeContext::new(config)?;

        // Upload A, then the host-computed transpose. The transpose is
        // freed as soon as its bytes are on the device.
        upload(&ctx, ROW_MATRIX, matrix.as_bytes())?;
        let transposed = matrix.transpose();
        upload(&ctx, COL_MATRIX, transposed.as_bytes())?;
        drop(transposed);

        let rows_stage = Stage {
            kernel: ROWS_KERNEL,
            matrix: ROW_MATRIX,
            input: ESTIMATE,
            output: INTERMEDIATE,
            inner: cols,
            outer: rows,
        };
        let cols_stage = Stage {
            kernel: COLS_KERNEL,
            matrix: COL_MATRIX,
            input: INTERMEDIATE,
            output: ESTIMATE,
            inner: rows,
            outer: cols,
        };
        ctx.bind_arguments(rows_stage.kernel, &rows_stage.args())?;
        ctx.bind_arguments(cols_stage.kernel, &cols_stage.args())?;

        let vector = random_estimate(matrix.cols(), rng);

        Ok(PowerIteration {
            ctx,
            vector,
            rows_stage,
            cols_stage,
        })
    }

    /// The current estimate, length = matrix cols. Unit L2 norm per
    /// channel after any successful `run`.
    pub fn estimate(&self) -> &[Sample3] {
        &self.vector
    }

    /// Apply AᵗA `iterations` times on the device, then read back and
    /// normalize each channel to unit L2 norm.
    ///
    /// `run(0)` performs no dispatches but still round-trips the estimate
    /// and normalizes it, so the direction is unchanged and each channel's
    /// magnitude becomes 1.
    ///
    /// # Errors
    /// Any failed transfer or dispatch aborts the run; the host estimate
    /// is left untouched in that case.
    pub fn run(&mut self, iterations: u32) -> Result<(), PowerIterError> {
        upload(&self.ctx, ESTIMATE, bytemuck::cast_slice(&self.vector))?;

        for _ in 0..iterations {
            self.ctx
                .dispatch(self.rows_stage.kernel, GlobalSize::d1(self.rows_stage.outer))?;
            self.ctx
                .dispatch(self.cols_stage.kernel, GlobalSize::d1(self.cols_stage.outer))?;
        }

        let view = self.ctx.map_buffer(ESTIMATE, MapMode::Read)?;
        let mut result: Vec<Sample3> = bytemuck::pod_collect_to_vec(view.bytes());
        self.ctx.unmap_buffer(view)?;

        normalize_channels(&mut result);
        self.vector = result;
        Ok(())
    }
}

/// Byte sizes of the four buffer slots, in allocation order: A, Aᵗ,
/// intermediate (length rows), estimate (length cols).
fn buffer_sizes(rows: usize, cols: usize) -> [u64; 4] {
    let entry = std::mem::size_of::<Sample3>() as u64;
    let matrix = rows as u64 * cols as u64 * entry;
    [matrix, matrix, rows as u64 * entry, cols as u64 * entry]
}

/// Independent uniform values in [-1, 1] per channel.
fn random_estimate<R: Rng>(len: usize, rng: &mut R) -> Vec<Sample3> {
    (0..len)
        .map(|_| {
            Sample3::new(
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
            )
        })
        .collect()
}

/// Scale each of the three channels independently to unit L2 norm. A
/// channel with zero magnitude is left untouched.
pub fn normalize_channels(vec: &mut [Sample3]) {
    for chan in 0..CHANNELS {
        let mag: f32 = vec
            .iter()
            .map(|s| {
                let v = s.channel(chan);
                v * v
            })
            .sum();
        if mag > 0.0 {
            let recip = 1.0 / mag.sqrt();
            for s in vec.iter_mut() {
                *s.channel_mut(chan) *= recip;
            }
        }
    }
}

/// Fill one buffer from host bytes via a scoped read-write view.
fn upload(ctx: &ComputeContext, index: BufferIndex, bytes: &[u8]) -> Result<(), PowerIterError> {
    let mut view = ctx.map_buffer(index, MapMode::ReadWrite)?;
    view.bytes_mut().copy_from_slice(bytes);
    ctx.unmap_buffer(view)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PowerIterError {
    /// The matrix has zero rows or zero columns.
    EmptyMatrix,
    /// A dimension does not fit the device's 32-bit index space.
    TooManyElements(usize),
    /// Context construction, transfer or dispatch failure.
    Context(ContextError),
}

impl From<ContextError> for PowerIterError {
    fn from(e: ContextError) -> Self {
        PowerIterError::Context(e)
    }
}

impl std::fmt::Display for PowerIterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerIterError::EmptyMatrix => write!(f, "matrix has no entries"),
            PowerIterError::TooManyElements(n) => {
                write!(f, "dimension {n} exceeds the device index space")
            }
            PowerIterError::Context(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PowerIterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PowerIterError::Context(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests (pure logic; GPU integration lives in tests/test_gpu.rs)
// ---------------------------------------------------------------------------
