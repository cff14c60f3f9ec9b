// gpu/context.rs — generic compute-context lifecycle manager.
//
// A `ComputeContext` bundles everything one GPU task needs:
//   - a selected device and its single submission queue,
//   - one compiled WGSL program,
//   - an ordered list of kernels (compute pipelines, addressed by
//     `KernelIndex`),
//   - an ordered list of storage buffers (addressed by `BufferIndex`,
//     each with its recorded byte size).
//
// CONSTRUCTION IS TRANSACTIONAL
// ──────────────────────────────
// `ComputeContext::new` acquires resources strictly in order: device,
// compiled module, kernels, buffers. The first failure at any step returns
// `Err` and everything acquired so far is released by drop, in reverse
// acquisition order. No partially-built context ever escapes. Teardown is
// `Drop` as well, so release happens exactly once no matter where
// construction stopped.
//
// SYNCHRONOUS BY DESIGN
// ──────────────────────
// Every operation blocks until the device has finished: `dispatch` submits
// and polls to completion, `map_buffer` stages a copy and waits for the map,
// `unmap_buffer` flushes the writeback before returning. There is no
// host/device overlap and no internal locking; a context is single-owner.
//
// wgpu reports validation failures through error scopes rather than return
// values. Each fallible step here runs inside a scope and converts a
// captured error into the matching `ContextError` variant.

use std::fmt;
use std::sync::mpsc;

use wgpu::util::DeviceExt;

use crate::gpu::device::{AdapterInfo, AdapterPreference, GpuDevice, GpuError};

// ---------------------------------------------------------------------------
// Typed slot indices
// ---------------------------------------------------------------------------

/// Index of a kernel slot. Distinct from `BufferIndex` so the two
/// categories cannot be mixed up at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelIndex(pub usize);

/// Index of a device-buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferIndex(pub usize);

impl fmt::Display for KernelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kernel #{}", self.0)
    }
}

impl fmt::Display for BufferIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer #{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything `ComputeContext::new` needs, gathered up front.
///
/// Kernel and buffer slots are allocated strictly in the order listed here;
/// the resulting indices are positional (`kernels[0]` is `KernelIndex(0)`).
/// The same entry point may appear in several kernel slots; each slot gets
/// its own pipeline and its own argument bindings.
#[derive(Clone)]
pub struct ContextConfig {
    /// WGSL program source. The token `{{WG_X}}`, if present, is replaced
    /// with `workgroup_width` before compilation so the shader's
    /// `@workgroup_size` stays in sync with dispatch math.
    pub source: String,
    /// Entry-point name per kernel slot.
    pub kernels: Vec<String>,
    /// Byte size per buffer slot. Sizes must be nonzero multiples of 4
    /// (wgpu's copy alignment) and within the device's buffer limits.
    pub buffers: Vec<u64>,
    /// Invocations per workgroup along x. Dispatches cover a global size
    /// with `ceil(global / workgroup_width)` workgroups.
    pub workgroup_width: u32,
    pub adapter: AdapterPreference,
}

impl ContextConfig {
    pub fn new(source: impl Into<String>) -> Self {
        ContextConfig {
            source: source.into(),
            kernels: Vec::new(),
            buffers: Vec::new(),
            workgroup_width: 64,
            adapter: AdapterPreference::Auto,
        }
    }

    /// Device-independent validity checks, run before any GPU work.
    fn validate(&self) -> Result<(), ContextError> {
        if self.workgroup_width == 0 {
            return Err(ContextError::Workgroup {
                width: 0,
                max: 0,
            });
        }
        for (index, &size) in self.buffers.iter().enumerate() {
            if size == 0 {
                return Err(ContextError::Allocation {
                    index,
                    size,
                    log: "zero-size buffer".to_string(),
                });
            }
            if size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
                return Err(ContextError::Allocation {
                    index,
                    size,
                    log: format!(
                        "size must be a multiple of {}",
                        wgpu::COPY_BUFFER_ALIGNMENT
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Access mode for a mapped buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Host may read the view; `unmap_buffer` discards it.
    Read,
    /// Host may read and write; `unmap_buffer` writes the view back to the
    /// device and waits for the transfer.
    ReadWrite,
}

/// Global size of a dispatch, in invocations. `x` is divided by the
/// context's workgroup width (ceiling); `y` and `z` dispatch one workgroup
/// per unit. Kernels must guard against overshoot in the padded tail of x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GlobalSize {
    /// One-dimensional launch over `x` invocations.
    pub fn d1(x: u32) -> Self {
        GlobalSize { x, y: 1, z: 1 }
    }

    pub fn d2(x: u32, y: u32) -> Self {
        GlobalSize { x, y, z: 1 }
    }

    pub fn d3(x: u32, y: u32, z: u32) -> Self {
        GlobalSize { x, y, z }
    }
}

/// One positional kernel argument.
#[derive(Clone)]
pub enum Arg {
    /// Bind the context buffer in this slot as a storage buffer.
    Storage(BufferIndex),
    /// Upload the bytes as a uniform buffer and bind it. The payload must
    /// match the WGSL struct's size and layout (use `bytemuck` Pod structs
    /// with explicit padding).
    Uniform(Vec<u8>),
}

// ---------------------------------------------------------------------------
// Scoped host view of a device buffer
// ---------------------------------------------------------------------------

/// A host-resident snapshot of one device buffer, produced by
/// [`ComputeContext::map_buffer`] and consumed by
/// [`ComputeContext::unmap_buffer`].
///
/// Host access is valid only between map and unmap. Dispatching a kernel
/// against a buffer while a view of it is outstanding is a protocol
/// violation the runtime does not detect; the view would then no longer
/// reflect device content.
pub struct MappedBuffer {
    index: BufferIndex,
    mode: MapMode,
    data: Vec<u8>,
}

impl MappedBuffer {
    pub fn index(&self) -> BufferIndex {
        self.index
    }

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the view.
    ///
    /// # Panics
    /// Panics if the buffer was mapped with `MapMode::Read`.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        assert!(
            self.mode == MapMode::ReadWrite,
            "buffer mapped read-only"
        );
        &mut self.data
    }
}

// ---------------------------------------------------------------------------
// ComputeContext
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Kernel {
    entry: String,
    pipeline: wgpu::ComputePipeline,
    /// Set by `bind_arguments`; `None` means the kernel must not be
    /// dispatched. A failed bind clears any previous group.
    bind_group: Option<wgpu::BindGroup>,
}

#[derive(Debug)]
struct DeviceBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

/// One GPU task's resources. See the module header for the lifecycle
/// contract.
///
/// # Field drop order
/// `kernels` and `buffers` are declared before `gpu` so pipelines and
/// buffers are released before the device and instance that own them.
#[derive(Debug)]
pub struct ComputeContext {
    kernels: Vec<Kernel>,
    buffers: Vec<DeviceBuffer>,
    workgroup_width: u32,
    gpu: GpuDevice,
}

impl ComputeContext {
    /// Build a context from a config. Resource acquisition order: device,
    /// program, kernels (in slot order), buffers (in slot order). The first
    /// failure releases everything already acquired and returns `Err`.
    pub fn new(config: ContextConfig) -> Result<Self, ContextError> {
        config.validate()?;

        let gpu =
            GpuDevice::with_preference(config.adapter.clone()).map_err(ContextError::Device)?;

        let max_width = gpu
            .limits
            .max_compute_workgroup_size_x
            .min(gpu.limits.max_compute_invocations_per_workgroup);
        if config.workgroup_width > max_width {
            return Err(ContextError::Workgroup {
                width: config.workgroup_width,
                max: max_width,
            });
        }

        // Bake the workgroup width into the source so the shader's
        // @workgroup_size matches the dispatch math below.
        let source = config
            .source
            .replace("{{WG_X}}", &config.workgroup_width.to_string());

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ComputeContext program"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(ContextError::Compile { log: e.to_string() });
        }

        let mut kernels = Vec::with_capacity(config.kernels.len());
        for entry in &config.kernels {
            gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
            let pipeline =
                gpu.device
                    .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                        label: Some(entry.as_str()),
                        layout: None,
                        module: &module,
                        entry_point: entry.as_str(),
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        cache: None,
                    });
            if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
                return Err(ContextError::Kernel {
                    entry: entry.clone(),
                    log: e.to_string(),
                });
            }
            kernels.push(Kernel {
                entry: entry.clone(),
                pipeline,
                bind_group: None,
            });
        }

        let max_size = (gpu.limits.max_storage_buffer_binding_size as u64)
            .min(gpu.limits.max_buffer_size);
        let mut buffers = Vec::with_capacity(config.buffers.len());
        for (index, &size) in config.buffers.iter().enumerate() {
            if size > max_size {
                return Err(ContextError::Allocation {
                    index,
                    size,
                    log: format!("exceeds device limit of {max_size} bytes"),
                });
            }
            gpu.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
            let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("ComputeContext buffer"),
                size,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
                return Err(ContextError::Allocation {
                    index,
                    size,
                    log: e.to_string(),
                });
            }
            buffers.push(DeviceBuffer { buffer, size });
        }

        Ok(ComputeContext {
            kernels,
            buffers,
            workgroup_width: config.workgroup_width,
            gpu,
        })
    }

    pub fn kernel_count(&self) -> usize {
        self.kernels.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Recorded byte size of a buffer slot.
    pub fn buffer_size(&self, index: BufferIndex) -> Option<u64> {
        self.buffers.get(index.0).map(|b| b.size)
    }

    pub fn workgroup_width(&self) -> u32 {
        self.workgroup_width
    }

    pub fn adapter_info(&self) -> &AdapterInfo {
        &self.gpu.adapter_info
    }

    /// Bind positional arguments to a kernel slot. Position `i` binds to
    /// `@binding(i)` in the shader. Any previous binding for the slot is
    /// cleared first, so a kernel whose bind failed cannot be dispatched
    /// with stale arguments.
    pub fn bind_arguments(
        &mut self,
        kernel: KernelIndex,
        args: &[Arg],
    ) -> Result<(), ContextError> {
        if kernel.0 >= self.kernels.len() {
            return Err(ContextError::InvalidKernel(kernel));
        }
        self.kernels[kernel.0].bind_group = None;

        // Resolve every position before creating the group, so the first
        // unbindable argument is reported by position.
        enum Slot {
            Storage(usize),
            Uniform(usize),
        }
        let mut uniforms: Vec<wgpu::Buffer> = Vec::new();
        let mut slots: Vec<Slot> = Vec::with_capacity(args.len());
        for (position, arg) in args.iter().enumerate() {
            match arg {
                Arg::Storage(b) => {
                    if b.0 >= self.buffers.len() {
                        return Err(ContextError::ArgBind {
                            kernel,
                            position,
                            log: format!(
                                "{} out of range ({} buffers)",
                                b,
                                self.buffers.len()
                            ),
                        });
                    }
                    slots.push(Slot::Storage(b.0));
                }
                Arg::Uniform(bytes) => {
                    if bytes.is_empty() {
                        return Err(ContextError::ArgBind {
                            kernel,
                            position,
                            log: "empty uniform payload".to_string(),
                        });
                    }
                    let uniform =
                        self.gpu
                            .device
                            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some("ComputeContext uniform"),
                                contents: bytes,
                                usage: wgpu::BufferUsages::UNIFORM,
                            });
                    slots.push(Slot::Uniform(uniforms.len()));
                    uniforms.push(uniform);
                }
            }
        }

        let entries: Vec<wgpu::BindGroupEntry> = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: match slot {
                    Slot::Storage(b) => self.buffers[*b].buffer.as_entire_binding(),
                    Slot::Uniform(u) => uniforms[*u].as_entire_binding(),
                },
            })
            .collect();

        let layout = self.kernels[kernel.0].pipeline.get_bind_group_layout(0);
        self.gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ComputeContext bind group"),
            layout: &layout,
            entries: &entries,
        });
        if let Some(e) = pollster::block_on(self.gpu.device.pop_error_scope()) {
            return Err(ContextError::BindGroup {
                kernel,
                log: e.to_string(),
            });
        }
        drop(entries);

        self.kernels[kernel.0].bind_group = Some(bind_group);
        Ok(())
    }

    /// Copy a buffer's device content to the host and return a scoped view.
    /// Blocks until the copy completes. The view must not outlive a
    /// dispatch against the same buffer (caller's responsibility).
    pub fn map_buffer(
        &self,
        index: BufferIndex,
        mode: MapMode,
    ) -> Result<MappedBuffer, ContextError> {
        let buf = self
            .buffers
            .get(index.0)
            .ok_or(ContextError::InvalidBuffer(index))?;

        let staging = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ComputeContext staging"),
            size: buf.size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ComputeContext::map_buffer"),
            });
        encoder.copy_buffer_to_buffer(&buf.buffer, 0, &staging, 0, buf.size);
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.gpu.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| ContextError::Transfer {
                buffer: index,
                log: "map callback never fired".to_string(),
            })?
            .map_err(|e| ContextError::Transfer {
                buffer: index,
                log: e.to_string(),
            })?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();

        Ok(MappedBuffer { index, mode, data })
    }

    /// Release a view. For `ReadWrite` views the host bytes are written
    /// back to the device first, and this call blocks until the device
    /// copy is consistent.
    pub fn unmap_buffer(&self, view: MappedBuffer) -> Result<(), ContextError> {
        let buf = self
            .buffers
            .get(view.index.0)
            .ok_or(ContextError::InvalidBuffer(view.index))?;

        match view.mode {
            MapMode::Read => Ok(()),
            MapMode::ReadWrite => {
                self.gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
                self.gpu.queue.write_buffer(&buf.buffer, 0, &view.data);
                self.gpu.queue.submit(std::iter::empty::<wgpu::CommandBuffer>());
                self.gpu.device.poll(wgpu::Maintain::Wait);
                if let Some(e) = pollster::block_on(self.gpu.device.pop_error_scope()) {
                    return Err(ContextError::Transfer {
                        buffer: view.index,
                        log: e.to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Launch a kernel over a global index space and block until it
    /// finishes. The kernel must have arguments bound.
    pub fn dispatch(
        &self,
        kernel: KernelIndex,
        global: GlobalSize,
    ) -> Result<(), ContextError> {
        let k = self
            .kernels
            .get(kernel.0)
            .ok_or(ContextError::InvalidKernel(kernel))?;
        let bind_group = k
            .bind_group
            .as_ref()
            .ok_or(ContextError::MissingBindings(kernel))?;

        let groups_x = groups_for(global.x, self.workgroup_width);
        let groups_y = global.y.max(1);
        let groups_z = global.z.max(1);
        let max = self.gpu.limits.max_compute_workgroups_per_dimension;
        if groups_x > max || groups_y > max || groups_z > max {
            return Err(ContextError::Execution {
                kernel,
                log: format!(
                    "{groups_x}x{groups_y}x{groups_z} workgroups exceeds device limit {max}"
                ),
            });
        }

        self.gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ComputeContext::dispatch"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(k.entry.as_str()),
                timestamp_writes: None,
            });
            pass.set_pipeline(&k.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, groups_z);
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.gpu.device.poll(wgpu::Maintain::Wait);

        if let Some(e) = pollster::block_on(self.gpu.device.pop_error_scope()) {
            return Err(ContextError::Execution {
                kernel,
                log: e.to_string(),
            });
        }
        Ok(())
    }
}

/// Workgroups needed to cover `global` invocations at `width` per group.
/// Ceiling division; kernels guard the padded tail.
pub(crate) fn groups_for(global: u32, width: u32) -> u32 {
    (global + width - 1) / width
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from context construction and use. Construction errors
/// (`Device` through `Allocation`) imply full rollback: the failed `new`
/// releases everything it had acquired.
#[derive(Debug)]
pub enum ContextError {
    /// Adapter selection or device request failed.
    Device(GpuError),
    /// Program rejected by the shader compiler; `log` carries the
    /// compiler diagnostic.
    Compile { log: String },
    /// Pipeline creation failed for one entry point (usually: the name
    /// does not exist in the program).
    Kernel { entry: String, log: String },
    /// Buffer slot could not be allocated or its size is invalid.
    Allocation { index: usize, size: u64, log: String },
    /// Workgroup width is zero or exceeds what the device allows.
    Workgroup { width: u32, max: u32 },
    /// Kernel index out of range.
    InvalidKernel(KernelIndex),
    /// Buffer index out of range.
    InvalidBuffer(BufferIndex),
    /// One positional argument could not be bound.
    ArgBind {
        kernel: KernelIndex,
        position: usize,
        log: String,
    },
    /// The argument set as a whole does not match the kernel's parameter
    /// list (wrong count or wrong binding types).
    BindGroup { kernel: KernelIndex, log: String },
    /// Dispatch attempted on a kernel with no (or a failed) binding.
    MissingBindings(KernelIndex),
    /// Dispatch enqueue or wait failed.
    Execution { kernel: KernelIndex, log: String },
    /// Host/device transfer failed during map or unmap.
    Transfer { buffer: BufferIndex, log: String },
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::Device(e) => write!(f, "device setup failed: {e}"),
            ContextError::Compile { log } => {
                write!(f, "program compilation failed: {log}")
            }
            ContextError::Kernel { entry, log } => {
                write!(f, "kernel {entry:?} creation failed: {log}")
            }
            ContextError::Allocation { index, size, log } => {
                write!(f, "buffer #{index} allocation ({size} bytes) failed: {log}")
            }
            ContextError::Workgroup { width, max } => {
                if *width == 0 {
                    write!(f, "workgroup width must be nonzero")
                } else {
                    write!(f, "workgroup width {width} exceeds device limit {max}")
                }
            }
            ContextError::InvalidKernel(k) => write!(f, "{k} out of range"),
            ContextError::InvalidBuffer(b) => write!(f, "{b} out of range"),
            ContextError::ArgBind {
                kernel,
                position,
                log,
            } => write!(f, "{kernel} argument {position} unbindable: {log}"),
            ContextError::BindGroup { kernel, log } => {
                write!(f, "{kernel} argument set rejected: {log}")
            }
            ContextError::MissingBindings(k) => {
                write!(f, "{k} dispatched without bound arguments")
            }
            ContextError::Execution { kernel, log } => {
                write!(f, "{kernel} dispatch failed: {log}")
            }
            ContextError::Transfer { buffer, log } => {
                write!(f, "{buffer} transfer failed: {log}")
            }
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContextError::Device(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests (pure logic; GPU integration lives in tests/test_gpu.rs)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_buffers(buffers: Vec<u64>) -> ContextConfig {
        let mut c = ContextConfig::new("@compute @workgroup_size(64) fn noop() {}");
        c.buffers = buffers;
        c
    }

    #[test]
    fn test_validate_rejects_zero_size_buffer() {
        let c = config_with_buffers(vec![64, 0, 16]);
        let err = c.validate().unwrap_err();
        assert!(matches!(err, ContextError::Allocation { index: 1, size: 0, .. }));
    }

    #[test]
    fn test_validate_rejects_unaligned_size() {
        let c = config_with_buffers(vec![64, 14]);
        let err = c.validate().unwrap_err();
        assert!(matches!(err, ContextError::Allocation { index: 1, size: 14, .. }));
    }

    #[test]
    fn test_validate_rejects_zero_workgroup_width() {
        let mut c = config_with_buffers(vec![64]);
        c.workgroup_width = 0;
        let err = c.validate().unwrap_err();
        assert!(matches!(err, ContextError::Workgroup { width: 0, .. }));
    }

    #[test]
    fn test_validate_accepts_aligned_sizes() {
        let c = config_with_buffers(vec![4, 16, 1024]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_groups_for_exact_multiple() {
        assert_eq!(groups_for(256, 64), 4);
        assert_eq!(groups_for(64, 64), 1);
    }

    #[test]
    fn test_groups_for_rounds_up() {
        assert_eq!(groups_for(1, 64), 1);
        assert_eq!(groups_for(65, 64), 2);
        assert_eq!(groups_for(257, 64), 5);
    }

    #[test]
    fn test_global_size_helpers() {
        assert_eq!(GlobalSize::d1(100), GlobalSize { x: 100, y: 1, z: 1 });
        assert_eq!(GlobalSize::d2(10, 20), GlobalSize { x: 10, y: 20, z: 1 });
        assert_eq!(GlobalSize::d3(2, 3, 4), GlobalSize { x: 2, y: 3, z: 4 });
    }

    #[test]
    fn test_index_display() {
        assert_eq!(KernelIndex(2).to_string(), "kernel #2");
        assert_eq!(BufferIndex(7).to_string(), "buffer #7");
    }

    #[test]
    fn test_mapped_buffer_read_only_panics_on_mut() {
        let mut view = MappedBuffer {
            index: BufferIndex(0),
            mode: MapMode::Read,
            data: vec![0u8; 4],
        };
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            view.bytes_mut().len()
        }));
        assert!(result.is_err(), "bytes_mut on a Read view must panic");
    }
}
