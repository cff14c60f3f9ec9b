// gpu/mod.rs — wgpu accelerator layer.
//
// `device` selects an adapter and owns the wgpu device/queue pair.
// `context` builds on it: one compiled compute program, indexed kernels and
// device buffers, synchronous map/unmap and dispatch. Everything above this
// module (the power-iteration engine, the benchmark binary) talks to the
// GPU exclusively through `ComputeContext`.

pub mod context;
pub mod device;
