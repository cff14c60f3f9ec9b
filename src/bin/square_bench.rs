// square_bench.rs — GPU-vs-CPU element-squaring benchmark.
//
// Squares a large f32 list once on the GPU (through the generic
// ComputeContext) and once on the CPU, and prints both wall times. The GPU
// figure includes only the dispatch, not the transfers; the point of the
// tool is a sanity check that the context plumbing works end to end, not a
// rigorous benchmark.
//
// USAGE
//   cargo run --release --bin square_bench [element-count]

use std::process;
use std::time::Instant;

use eigenlens::gpu::context::{
    Arg, BufferIndex, ComputeContext, ContextConfig, ContextError, GlobalSize, KernelIndex,
    MapMode,
};

const DEFAULT_COUNT: usize = 1 << 24;

const VALUES: BufferIndex = BufferIndex(0);
const SQUARE: KernelIndex = KernelIndex(0);

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SquareParams {
    len: u32,
    _pad: [u32; 3],
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let count: usize = args
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_COUNT);

    if let Err(e) = run(count) {
        eprintln!("[square_bench] error: {e}");
        process::exit(1);
    }
}

fn run(count: usize) -> Result<(), ContextError> {
    let mut values: Vec<f32> = (0..count)
        .map(|i| 3.1415 + (i % 10) as f32)
        .collect();

    let mut config = ContextConfig::new(include_str!("../shaders/square.wgsl"));
    config.kernels = vec!["square".to_string()];
    config.buffers = vec![(count * std::mem::size_of::<f32>()) as u64];
    let mut ctx = ComputeContext::new(config)?;

    let params = SquareParams {
        len: count as u32,
        _pad: [0; 3],
    };
    ctx.bind_arguments(
        SQUARE,
        &[
            Arg::Storage(VALUES),
            Arg::Uniform(bytemuck::bytes_of(&params).to_vec()),
        ],
    )?;

    let mut view = ctx.map_buffer(VALUES, MapMode::ReadWrite)?;
    view.bytes_mut()
        .copy_from_slice(bytemuck::cast_slice(&values));
    ctx.unmap_buffer(view)?;

    let start = Instant::now();
    ctx.dispatch(SQUARE, GlobalSize::d1(count as u32))?;
    let gpu_time = start.elapsed();
    println!("GPU completed {count} multiplies in {} us.", gpu_time.as_micros());

    // Verify against the expected squares.
    let view = ctx.map_buffer(VALUES, MapMode::Read)?;
    let result: Vec<f32> = bytemuck::pod_collect_to_vec(view.bytes());
    let mut mismatches = 0usize;
    for (i, (&got, &orig)) in result.iter().zip(values.iter()).enumerate() {
        let expected = orig * orig;
        if got != expected {
            if mismatches < 5 {
                eprintln!("[square_bench] invalid result {i}: got {got}, not {expected}");
            }
            mismatches += 1;
        }
    }
    ctx.unmap_buffer(view)?;
    if mismatches > 0 {
        eprintln!("[square_bench] {mismatches} mismatched elements");
    }

    let start = Instant::now();
    for v in values.iter_mut() {
        *v = *v * *v;
    }
    let cpu_time = start.elapsed();
    println!("CPU completed {count} multiplies in {} us.", cpu_time.as_micros());

    Ok(())
}
