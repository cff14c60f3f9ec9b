// Eigenlens: principal-component extraction for image datasets via
// GPU power iteration.
//
// The pipeline: a directory of same-size bitmaps becomes a dense row-major
// sample matrix (one row per image, one 3-channel column per pixel). Power
// iteration on the GPU converges toward the dominant eigenvector of AᵗA
// without ever forming AᵗA, and the result is rendered back to a bitmap.
//
// CPU reference implementations (matrix apply, normalization) live beside
// the GPU path and are the authoritative oracle for every kernel.

pub mod bmp;
pub mod gpu;
pub mod matrix;
pub mod power_iter;
pub mod render;
