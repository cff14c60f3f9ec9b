// matrix.rs — dense row-major sample matrix.
//
// One row per image, one column per pixel; every entry carries the three
// color channels of one pixel as f32. The matrix is the CPU-side
// representation the power-iteration engine uploads to the device, and its
// `apply` method is the CPU reference the GPU kernel is validated against.
//
// Entries are padded to 16 bytes so a host slice casts directly to the
// WGSL `array<vec3<f32>>` layout (16-byte element stride) with no
// repacking on upload.

use std::fmt;

use crate::bmp::Bitmap;

/// Number of color channels carried per sample.
pub const CHANNELS: usize = 3;

/// One 3-channel sample, padded to 16 bytes to match the device layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Sample3 {
    chans: [f32; 4],
}

impl Sample3 {
    pub fn new(c0: f32, c1: f32, c2: f32) -> Self {
        Sample3 {
            chans: [c0, c1, c2, 0.0],
        }
    }

    /// # Panics
    /// Panics if `i >= CHANNELS`.
    pub fn channel(&self, i: usize) -> f32 {
        assert!(i < CHANNELS, "channel index {i} out of range");
        self.chans[i]
    }

    pub fn channel_mut(&mut self, i: usize) -> &mut f32 {
        assert!(i < CHANNELS, "channel index {i} out of range");
        &mut self.chans[i]
    }
}

/// Dense row-major matrix of 3-channel samples.
///
/// Invariant: `entries.len() == rows * cols`; every row has exactly `cols`
/// entries.
#[derive(Debug)]
pub struct SampleMatrix {
    entries: Vec<Sample3>,
    rows: usize,
    cols: usize,
}

impl SampleMatrix {
    /// Build the sample matrix for a set of same-size images: row `i` is
    /// image `i` flattened pixel-by-pixel, each entry the pixel's first
    /// three channels as raw f32 values.
    pub fn from_bitmaps(images: &[Bitmap]) -> Result<Self, MatrixError> {
        let first = images.first().ok_or(MatrixError::Empty)?;
        let (width, height) = (first.width(), first.height());
        let cols = width * height;

        let mut entries = Vec::with_capacity(images.len() * cols);
        for (index, image) in images.iter().enumerate() {
            if image.width() != width || image.height() != height {
                return Err(MatrixError::DimensionMismatch {
                    index,
                    expected: (width, height),
                    got: (image.width(), image.height()),
                });
            }
            for px in image.pixels() {
                entries.push(Sample3::new(px[0] as f32, px[1] as f32, px[2] as f32));
            }
        }

        Ok(SampleMatrix {
            entries,
            rows: images.len(),
            cols,
        })
    }

    /// Build a matrix directly from entries, row-major.
    ///
    /// # Panics
    /// Panics if `entries.len() != rows * cols`.
    pub fn from_entries(rows: usize, cols: usize, entries: Vec<Sample3>) -> Self {
        assert_eq!(
            entries.len(),
            rows * cols,
            "entry count ({}) must equal rows * cols ({})",
            entries.len(),
            rows * cols,
        );
        SampleMatrix { entries, rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn entries(&self) -> &[Sample3] {
        &self.entries
    }

    /// Row-major bytes in the device buffer layout.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.entries)
    }

    /// Host-side transpose. The engine computes Aᵗ once here rather than
    /// transposing on the device every iteration.
    pub fn transpose(&self) -> SampleMatrix {
        let mut entries = Vec::with_capacity(self.entries.len());
        for col in 0..self.cols {
            for row in 0..self.rows {
                entries.push(self.entries[row * self.cols + col]);
            }
        }
        SampleMatrix {
            entries,
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// CPU reference mat-vec product: `output[r] = Σ_c A[r][c] * input[c]`,
    /// channels independent. This is the oracle the `apply` kernel is
    /// validated against.
    ///
    /// # Panics
    /// Panics if `input.len() != self.cols()`.
    pub fn apply(&self, input: &[Sample3]) -> Vec<Sample3> {
        assert_eq!(
            input.len(),
            self.cols,
            "input length ({}) must equal cols ({})",
            input.len(),
            self.cols,
        );
        let mut output = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            let row_entries = &self.entries[row * self.cols..(row + 1) * self.cols];
            let mut acc = Sample3::default();
            for (m, v) in row_entries.iter().zip(input.iter()) {
                for c in 0..CHANNELS {
                    *acc.channel_mut(c) += m.channel(c) * v.channel(c);
                }
            }
            output.push(acc);
        }
        output
    }
}

/// Errors from matrix construction.
#[derive(Debug)]
pub enum MatrixError {
    /// No input images.
    Empty,
    /// Image `index` does not match the first image's dimensions.
    DimensionMismatch {
        index: usize,
        expected: (usize, usize),
        got: (usize, usize),
    },
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixError::Empty => write!(f, "no input images"),
            MatrixError::DimensionMismatch {
                index,
                expected,
                got,
            } => write!(
                f,
                "image {index} is {}x{}, expected {}x{}",
                got.0, got.1, expected.0, expected.1
            ),
        }
    }
}

impl std::error::Error for MatrixError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
