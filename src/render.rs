// render.rs — eigenvector to displayable bitmap.
//
// The converged estimate is a unit vector per channel, so its entries are
// small signed values. Each channel is independently min/max-normalized to
// [0, 255]; the sign ambiguity of an eigenvector only flips a channel's
// gradient direction, which min/max mapping absorbs.

use crate::bmp::Bitmap;
use crate::matrix::{Sample3, CHANNELS};

/// Render a length `width * height` sample vector as a bitmap, one image
/// pixel per sample.
///
/// # Panics
/// Panics if `vec.len() != width * height`.
pub fn vector_to_bitmap(vec: &[Sample3], width: usize, height: usize) -> Bitmap {
    assert_eq!(
        vec.len(),
        width * height,
        "vector length ({}) must equal width * height ({})",
        vec.len(),
        width * height,
    );

    let mut bmp = Bitmap::new(width, height);
    for chan in 0..CHANNELS {
        render_channel(chan, vec, bmp.pixels_mut());
    }
    bmp
}

/// Min/max-normalize one channel into byte values. A flat channel (every
/// entry equal) renders as zero.
fn render_channel(chan: usize, vec: &[Sample3], out: &mut [[u8; 4]]) {
    let mut min = vec[0].channel(chan);
    let mut max = min;
    for s in &vec[1..] {
        let v = s.channel(chan);
        min = min.min(v);
        max = max.max(v);
    }

    let range = max - min;
    for (s, px) in vec.iter().zip(out.iter_mut()) {
        let byte = if range > 0.0 {
            ((s.channel(chan) - min) / range * 255.0).round() as u8
        } else {
            0
        };
        px[chan] = byte;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_maps_to_zero_max_to_255() {
        let vec = vec![
            Sample3::new(-0.5, 0.0, 0.0),
            Sample3::new(0.25, 0.0, 0.0),
            Sample3::new(1.0, 0.0, 0.0),
        ];
        let bmp = vector_to_bitmap(&vec, 3, 1);
        assert_eq!(bmp.pixels()[0][0], 0);
        assert_eq!(bmp.pixels()[2][0], 255);
        // Midpoint: (0.25 + 0.5) / 1.5 = 0.5 of the range.
        assert_eq!(bmp.pixels()[1][0], 128);
    }

    #[test]
    fn test_channels_normalized_independently() {
        let vec = vec![
            Sample3::new(0.0, 100.0, -1.0),
            Sample3::new(10.0, 200.0, 1.0),
        ];
        let bmp = vector_to_bitmap(&vec, 2, 1);
        for chan in 0..CHANNELS {
            assert_eq!(bmp.pixels()[0][chan], 0, "channel {chan} min");
            assert_eq!(bmp.pixels()[1][chan], 255, "channel {chan} max");
        }
    }

    #[test]
    fn test_flat_channel_renders_black() {
        let vec = vec![Sample3::new(0.7, 0.0, 0.0), Sample3::new(0.7, 0.0, 0.0)];
        let bmp = vector_to_bitmap(&vec, 2, 1);
        assert_eq!(bmp.pixels()[0][0], 0);
        assert_eq!(bmp.pixels()[1][0], 0);
    }
}
