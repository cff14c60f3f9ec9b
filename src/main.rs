// main.rs — eigenlens CLI.
//
// USAGE
//   eigenlens <image-directory> <output.bmp>
//
// Reads every readable BMP in the directory (all must share one size),
// runs GPU power iteration on the sample matrix, and writes the dominant
// eigenvector rendered as a bitmap. Exits 0 on success, 1 on any failure.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use eigenlens::bmp::{self, Bitmap};
use eigenlens::matrix::SampleMatrix;
use eigenlens::power_iter::PowerIteration;
use eigenlens::render;

/// Outer run(1) calls; the estimate is renormalized after every iteration.
const ITERATIONS: u32 = 100;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <image-directory> <output.bmp>", args[0]);
        process::exit(1);
    }

    if let Err(e) = run(Path::new(&args[1]), Path::new(&args[2])) {
        eprintln!("[eigenlens] error: {e}");
        process::exit(1);
    }
}

fn run(image_dir: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    let bitmaps = read_bitmaps(image_dir)?;
    if bitmaps.is_empty() {
        return Err(format!("no readable BMP images in {}", image_dir.display()).into());
    }
    let width = bitmaps[0].width();
    let height = bitmaps[0].height();
    eprintln!(
        "[eigenlens] {} images, {width}x{height} each",
        bitmaps.len()
    );

    let matrix = SampleMatrix::from_bitmaps(&bitmaps)?;
    drop(bitmaps);

    let mut iter = PowerIteration::new(&matrix)?;
    drop(matrix);

    eprintln!("[eigenlens] running {ITERATIONS} power iterations...");
    for i in 0..ITERATIONS {
        iter.run(1)?;
        if (i + 1) % 25 == 0 {
            eprintln!("[eigenlens] iteration {}/{ITERATIONS}", i + 1);
        }
    }

    eprintln!("[eigenlens] writing {}", output.display());
    let image = render::vector_to_bitmap(iter.estimate(), width, height);
    bmp::write(&image, output)?;

    Ok(())
}

/// Every readable BMP in the directory. Entries that fail to parse (other
/// files, subdirectories) are skipped.
fn read_bitmaps(dir: &Path) -> Result<Vec<Bitmap>, Box<dyn Error>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    // Directory order is filesystem-dependent; sort for reproducible runs.
    paths.sort();

    let mut bitmaps = Vec::new();
    for path in paths {
        if let Ok(bmp) = bmp::read(&path) {
            bitmaps.push(bmp);
        }
    }
    Ok(bitmaps)
}
