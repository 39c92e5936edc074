//! Reduces true-color images to at most 256 colors with Wu's greedy
//! orthogonal bipartitioning of RGB space.
//!
//! ```no_run
//! let img = image::open("photo.png").unwrap().into_rgb8();
//! let indexed = wuquant::quantize(&img, 64).unwrap();
//! assert!(indexed.palette().len() <= 64);
//! ```

pub mod quantize;
pub mod source;

pub use quantize::*;
pub use source::{Composited, PixelSource, RgbaBuffer};
