pub mod error;
pub mod palette;

mod cube;
mod histogram;
mod remap;

pub use error::QuantizeError;
pub use palette::{Color, Palette};

use bitvec::prelude::*;

use crate::source::PixelSource;
use histogram::Histogram;

/// The largest palette an 8-bit index can address.
pub const MAX_COLORS: usize = 256;

/// A `BitVec` variant laid out the way packed scanlines are: most
/// significant bit first within each byte.
type ScanlineBitVec = BitVec<u8, Msb0>;

fn check_color_count(allowed: usize) -> Result<(), QuantizeError> {
	if allowed == 0 || allowed > MAX_COLORS {
		return Err(QuantizeError::ColorCountOutOfRange(allowed));
	}
	Ok(())
}

/// An image stored as one palette index per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedImage {
	width: u32,
	height: u32,
	indices: Vec<u8>,
	palette: Palette,
}

impl IndexedImage {
	pub(crate) fn new(width: u32, height: u32, indices: Vec<u8>, palette: Palette) -> Self {
		debug_assert_eq!(indices.len(), width as usize * height as usize);
		Self { width, height, indices, palette }
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	/// Palette indices in row-major order.
	pub fn indices(&self) -> &[u8] {
		&self.indices
	}

	pub fn index_at(&self, x: u32, y: u32) -> u8 {
		self.indices[y as usize * self.width as usize + x as usize]
	}

	pub fn palette(&self) -> &Palette {
		&self.palette
	}

	pub fn into_parts(self) -> (Vec<u8>, Palette) {
		(self.indices, self.palette)
	}

	/// Expands the indices back into colors through the palette.
	pub fn to_rgb_image(&self) -> image::RgbImage {
		image::RgbImage::from_fn(self.width, self.height, |x, y| {
			self.palette.get(self.index_at(x, y)).unwrap_or(image::Rgb([0, 0, 0]))
		})
	}

	/// Packs each row's indices into `bit_depth` bits apiece, most
	/// significant bit first, padding every row out to a whole byte.
	///
	/// `bit_depth` should be 1, 2, 4 or 8 and wide enough for the palette
	/// (see [`Palette::bit_depth`]); higher index bits are dropped.
	pub fn packed_rows(&self, bit_depth: u8) -> Vec<u8> {
		if bit_depth >= 8 || self.width == 0 {
			return self.indices.clone();
		}
		let mut packed = Vec::new();
		for row in self.indices.chunks(self.width as usize) {
			let mut bits = ScanlineBitVec::with_capacity(row.len() * bit_depth as usize);
			for &index in row {
				for bit_ind in 0..bit_depth {
					bits.push(index & (1 << (bit_depth - bit_ind - 1)) != 0);
				}
			}
			while bits.len() % 8 != 0 {
				bits.push(false);
			}
			packed.extend_from_slice(bits.as_raw_slice());
		}
		packed
	}
}

/// Per-image quantization state: the moment histogram of one source,
/// gathered up front so the distinct color count is known before choosing
/// a palette size.
///
/// Consumed by [`quantize`](Self::quantize); nothing carries over between
/// images.
pub struct WuQuantizer<'a, S: PixelSource + ?Sized> {
	source: &'a S,
	histogram: Histogram,
}

impl<'a, S: PixelSource + ?Sized> WuQuantizer<'a, S> {
	/// Reads every pixel of `source` once to build the histogram.
	pub fn new(source: &'a S) -> Self {
		let histogram = Histogram::from_source(source);
		log::debug!(
			"{}x{} image has {} distinct colors",
			source.width(),
			source.height(),
			histogram.color_count()
		);
		Self { source, histogram }
	}

	/// Exact number of distinct RGB colors in the source.
	pub fn color_count(&self) -> usize {
		self.histogram.color_count()
	}

	/// Reduces the source to at most `allowed` colors.
	///
	/// Images that already fit are indexed losslessly. Otherwise the palette
	/// may come out smaller than `allowed` when no further split would help.
	pub fn quantize(self, allowed: usize) -> Result<IndexedImage, QuantizeError> {
		check_color_count(allowed)?;
		let Self { source, histogram } = self;

		if histogram.color_count() <= allowed {
			log::debug!("{} colors fit in {}; reindexing", histogram.color_count(), allowed);
			return remap::reindex(source);
		}

		let (moments, guesses) = histogram.prefix_summed();
		let cubes = cube::partition(&moments, allowed);
		if cubes.len() < allowed {
			log::debug!("palette limited to {} of {} colors", cubes.len(), allowed);
		}
		let (tags, centroids) = palette::resolve(&moments, &cubes);
		Ok(remap::remap(source, &guesses, &tags, &centroids))
	}
}

/// Quantizes `source` to at most `allowed` colors (`1..=256`).
///
/// The color count is validated before any pixel is read.
pub fn quantize<S: PixelSource + ?Sized>(
	source: &S,
	allowed: usize,
) -> Result<IndexedImage, QuantizeError> {
	check_color_count(allowed)?;
	WuQuantizer::new(source).quantize(allowed)
}
