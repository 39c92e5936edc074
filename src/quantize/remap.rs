use std::collections::HashMap;
use std::convert::TryFrom;

use super::error::QuantizeError;
use super::palette::{Color, Palette, TagTable};
use super::IndexedImage;
use crate::source::PixelSource;

fn abs_sub(a: u8, b: u8) -> u8 {
	(a as i16 - b as i16).abs() as u8
}

fn vec3_len_squared(a: u8, b: u8, c: u8) -> u32 {
	(a as u32 * a as u32) +
	(b as u32 * b as u32) +
	(c as u32 * c as u32)
}

fn color_distance(a: &Color, b: &Color) -> u32 {
	vec3_len_squared(
		abs_sub(a.0[0], b.0[0]),
		abs_sub(a.0[1], b.0[1]),
		abs_sub(a.0[2], b.0[2]),
	)
}

/// Running per-entry totals of the pixels assigned to it.
#[derive(Clone, Copy, Debug, Default)]
struct Bucket {
	red: u64,
	green: u64,
	blue: u64,
	count: u64,
}

impl Bucket {
	fn add(&mut self, c: &Color) {
		self.red += c.0[0] as u64;
		self.green += c.0[1] as u64;
		self.blue += c.0[2] as u64;
		self.count += 1;
	}

	fn centroid(&self) -> Color {
		if self.count == 0 {
			return image::Rgb([0, 0, 0]);
		}
		image::Rgb([
			(self.red / self.count) as u8,
			(self.green / self.count) as u8,
			(self.blue / self.count) as u8,
		])
	}
}

/// Index of the centroid closest to `color`, scanning every entry. Ties go
/// to the lowest index.
///
/// `guess` is only the starting answer; the scan always runs in full.
fn nearest(color: &Color, centroids: &[Color], guess: u8) -> u8 {
	let mut best = guess;
	let mut best_distance = u32::MAX;
	for (index, centroid) in centroids.iter().enumerate() {
		let distance = color_distance(color, centroid);
		if distance < best_distance {
			best_distance = distance;
			best = index as u8;
		}
	}
	best
}

/// Assigns every pixel to its nearest centroid and rebuilds the palette
/// from the mean of the pixels each entry actually received.
///
/// `guesses` holds each pixel's histogram cell, resolved through `tags` to
/// the box that owns it.
pub(crate) fn remap<S: PixelSource + ?Sized>(
	source: &S,
	guesses: &[u16],
	tags: &TagTable,
	centroids: &[Color],
) -> IndexedImage {
	let (width, height) = (source.width(), source.height());
	let mut indices = Vec::with_capacity(guesses.len());
	let mut buckets = vec![Bucket::default(); centroids.len()];
	let mut quant_cache: HashMap<Color, u8> = HashMap::new();

	for y in 0..height {
		for x in 0..width {
			let color = source.opaque_color_at(x, y);
			let index = match quant_cache.get(&color) {
				Some(c) => *c,
				None => {
					let guess = tags.get(guesses[indices.len()]);
					let c = nearest(&color, centroids, guess);
					quant_cache.insert(color, c);
					c
				}
			};
			buckets[index as usize].add(&color);
			indices.push(index);
		}
	}
	log::debug!("{} distinct colors remapped onto {} entries", quant_cache.len(), centroids.len());

	let palette = Palette::new(
		buckets.iter().map(Bucket::centroid).collect(),
		buckets.iter().map(|b| b.count).collect(),
	);
	IndexedImage::new(width, height, indices, palette)
}

/// Gives every distinct color its own palette entry, in order of first
/// appearance. Lossless; only valid when the image has at most 256 colors.
pub(crate) fn reindex<S: PixelSource + ?Sized>(source: &S) -> Result<IndexedImage, QuantizeError> {
	let (width, height) = (source.width(), source.height());
	let mut indices = Vec::with_capacity(width as usize * height as usize);
	let mut colors = Vec::new();
	let mut counts: Vec<u64> = Vec::new();
	let mut lookup: HashMap<Color, u8> = HashMap::new();

	for y in 0..height {
		for x in 0..width {
			let color = source.opaque_color_at(x, y);
			let index = match lookup.get(&color) {
				Some(c) => *c,
				None => {
					let c = u8::try_from(colors.len())
						.map_err(|_| QuantizeError::PaletteOverflow(colors.len() + 1))?;
					colors.push(color);
					counts.push(0);
					lookup.insert(color, c);
					c
				}
			};
			counts[index as usize] += 1;
			indices.push(index);
		}
	}

	Ok(IndexedImage::new(width, height, indices, Palette::new(colors, counts)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn nearest_prefers_lowest_index_on_ties() {
		let centroids = [
			image::Rgb([0, 0, 0]),
			image::Rgb([20, 0, 0]),
			image::Rgb([0, 20, 0]),
		];
		// Equidistant from the first two entries; the guess doesn't matter.
		assert_eq!(nearest(&image::Rgb([10, 0, 0]), &centroids, 1), 0);
		assert_eq!(nearest(&image::Rgb([10, 10, 0]), &centroids, 2), 0);
		assert_eq!(nearest(&image::Rgb([15, 5, 0]), &centroids, 0), 1);
		assert_eq!(nearest(&image::Rgb([0, 19, 0]), &centroids, 0), 2);
	}

	#[test]
	fn bucket_centroid_truncates() {
		let mut bucket = Bucket::default();
		bucket.add(&image::Rgb([1, 2, 3]));
		bucket.add(&image::Rgb([2, 2, 6]));
		assert_eq!(bucket.centroid(), image::Rgb([1, 2, 4]));
		assert_eq!(Bucket::default().centroid(), image::Rgb([0, 0, 0]));
	}

	#[test]
	fn reindex_numbers_colors_by_first_appearance() {
		let mut img = image::RgbImage::from_pixel(3, 2, image::Rgb([9, 9, 9]));
		img.put_pixel(0, 0, image::Rgb([1, 2, 3]));
		img.put_pixel(2, 1, image::Rgb([1, 2, 3]));
		img.put_pixel(1, 1, image::Rgb([4, 5, 6]));
		let indexed = reindex(&img).unwrap();
		assert_eq!(indexed.indices(), &[0, 1, 1, 1, 2, 0]);
		assert_eq!(
			indexed.palette().colors(),
			&[image::Rgb([1, 2, 3]), image::Rgb([9, 9, 9]), image::Rgb([4, 5, 6])]
		);
		assert_eq!(indexed.palette().counts(), &[2, 3, 1]);
	}

	#[test]
	fn reindex_rejects_more_than_a_byte_of_colors() {
		let img = image::RgbImage::from_fn(300, 1, |x, _| image::Rgb([(x % 256) as u8, (x / 256) as u8, 0]));
		assert_eq!(reindex(&img).unwrap_err(), QuantizeError::PaletteOverflow(257));
	}
}
