use std::collections::HashSet;

use wuquant::{quantize, Composited, IndexedImage, QuantizeError, RgbaBuffer, WuQuantizer};

fn init_logger() {
	let _ = env_logger::builder().is_test(true).try_init();
}

/// A smooth image with far more than 256 distinct colors.
fn photo_like(width: u32, height: u32) -> image::RgbImage {
	image::RgbImage::from_fn(width, height, |x, y| {
		image::Rgb([
			(x * 255 / width) as u8,
			(y * 255 / height) as u8,
			((x * 7 + y * 13) % 256) as u8,
		])
	})
}

fn distinct_indices(indexed: &IndexedImage) -> HashSet<u8> {
	indexed.indices().iter().copied().collect()
}

fn check_invariants(indexed: &IndexedImage, allowed: usize) {
	let pixels = indexed.width() as usize * indexed.height() as usize;
	let palette = indexed.palette();
	assert!(palette.len() <= allowed);
	assert!(distinct_indices(indexed).len() <= allowed);
	assert_eq!(indexed.indices().len(), pixels);
	assert!(indexed.indices().iter().all(|&i| (i as usize) < palette.len()));
	assert_eq!(palette.counts().iter().sum::<u64>(), pixels as u64);
	for (i, &count) in palette.counts().iter().enumerate() {
		let used = indexed.indices().iter().filter(|&&x| x as usize == i).count() as u64;
		assert_eq!(used, count, "entry {}", i);
		if count == 0 {
			assert_eq!(palette.colors()[i], image::Rgb([0, 0, 0]));
		}
	}
}

#[test]
fn respects_requested_size() {
	init_logger();
	let img = photo_like(64, 48);
	for &n in &[1, 2, 3, 16, 100, 256] {
		let indexed = quantize(&img, n).unwrap();
		check_invariants(&indexed, n);
	}
}

#[test]
fn color_count_limits() {
	let img = photo_like(8, 8);
	assert_eq!(quantize(&img, 257).unwrap_err(), QuantizeError::ColorCountOutOfRange(257));
	assert_eq!(quantize(&img, 0).unwrap_err(), QuantizeError::ColorCountOutOfRange(0));
	assert!(quantize(&img, 256).is_ok());
	assert_eq!(
		WuQuantizer::new(&img).quantize(300).unwrap_err(),
		QuantizeError::ColorCountOutOfRange(300)
	);
}

#[test]
fn four_primaries_into_two() {
	init_logger();
	let mut img = image::RgbImage::new(2, 2);
	img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
	img.put_pixel(1, 0, image::Rgb([0, 255, 0]));
	img.put_pixel(0, 1, image::Rgb([0, 0, 255]));
	img.put_pixel(1, 1, image::Rgb([0, 0, 0]));

	let indexed = quantize(&img, 2).unwrap();
	check_invariants(&indexed, 2);
	assert_eq!(distinct_indices(&indexed).len(), 2);
	assert_eq!(indexed.indices(), &[1, 0, 0, 0]);
	assert_eq!(indexed.palette().colors(), &[image::Rgb([0, 85, 85]), image::Rgb([255, 0, 0])]);
	assert_eq!(indexed.palette().counts(), &[3, 1]);
}

#[test]
fn entries_are_means_of_their_pixels() {
	let img = photo_like(40, 40);
	let indexed = quantize(&img, 12).unwrap();
	let palette = indexed.palette();
	check_invariants(&indexed, 12);

	// Entries are the means of what they received.
	let mut sums = vec![[0u64; 3]; palette.len()];
	for (x, y, p) in img.enumerate_pixels() {
		let index = indexed.index_at(x, y) as usize;
		for c in 0..3 {
			sums[index][c] += p.0[c] as u64;
		}
	}
	for (i, &count) in palette.counts().iter().enumerate() {
		if count > 0 {
			let mean = image::Rgb([
				(sums[i][0] / count) as u8,
				(sums[i][1] / count) as u8,
				(sums[i][2] / count) as u8,
			]);
			assert_eq!(palette.colors()[i], mean);
		}
	}

	// Every distinct color keeps a single index.
	let mut seen = std::collections::HashMap::new();
	for (x, y, p) in img.enumerate_pixels() {
		let index = indexed.index_at(x, y);
		assert_eq!(*seen.entry(*p).or_insert(index), index);
	}
}

#[test]
fn solid_color_gives_one_entry() {
	for &n in &[1, 2, 64, 256] {
		let img = image::RgbImage::from_pixel(100, 100, image::Rgb([12, 200, 99]));
		let indexed = quantize(&img, n).unwrap();
		assert_eq!(distinct_indices(&indexed).len(), 1);
		assert_eq!(indexed.palette().colors(), &[image::Rgb([12, 200, 99])]);
		assert_eq!(indexed.palette().counts(), &[10_000]);
	}
}

#[test]
fn few_colors_are_lossless() {
	let colors = [
		image::Rgb([0, 0, 0]),
		image::Rgb([1, 0, 0]),
		image::Rgb([2, 0, 0]),
		image::Rgb([255, 128, 7]),
		image::Rgb([8, 8, 8]),
	];
	let img = image::RgbImage::from_fn(17, 9, |x, y| colors[((x * 3 + y) % 5) as usize]);
	for &n in &[5, 6, 256] {
		let indexed = quantize(&img, n).unwrap();
		check_invariants(&indexed, n);
		assert_eq!(indexed.to_rgb_image(), img);
	}
	assert_eq!(WuQuantizer::new(&img).color_count(), 5);
}

#[test]
fn exactly_256_colors_are_lossless() {
	let img = image::RgbImage::from_fn(16, 16, |x, y| image::Rgb([(x * 16 + y) as u8, 3, (y * 5) as u8]));
	assert_eq!(WuQuantizer::new(&img).color_count(), 256);
	let indexed = quantize(&img, 256).unwrap();
	assert_eq!(indexed.palette().len(), 256);
	assert_eq!(indexed.to_rgb_image(), img);
}

#[test]
fn requantizing_is_stable() {
	let img = photo_like(50, 30);
	let first = quantize(&img, 32).unwrap();
	let expanded = first.to_rgb_image();
	let second = quantize(&expanded, 32).unwrap();
	assert_eq!(second.to_rgb_image(), expanded);

	// Same partition of pixels, possibly under different index numbers.
	let mut mapping = std::collections::HashMap::new();
	for (a, b) in first.indices().iter().zip(second.indices()) {
		let first_color = first.palette().get(*a);
		assert_eq!(*mapping.entry(*b).or_insert(first_color), first_color);
	}
}

#[test]
fn deterministic() {
	let img = photo_like(33, 21);
	assert_eq!(quantize(&img, 20).unwrap(), quantize(&img, 20).unwrap());
}

#[test]
fn translucent_pixels_are_blended_first() {
	let mut img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255]));
	img.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
	img.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));

	// Without a background the transparent pixels are black.
	let raw = quantize(&img, 4).unwrap();
	assert!(raw.palette().colors().contains(&image::Rgb([0, 0, 0])));

	let over_white = Composited::new(img.clone(), image::Rgb([255, 255, 255]));
	let blended = quantize(&over_white, 4).unwrap();
	assert_eq!(
		blended.palette().colors(),
		&[image::Rgb([255, 255, 255]), image::Rgb([0, 0, 255])]
	);
	assert_eq!(blended.index_at(0, 0), 0);
	assert_eq!(blended.index_at(3, 3), 1);
}

#[test]
fn raw_rgba_buffers() {
	let data: Vec<u8> = (0..6 * 4 * 4).map(|i| (i * 37 % 251) as u8).collect();
	let buffer = RgbaBuffer::new(&data, 6, 4).unwrap();
	let indexed = quantize(&buffer, 8).unwrap();
	check_invariants(&indexed, 8);
	assert_eq!((indexed.width(), indexed.height()), (6, 4));

	assert!(matches!(
		RgbaBuffer::new(&data[..10], 6, 4),
		Err(QuantizeError::BufferTooSmall { .. })
	));
}

#[test]
fn empty_image() {
	let img = image::RgbImage::new(0, 0);
	let indexed = quantize(&img, 16).unwrap();
	assert!(indexed.indices().is_empty());
	assert!(indexed.palette().is_empty());
}

#[test]
fn packed_rows_round_trip_through_palette_depth() {
	let colors = [image::Rgb([10, 0, 0]), image::Rgb([0, 10, 0]), image::Rgb([0, 0, 10])];
	let img = image::RgbImage::from_fn(5, 3, |x, y| colors[((x + y) % 3) as usize]);
	let indexed = quantize(&img, 16).unwrap();
	let depth = indexed.palette().bit_depth();
	assert_eq!(depth, 2);
	let packed = indexed.packed_rows(depth);
	// five 2-bit indices per row round up to two bytes
	assert_eq!(packed.len(), 2 * 3);
	for y in 0..3u32 {
		for x in 0..5u32 {
			let byte = packed[(y * 2 + x / 4) as usize];
			let shift = 6 - 2 * (x % 4);
			assert_eq!((byte >> shift) & 0b11, indexed.index_at(x, y));
		}
	}
}
