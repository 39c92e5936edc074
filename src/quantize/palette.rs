use super::cube::Cube;
use super::histogram::{cell_index, volume, Moments, CELLS};

/// An opaque palette color.
pub type Color = image::Rgb<u8>;

/// The colors an [`IndexedImage`](super::IndexedImage) refers to, in the
/// order they were created (not sorted by similarity).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
	colors: Vec<Color>,
	counts: Vec<u64>,
}

impl Palette {
	pub(crate) fn new(colors: Vec<Color>, counts: Vec<u64>) -> Self {
		debug_assert_eq!(colors.len(), counts.len());
		Self { colors, counts }
	}

	pub fn len(&self) -> usize {
		self.colors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.colors.is_empty()
	}

	pub fn colors(&self) -> &[Color] {
		&self.colors
	}

	/// Number of pixels mapped to each entry. Entries nothing was mapped to
	/// have a count of zero and the color black.
	pub fn counts(&self) -> &[u64] {
		&self.counts
	}

	/// Looks up a palette entry by index.
	pub fn get(&self, index: u8) -> Option<Color> {
		self.colors.get(index as usize).copied()
	}

	/// The smallest PNG-compatible bit depth (1, 2, 4 or 8) able to address
	/// every entry.
	pub fn bit_depth(&self) -> u8 {
		match self.colors.len() {
			0..=2 => 1,
			3..=4 => 2,
			5..=16 => 4,
			_ => 8,
		}
	}
}

/// Maps every histogram cell to the box (and so the palette index) that
/// contains it.
pub(crate) struct TagTable(Box<[u8]>);

impl TagTable {
	fn new() -> Self {
		TagTable(vec![0; CELLS].into_boxed_slice())
	}

	fn mark(&mut self, cube: &Cube, label: u8) {
		for (r, g, b) in cube.cells() {
			self.0[cell_index(r, g, b)] = label;
		}
	}

	/// The palette index owning `cell`.
	pub fn get(&self, cell: u16) -> u8 {
		self.0[cell as usize]
	}
}

/// Tags every box's cells with its index and computes a first estimate of
/// each box's color from the histogram moments. Empty boxes get black.
///
/// The estimates are provisional; remapping replaces them with the mean of
/// the pixels actually assigned.
pub(crate) fn resolve(moments: &Moments, cubes: &[Cube]) -> (TagTable, Vec<Color>) {
	let mut tags = TagTable::new();
	let mut centroids = Vec::with_capacity(cubes.len());
	for (k, cube) in cubes.iter().enumerate() {
		tags.mark(cube, k as u8);
		let weight = volume(cube, &moments.weights);
		if weight > 0 {
			let sums = moments.sums(cube);
			centroids.push(image::Rgb([
				(sums.red / weight) as u8,
				(sums.green / weight) as u8,
				(sums.blue / weight) as u8,
			]));
		} else {
			centroids.push(image::Rgb([0, 0, 0]));
		}
	}
	(tags, centroids)
}
