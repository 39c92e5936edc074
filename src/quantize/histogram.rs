use std::ops::{Add, Sub};

use bitvec::prelude::*;

use super::cube::{Axis, Cube};
use super::palette::Color;
use crate::source::PixelSource;

/// Cells per axis: 32 levels per channel plus the zero border row.
pub(crate) const SIDE: usize = 33;
/// Total number of histogram cells.
pub(crate) const CELLS: usize = SIDE * SIDE * SIDE;

/// One bit for each possible 24-bit color.
type ColorSet = BitVec<usize, Lsb0>;

/// Flat offset of cell `(r, g, b)`, i.e. `r * 33 * 33 + g * 33 + b`.
///
/// Also serves as the per-pixel "initial guess" key into the tag table.
#[inline]
pub(crate) fn cell_index(r: usize, g: usize, b: usize) -> usize {
	(r << 10) + (r << 6) + r + (g << 5) + g + b
}

/// Maps an 8-bit channel onto the 1..=32 histogram grid.
#[inline]
pub(crate) fn quantize_channel(c: u8) -> usize {
	(c >> 3) as usize + 1
}

/// The four integer moments of a box: pixel count and per-channel sums.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct BoxSums {
	pub weight: i64,
	pub red: i64,
	pub green: i64,
	pub blue: i64,
}

impl BoxSums {
	/// `|sum|^2 / weight`, the quantity Wu's cut search maximizes.
	pub fn score(&self) -> f32 {
		let (r, g, b) = (self.red as f32, self.green as f32, self.blue as f32);
		(r * r + g * g + b * b) / self.weight as f32
	}
}

impl Add for BoxSums {
	type Output = Self;

	fn add(self, rhs: Self) -> Self {
		Self {
			weight: self.weight + rhs.weight,
			red: self.red + rhs.red,
			green: self.green + rhs.green,
			blue: self.blue + rhs.blue,
		}
	}
}

impl Sub for BoxSums {
	type Output = Self;

	fn sub(self, rhs: Self) -> Self {
		Self {
			weight: self.weight - rhs.weight,
			red: self.red - rhs.red,
			green: self.green - rhs.green,
			blue: self.blue - rhs.blue,
		}
	}
}

/// The five moment tables over the 33x33x33 grid.
///
/// Raw per-cell counts while the histogram is being filled; after
/// [`Histogram::prefix_summed`] every cell holds the totals of all cells at
/// or below it on each axis, which is what the box queries expect.
#[derive(Clone, Debug)]
pub(crate) struct Moments {
	pub weights: Vec<i64>,
	pub red: Vec<i64>,
	pub green: Vec<i64>,
	pub blue: Vec<i64>,
	pub squares: Vec<f32>,
}

impl Moments {
	fn zeroed() -> Self {
		Self {
			weights: vec![0; CELLS],
			red: vec![0; CELLS],
			green: vec![0; CELLS],
			blue: vec![0; CELLS],
			squares: vec![0.0; CELLS],
		}
	}

	fn accumulate(&mut self) {
		accumulate(&mut self.weights);
		accumulate(&mut self.red);
		accumulate(&mut self.green);
		accumulate(&mut self.blue);
		accumulate(&mut self.squares);
	}

	fn at(&self, index: usize) -> BoxSums {
		BoxSums {
			weight: self.weights[index],
			red: self.red[index],
			green: self.green[index],
			blue: self.blue[index],
		}
	}

	/// Integer moments of everything inside `cube`.
	pub fn sums(&self, cube: &Cube) -> BoxSums {
		BoxSums {
			weight: volume(cube, &self.weights),
			red: volume(cube, &self.red),
			green: volume(cube, &self.green),
			blue: volume(cube, &self.blue),
		}
	}

	/// Sum of squared channel values inside `cube`.
	pub fn squares(&self, cube: &Cube) -> f32 {
		volume(cube, &self.squares)
	}

	/// The part of a box sum contributed by the cube's lower face on `axis`,
	/// taken with a negative sign. Adding [`top`](Self::top) at a split
	/// position gives the moments of the lower half.
	pub fn bottom(&self, cube: &Cube, axis: Axis) -> BoxSums {
		let c = cube;
		let (r0, r1) = (c.red_min as usize, c.red_max as usize);
		let (g0, g1) = (c.green_min as usize, c.green_max as usize);
		let (b0, b1) = (c.blue_min as usize, c.blue_max as usize);
		match axis {
			Axis::Red => self.at(cell_index(r0, g1, b0)) + self.at(cell_index(r0, g0, b1))
				- self.at(cell_index(r0, g1, b1)) - self.at(cell_index(r0, g0, b0)),
			Axis::Green => self.at(cell_index(r1, g0, b0)) + self.at(cell_index(r0, g0, b1))
				- self.at(cell_index(r1, g0, b1)) - self.at(cell_index(r0, g0, b0)),
			Axis::Blue => self.at(cell_index(r1, g0, b0)) + self.at(cell_index(r0, g1, b0))
				- self.at(cell_index(r1, g1, b0)) - self.at(cell_index(r0, g0, b0)),
		}
	}

	/// Moments of the slab at `position` on `axis`, accumulated from the
	/// grid origin; see [`bottom`](Self::bottom).
	pub fn top(&self, cube: &Cube, axis: Axis, position: u8) -> BoxSums {
		let c = cube;
		let p = position as usize;
		let (r0, r1) = (c.red_min as usize, c.red_max as usize);
		let (g0, g1) = (c.green_min as usize, c.green_max as usize);
		let (b0, b1) = (c.blue_min as usize, c.blue_max as usize);
		match axis {
			Axis::Red => self.at(cell_index(p, g1, b1)) - self.at(cell_index(p, g1, b0))
				- self.at(cell_index(p, g0, b1)) + self.at(cell_index(p, g0, b0)),
			Axis::Green => self.at(cell_index(r1, p, b1)) - self.at(cell_index(r1, p, b0))
				- self.at(cell_index(r0, p, b1)) + self.at(cell_index(r0, p, b0)),
			Axis::Blue => self.at(cell_index(r1, g1, p)) - self.at(cell_index(r1, g0, p))
				- self.at(cell_index(r0, g1, p)) + self.at(cell_index(r0, g0, p)),
		}
	}
}

/// Turns a table of per-cell values into 3D prefix sums in place,
/// running along red, then green, then blue.
fn accumulate<T>(table: &mut [T])
where
	T: Copy + Default + Add<Output = T>,
{
	let mut area = [T::default(); SIDE];
	for r in 1..SIDE {
		for a in area.iter_mut() {
			*a = T::default();
		}
		for g in 1..SIDE {
			let mut line = T::default();
			for b in 1..SIDE {
				let index = cell_index(r, g, b);
				line = line + table[index];
				area[b] = area[b] + line;
				table[index] = table[cell_index(r - 1, g, b)] + area[b];
			}
		}
	}
}

/// Inclusion/exclusion over the eight corners of `cube`, giving the total
/// of `table` inside it.
pub(crate) fn volume<T>(cube: &Cube, table: &[T]) -> T
where
	T: Copy + Add<Output = T> + Sub<Output = T>,
{
	let (r0, r1) = (cube.red_min as usize, cube.red_max as usize);
	let (g0, g1) = (cube.green_min as usize, cube.green_max as usize);
	let (b0, b1) = (cube.blue_min as usize, cube.blue_max as usize);
	table[cell_index(r1, g1, b1)]
		- table[cell_index(r1, g1, b0)]
		- table[cell_index(r1, g0, b1)]
		+ table[cell_index(r1, g0, b0)]
		- table[cell_index(r0, g1, b1)]
		+ table[cell_index(r0, g1, b0)]
		+ table[cell_index(r0, g0, b1)]
		- table[cell_index(r0, g0, b0)]
}

/// Pixel statistics gathered in one pass over a source.
#[derive(Clone, Debug)]
pub(crate) struct Histogram {
	moments: Moments,
	/// Cell index of every pixel, row-major.
	guesses: Vec<u16>,
	color_count: usize,
}

impl Histogram {
	pub fn from_source<S: PixelSource + ?Sized>(source: &S) -> Self {
		let (width, height) = (source.width(), source.height());
		let squares: Vec<i32> = (0..256).map(|i| i * i).collect();
		let mut moments = Moments::zeroed();
		let mut guesses = Vec::with_capacity(width as usize * height as usize);
		let mut seen = ColorSet::repeat(false, 1 << 24);
		let mut color_count = 0;

		for y in 0..height {
			for x in 0..width {
				let color: Color = source.opaque_color_at(x, y);
				let image::Rgb([r, g, b]) = color;
				let index = cell_index(
					quantize_channel(r),
					quantize_channel(g),
					quantize_channel(b),
				);
				moments.weights[index] += 1;
				moments.red[index] += r as i64;
				moments.green[index] += g as i64;
				moments.blue[index] += b as i64;
				moments.squares[index] +=
					(squares[r as usize] + squares[g as usize] + squares[b as usize]) as f32;
				guesses.push(index as u16);

				let key = (r as usize) << 16 | (g as usize) << 8 | b as usize;
				if !seen[key] {
					seen.set(key, true);
					color_count += 1;
				}
			}
		}

		Self { moments, guesses, color_count }
	}

	/// Exact number of distinct 24-bit colors seen.
	pub fn color_count(&self) -> usize {
		self.color_count
	}

	/// Converts the raw tables to prefix sums, handing back the per-pixel
	/// cell indices alongside.
	pub fn prefix_summed(self) -> (Moments, Vec<u16>) {
		let Self { mut moments, guesses, .. } = self;
		moments.accumulate();
		(moments, guesses)
	}
}
