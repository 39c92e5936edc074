use super::histogram::{BoxSums, Moments};

/// Axis of the quantized RGB grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Axis {
	Red,
	Green,
	Blue,
}

/// A box in quantized color space.
///
/// Each axis covers the grid cells `min + 1 ..= max`, so `min` may be the
/// zero border row and a box with `min == max` on any axis is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Cube {
	pub red_min: u8,
	pub red_max: u8,
	pub green_min: u8,
	pub green_max: u8,
	pub blue_min: u8,
	pub blue_max: u8,
	/// Number of grid cells covered.
	pub volume: u32,
}

impl Cube {
	pub fn new(red: (u8, u8), green: (u8, u8), blue: (u8, u8)) -> Self {
		let mut cube = Self {
			red_min: red.0,
			red_max: red.1,
			green_min: green.0,
			green_max: green.1,
			blue_min: blue.0,
			blue_max: blue.1,
			volume: 0,
		};
		cube.update_volume();
		cube
	}

	/// The box spanning the entire grid.
	pub fn full() -> Self {
		Self::new((0, 32), (0, 32), (0, 32))
	}

	fn bounds(&self, axis: Axis) -> (u8, u8) {
		match axis {
			Axis::Red => (self.red_min, self.red_max),
			Axis::Green => (self.green_min, self.green_max),
			Axis::Blue => (self.blue_min, self.blue_max),
		}
	}

	fn update_volume(&mut self) {
		self.volume = (self.red_max - self.red_min) as u32
			* (self.green_max - self.green_min) as u32
			* (self.blue_max - self.blue_min) as u32;
	}

	/// Every grid cell inside the box.
	pub fn cells(&self) -> impl Iterator<Item = (usize, usize, usize)> {
		let c = *self;
		(c.red_min as usize + 1..=c.red_max as usize).flat_map(move |r| {
			(c.green_min as usize + 1..=c.green_max as usize).flat_map(move |g| {
				(c.blue_min as usize + 1..=c.blue_max as usize).map(move |b| (r, g, b))
			})
		})
	}
}

/// Spread of the colors inside `cube`: sum of squares minus squared sum over
/// weight. Boxes of a single cell, or with nothing in them, count as zero.
pub(crate) fn variance(moments: &Moments, cube: &Cube) -> f32 {
	if cube.volume <= 1 {
		return 0.0;
	}
	let sums = moments.sums(cube);
	if sums.weight == 0 {
		return 0.0;
	}
	let (r, g, b) = (sums.red as f32, sums.green as f32, sums.blue as f32);
	let distance = r * r + g * g + b * b;
	moments.squares(cube) - distance / sums.weight as f32
}

/// Finds the split position on `axis` that maximizes the summed
/// `|sum|^2 / weight` of both halves, skipping positions that leave either
/// half empty.
///
/// Returns the best score (0 if nothing qualified) and its position.
fn maximize(moments: &Moments, cube: &Cube, axis: Axis, whole: BoxSums) -> (f32, Option<u8>) {
	let bottom = moments.bottom(cube, axis);
	let (min, max) = cube.bounds(axis);
	let mut best = 0.0;
	let mut cut = None;
	for position in min + 1..max {
		let half = bottom + moments.top(cube, axis, position);
		if half.weight == 0 {
			continue;
		}
		let rest = whole - half;
		if rest.weight == 0 {
			continue;
		}
		let score = half.score() + rest.score();
		if score > best {
			best = score;
			cut = Some(position);
		}
	}
	(best, cut)
}

/// Splits `cube` in two along whichever axis gives the greatest reduction
/// in variance. Ties go to red, then green.
///
/// Returns `None` when no position on any axis leaves both halves occupied.
pub(crate) fn cut(moments: &Moments, cube: &Cube) -> Option<(Cube, Cube)> {
	let whole = moments.sums(cube);
	let (max_red, cut_red) = maximize(moments, cube, Axis::Red, whole);
	let (max_green, cut_green) = maximize(moments, cube, Axis::Green, whole);
	let (max_blue, cut_blue) = maximize(moments, cube, Axis::Blue, whole);

	let (axis, position) = if max_red >= max_green && max_red >= max_blue {
		(Axis::Red, cut_red?)
	} else if max_green >= max_blue {
		(Axis::Green, cut_green?)
	} else {
		(Axis::Blue, cut_blue?)
	};

	let mut lower = *cube;
	let mut upper = *cube;
	match axis {
		Axis::Red => {
			lower.red_max = position;
			upper.red_min = position;
		}
		Axis::Green => {
			lower.green_max = position;
			upper.green_min = position;
		}
		Axis::Blue => {
			lower.blue_max = position;
			upper.blue_min = position;
		}
	}
	lower.update_volume();
	upper.update_volume();
	log::trace!("cut {:?} at {} on {:?}", cube, position, axis);
	Some((lower, upper))
}

/// Repeatedly splits the box with the largest variance until there are
/// `max_cubes` boxes or nothing is left worth splitting.
///
/// A box that cannot be cut has its variance zeroed and the same slot is
/// tried again with the next candidate. Fewer boxes than requested is a
/// normal outcome.
pub(crate) fn partition(moments: &Moments, max_cubes: usize) -> Vec<Cube> {
	let mut cubes = vec![Cube::default(); max_cubes.max(1)];
	let mut variances = vec![0.0f32; cubes.len()];
	cubes[0] = Cube::full();

	let mut next = 0;
	let mut k = 1;
	while k < max_cubes {
		let last = match cut(moments, &cubes[next]) {
			Some((lower, upper)) => {
				cubes[next] = lower;
				cubes[k] = upper;
				variances[next] = variance(moments, &lower);
				variances[k] = variance(moments, &upper);
				k
			}
			None => {
				variances[next] = 0.0;
				k - 1
			}
		};

		next = 0;
		let mut largest = variances[0];
		for (index, &v) in variances.iter().enumerate().take(last + 1).skip(1) {
			if v > largest {
				largest = v;
				next = index;
			}
		}
		if largest <= 0.0 {
			log::debug!("stopped partitioning at {} of {} boxes", last + 1, max_cubes);
			cubes.truncate(last + 1);
			return cubes;
		}
		if last == k {
			k += 1;
		}
	}
	cubes
}
