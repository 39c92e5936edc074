use crate::quantize::error::QuantizeError;
use crate::quantize::palette::Color;

/// Anything that can hand out RGBA pixels by coordinate.
///
/// The quantizer reads every pixel twice (once to build the histogram and
/// once to remap), always through [`opaque_color_at`](Self::opaque_color_at),
/// so both passes see the same colors.
pub trait PixelSource {
	fn width(&self) -> u32;
	fn height(&self) -> u32;
	/// The raw color at `(x, y)`, alpha included.
	fn color_at(&self, x: u32, y: u32) -> image::Rgba<u8>;
	/// The color at `(x, y)` composited against the real background, for
	/// sources that know what they are drawn on.
	///
	/// The default is `None`, meaning alpha is simply dropped.
	fn blended_color_at(&self, _x: u32, _y: u32) -> Option<Color> {
		None
	}
	/// The color the quantizer works with: blended when the pixel is not
	/// fully opaque and the source can blend, otherwise alpha stripped.
	fn opaque_color_at(&self, x: u32, y: u32) -> Color {
		let c = self.color_at(x, y);
		if c.0[3] < 255 {
			if let Some(blended) = self.blended_color_at(x, y) {
				return blended;
			}
		}
		image::Rgb([c.0[0], c.0[1], c.0[2]])
	}
}

impl<S: PixelSource + ?Sized> PixelSource for &S {
	fn width(&self) -> u32 { (**self).width() }
	fn height(&self) -> u32 { (**self).height() }
	fn color_at(&self, x: u32, y: u32) -> image::Rgba<u8> { (**self).color_at(x, y) }
	fn blended_color_at(&self, x: u32, y: u32) -> Option<Color> {
		(**self).blended_color_at(x, y)
	}
	fn opaque_color_at(&self, x: u32, y: u32) -> Color { (**self).opaque_color_at(x, y) }
}

impl PixelSource for image::RgbaImage {
	fn width(&self) -> u32 { self.dimensions().0 }
	fn height(&self) -> u32 { self.dimensions().1 }
	fn color_at(&self, x: u32, y: u32) -> image::Rgba<u8> {
		*self.get_pixel(x, y)
	}
}

impl PixelSource for image::RgbImage {
	fn width(&self) -> u32 { self.dimensions().0 }
	fn height(&self) -> u32 { self.dimensions().1 }
	fn color_at(&self, x: u32, y: u32) -> image::Rgba<u8> {
		let p = self.get_pixel(x, y);
		image::Rgba([p.0[0], p.0[1], p.0[2], 255])
	}
	fn opaque_color_at(&self, x: u32, y: u32) -> Color {
		*self.get_pixel(x, y)
	}
}

/// Borrowed, tightly packed RGBA8 pixel data with its dimensions.
#[derive(Debug, Clone, Copy)]
pub struct RgbaBuffer<'data> {
	width: u32,
	height: u32,
	data: &'data [u8],
}

impl<'data> RgbaBuffer<'data> {
	/// Wraps a slice of RGBA pixels in row-major order.
	///
	/// Returns [`QuantizeError::BufferTooSmall`] if the slice holds fewer
	/// than `width * height * 4` bytes.
	pub fn new(data: &'data [u8], width: u32, height: u32) -> Result<Self, QuantizeError> {
		if data.len() < width as usize * height as usize * 4 {
			return Err(QuantizeError::BufferTooSmall { len: data.len(), width, height });
		}
		Ok(Self { width, height, data })
	}
}

impl PixelSource for RgbaBuffer<'_> {
	fn width(&self) -> u32 { self.width }
	fn height(&self) -> u32 { self.height }
	fn color_at(&self, x: u32, y: u32) -> image::Rgba<u8> {
		let i = (y as usize * self.width as usize + x as usize) * 4;
		image::Rgba([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
	}
}

/// A source drawn over a solid background color.
///
/// Translucent pixels are blended as `(c * a + bg * (255 - a)) / 255` per
/// channel; opaque pixels pass through untouched.
#[derive(Debug, Clone)]
pub struct Composited<S> {
	pub inner: S,
	pub background: Color,
}

impl<S: PixelSource> Composited<S> {
	pub fn new(inner: S, background: Color) -> Self {
		Self { inner, background }
	}
}

fn blend_channel(c: u8, bg: u8, alpha: u8) -> u8 {
	let alpha = alpha as u32;
	((c as u32 * alpha + bg as u32 * (255 - alpha)) / 255) as u8
}

impl<S: PixelSource> PixelSource for Composited<S> {
	fn width(&self) -> u32 { self.inner.width() }
	fn height(&self) -> u32 { self.inner.height() }
	fn color_at(&self, x: u32, y: u32) -> image::Rgba<u8> {
		self.inner.color_at(x, y)
	}
	fn blended_color_at(&self, x: u32, y: u32) -> Option<Color> {
		let c = self.inner.color_at(x, y);
		let a = c.0[3];
		let bg = self.background.0;
		Some(image::Rgb([
			blend_channel(c.0[0], bg[0], a),
			blend_channel(c.0[1], bg[1], a),
			blend_channel(c.0[2], bg[2], a),
		]))
	}
}
