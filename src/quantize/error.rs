use thiserror::Error;

/// Reason why an image couldn't be quantized.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantizeError {
	/// The requested palette size is not in `1..=256`.
	#[error("allowed color count must be between 1 and 256, got {0}")]
	ColorCountOutOfRange(usize),
	/// A raw pixel buffer is shorter than its dimensions require.
	#[error("pixel buffer of {len} bytes is too small for a {width}x{height} RGBA image")]
	BufferTooSmall {
		len: usize,
		width: u32,
		height: u32,
	},
	/// More distinct colors turned up while reindexing than a byte can address.
	/// Only happens when a source yields different colors on different reads.
	#[error("{0} distinct colors do not fit in an 8-bit palette")]
	PaletteOverflow(usize),
}
