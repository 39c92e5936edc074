use image::error::ImageError;

use wuquant::{Composited, IndexedImage, QuantizeError, WuQuantizer};

use std::fs::File;
use std::io::BufWriter;

/// Helper function for `main`.
fn error_exit(msg: &str, code: i32) -> ! {
	eprintln!("{}", msg);
	std::process::exit(code)
}

/// Parses a `RRGGBB` hex triplet, with or without a leading `#`.
fn parse_background(s: &str) -> Option<wuquant::Color> {
	let s = s.trim_start_matches('#');
	if s.len() != 6 {
		return None;
	}
	let channel = |i: usize| u8::from_str_radix(s.get(i..i + 2)?, 16).ok();
	Some(image::Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

/// Writes `indexed` as a paletted PNG at the smallest bit depth that fits.
fn save_indexed(path: &str, indexed: &IndexedImage) -> Result<(), png::EncodingError> {
	let palette = indexed.palette();
	let depth = match palette.bit_depth() {
		1 => png::BitDepth::One,
		2 => png::BitDepth::Two,
		4 => png::BitDepth::Four,
		_ => png::BitDepth::Eight,
	};
	let rgb_palette = palette.colors().iter().flat_map(|c| c.0.to_vec()).collect::<Vec<_>>();

	let out_fh = BufWriter::new(File::create(path)?);
	let mut encoder = png::Encoder::new(out_fh, indexed.width(), indexed.height());
	encoder.set_color(png::ColorType::Indexed);
	encoder.set_depth(depth);
	encoder.set_palette(rgb_palette);
	let mut writer = encoder.write_header()?;
	writer.write_image_data(&indexed.packed_rows(palette.bit_depth()))?;
	Ok(())
}

/// `clap`-based CLI for reducing images to an indexed palette.
///
/// May exit process with status code if there are errors:
///
/// 1: `clap` error
///
/// 2: invalid arguments
///
/// 3: file I/O issues
///
/// 4: invalid image data
///
/// 5: computation limits exceeded
///
/// 10: other, potentially unknown error
fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

	let clap_matches = clap::App::new("wuquant")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Reduces an image to an indexed palette of at most 256 colors.")
		.arg_from_usage("-c, --colors=[N] 'Maximum palette size, 1 to 256; defaults to 256'")
		.arg_from_usage("-b, --background=[RRGGBB] 'Color translucent pixels are blended onto; defaults to ffffff'")
		.arg_from_usage("-e, --expand 'Write a truecolor PNG expanded through the palette instead of an indexed one'")
		.arg_from_usage("<INPUT> 'Path to input file (any format the image crate reads)'")
		.arg_from_usage("[OUTPUT] 'Path to output PNG; defaults to INPUT with a .quant.png extension'")
		.get_matches();

	let input_path = clap_matches.value_of("INPUT").unwrap_or_default();
	let colors = match clap_matches.value_of("colors").unwrap_or("256").parse::<usize>() {
		Ok(n) => n,
		Err(_) => error_exit("Non-numeric value for colors", 2)
	};
	let background = match parse_background(clap_matches.value_of("background").unwrap_or("ffffff")) {
		Some(c) => c,
		None => error_exit("Background must be a hex color like ff8800", 2)
	};
	let output_path = clap_matches.value_of("OUTPUT")
		.map(str::to_string)
		.unwrap_or_else(|| input_path.rsplitn(2, '.').last().unwrap_or(input_path).to_string() + ".quant.png");

	let source = match image::open(input_path) {
		Ok(i) => i,
		Err(e) => {
			let (msg, code) = match e {
				ImageError::Decoding(_) => ("Invalid image data", 4),
				ImageError::Limits(_) => ("Computation limits exceeded", 5),
				ImageError::IoError(_) => ("File not found or could not be read", 3),
				_ => ("An error occurred", 10)
			};
			error_exit(msg, code)
		}
	}.into_rgba8();
	let source = Composited::new(source, background);

	let quantizer = WuQuantizer::new(&source);
	let distinct = quantizer.color_count();
	let indexed = match quantizer.quantize(colors) {
		Ok(i) => i,
		Err(e @ QuantizeError::ColorCountOutOfRange(_)) => error_exit(&e.to_string(), 2),
		Err(e) => error_exit(&e.to_string(), 10)
	};
	eprintln!("{} colors reduced to {} palette entries", distinct, indexed.palette().len());

	if clap_matches.is_present("expand") {
		match indexed.to_rgb_image().save(&output_path) {
			Ok(_) => (),
			Err(_) => error_exit("Could not save output", 3)
		}
	} else {
		match save_indexed(&output_path, &indexed) {
			Ok(_) => (),
			Err(png::EncodingError::IoError(_)) => error_exit("Could not write to output file", 3),
			Err(e) => error_exit(&e.to_string(), 10)
		}
	}
}
