//! PNG encoding for rendered figures.
//!
//! Supports two encoding modes:
//! - **Indexed PNG (color type 3)**: used when the image has at most 256
//!   unique colors, as flat histograms usually do.
//! - **RGBA PNG (color type 6)**: fallback for anti-aliased line plots.
//!
//! Every file carries a `pHYs` chunk with the figure resolution and one
//! `tEXt` chunk per metadata entry (title, axis labels, software).

use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Write;

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096; // 64x64 or larger

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

const INCHES_PER_METRE: f64 = 39.370_078_740_157_48;

/// Text and resolution stored alongside the pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PngMetadata {
    /// Dots per inch, written as a `pHYs` chunk when set.
    pub dpi: Option<u32>,
    /// `(keyword, text)` pairs, written as `tEXt` chunks in order.
    pub text: Vec<(String, String)>,
}

impl PngMetadata {
    pub fn with_dpi(dpi: u32) -> Self {
        Self {
            dpi: Some(dpi),
            text: Vec::new(),
        }
    }

    pub fn push_text(&mut self, keyword: impl Into<String>, text: impl Into<String>) {
        self.text.push((keyword.into(), text.into()));
    }
}

/// Encode RGBA pixels, picking indexed or RGBA output automatically.
pub fn encode_png(
    pixels: &[u8],
    width: usize,
    height: usize,
    metadata: &PngMetadata,
) -> Result<Vec<u8>, String> {
    if width == 0 || height == 0 {
        return Err(format!("cannot encode a {}x{} image", width, height));
    }
    if pixels.len() != width * height * 4 {
        return Err(format!(
            "expected {} bytes for {}x{} RGBA, got {}",
            width * height * 4,
            width,
            height,
            pixels.len()
        ));
    }
    let num_pixels = width * height;

    let palette_result = if num_pixels >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    match palette_result {
        Some((palette, indices)) => {
            write_header(&mut png, width, height, 3);
            write_palette(&mut png, &palette);
            write_metadata(&mut png, metadata)?;
            let idat = deflate_scanlines(&indices, width, height)
                .map_err(|e| format!("IDAT compression failed: {}", e))?;
            write_chunk(&mut png, b"IDAT", &idat);
        }
        None => {
            write_header(&mut png, width, height, 6);
            write_metadata(&mut png, metadata)?;
            let idat = deflate_scanlines(pixels, width * 4, height)
                .map_err(|e| format!("IDAT compression failed: {}", e))?;
            write_chunk(&mut png, b"IDAT", &idat);
        }
    }

    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Pack RGBA bytes into a u32 for faster hashing and comparison
#[inline(always)]
fn pack_color(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

#[inline(always)]
fn unpack_color(packed: u32) -> (u8, u8, u8, u8) {
    (
        packed as u8,
        (packed >> 8) as u8,
        (packed >> 16) as u8,
        (packed >> 24) as u8,
    )
}

/// Sequential palette extraction for small images.
fn extract_palette_sequential(pixels: &[u8]) -> Option<(Vec<(u8, u8, u8, u8)>, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<(u8, u8, u8, u8)> = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for chunk in pixels.chunks_exact(4) {
        let packed = pack_color(chunk[0], chunk[1], chunk[2], chunk[3]);

        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push((chunk[0], chunk[1], chunk[2], chunk[3]));
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Parallel palette extraction for larger images.
///
/// Unique colors are gathered per chunk, merged, and then each pixel is
/// mapped to its index in a second parallel pass.
fn extract_palette_parallel(pixels: &[u8]) -> Option<(Vec<(u8, u8, u8, u8)>, Vec<u8>)> {
    let chunk_pixels = (pixels.len() / 4 / rayon::current_num_threads()).max(256);
    let chunk_size = chunk_pixels * 4;

    let unique_colors: Vec<u32> = pixels
        .par_chunks(chunk_size)
        .flat_map(|chunk| {
            let mut local: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
            for pixel in chunk.chunks_exact(4) {
                local.insert(pack_color(pixel[0], pixel[1], pixel[2], pixel[3]), ());
                if local.len() > MAX_PALETTE_SIZE {
                    break;
                }
            }
            local.into_keys().collect::<Vec<_>>()
        })
        .collect();

    let mut global: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<(u8, u8, u8, u8)> = Vec::with_capacity(MAX_PALETTE_SIZE);
    for packed in unique_colors {
        if !global.contains_key(&packed) {
            if palette.len() >= MAX_PALETTE_SIZE {
                return None;
            }
            global.insert(packed, palette.len() as u8);
            palette.push(unpack_color(packed));
        }
    }

    let mut indices = vec![0u8; pixels.len() / 4];
    indices
        .par_chunks_mut(chunk_pixels)
        .zip(pixels.par_chunks(chunk_size))
        .for_each(|(idx_chunk, px_chunk)| {
            for (idx, pixel) in idx_chunk.iter_mut().zip(px_chunk.chunks_exact(4)) {
                let packed = pack_color(pixel[0], pixel[1], pixel[2], pixel[3]);
                *idx = global.get(&packed).copied().unwrap_or(0);
            }
        });

    Some((palette, indices))
}

fn write_header(png: &mut Vec<u8>, width: usize, height: usize, color_type: u8) {
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(color_type);
    ihdr.push(0); // compression method
    ihdr.push(0); // filter method
    ihdr.push(0); // interlace method
    write_chunk(png, b"IHDR", &ihdr);
}

fn write_palette(png: &mut Vec<u8>, palette: &[(u8, u8, u8, u8)]) {
    let plte: Vec<u8> = palette.iter().flat_map(|&(r, g, b, _)| [r, g, b]).collect();
    write_chunk(png, b"PLTE", &plte);

    // tRNS only if any entry is translucent
    if palette.iter().any(|&(_, _, _, a)| a < 255) {
        let trns: Vec<u8> = palette.iter().map(|&(_, _, _, a)| a).collect();
        write_chunk(png, b"tRNS", &trns);
    }
}

fn write_metadata(png: &mut Vec<u8>, metadata: &PngMetadata) -> Result<(), String> {
    if let Some(dpi) = metadata.dpi {
        let ppm = (dpi as f64 * INCHES_PER_METRE).round() as u32;
        let mut phys = Vec::with_capacity(9);
        phys.extend_from_slice(&ppm.to_be_bytes());
        phys.extend_from_slice(&ppm.to_be_bytes());
        phys.push(1); // unit: metre
        write_chunk(png, b"pHYs", &phys);
    }

    for (keyword, text) in &metadata.text {
        write_chunk(png, b"tEXt", &text_chunk(keyword, text)?);
    }
    Ok(())
}

/// Body of a `tEXt` chunk: Latin-1 keyword, NUL, Latin-1 text.
///
/// Characters outside Latin-1 are replaced with `?`.
fn text_chunk(keyword: &str, text: &str) -> Result<Vec<u8>, String> {
    let valid_keyword = (1..=79).contains(&keyword.len())
        && keyword.bytes().all(|b| (32..=126).contains(&b))
        && !keyword.starts_with(' ')
        && !keyword.ends_with(' ');
    if !valid_keyword {
        return Err(format!("invalid PNG text keyword '{}'", keyword));
    }

    let mut data = Vec::with_capacity(keyword.len() + 1 + text.len());
    data.extend_from_slice(keyword.as_bytes());
    data.push(0);
    data.extend(text.chars().map(|c| match u32::from(c) {
        0 => b' ',
        n if n <= 0xff => n as u8,
        _ => b'?',
    }));
    Ok(data)
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix each `row_bytes`-wide scanline with filter type 0 and deflate.
fn deflate_scanlines(
    data: &[u8],
    row_bytes: usize,
    height: usize,
) -> Result<Vec<u8>, std::io::Error> {
    let mut uncompressed = Vec::with_capacity(height * (1 + row_bytes));
    for row in data.chunks_exact(row_bytes).take(height) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}

/// Read back the `tEXt` entries of an encoded PNG.
pub fn read_text_chunks(png: &[u8]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if png.len() < 8 || png[..8] != PNG_SIGNATURE {
        return out;
    }

    let mut offset = 8;
    while offset + 12 <= png.len() {
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&png[offset..offset + 4]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        let kind = &png[offset + 4..offset + 8];
        let start = offset + 8;
        let end = start + len;
        if end + 4 > png.len() {
            break;
        }

        if kind == b"tEXt" {
            let body = &png[start..end];
            if let Some(nul) = body.iter().position(|&b| b == 0) {
                let latin1 = |bytes: &[u8]| bytes.iter().map(|&b| b as char).collect::<String>();
                out.push((latin1(&body[..nul]), latin1(&body[nul + 1..])));
            }
        }

        offset = end + 4;
    }
    out
}
