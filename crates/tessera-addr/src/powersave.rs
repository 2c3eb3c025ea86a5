// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

//! Power save tiling.
//!
//! Northern Islands can scan out an idle screen from a reduced number of
//! pipes ("lower pipes") so the rest of the memory system can sleep. Every
//! tile is a fixed 64 bytes; the tile footprint in pixels shrinks as bpp
//! grows. Addresses interleave column, pipe, bank and row fields so that a
//! scanline walk only touches the lower pipes within a row.

use crate::bitmath::{bit, pow_two_align};
use crate::config::ChipConfig;
use crate::error::AddrError;
use crate::tile::POWER_SAVE_TILE_BYTES;

/// Tile footprint in pixels for a given bpp. 64 bytes per tile always.
fn tile_dims(bpp: u32) -> (u32, u32) {
    if bpp > 32 {
        (4, 2)
    } else {
        (8, 64 / bpp)
    }
}

/// Power save only exists on Northern Islands, for single sample 2D
/// surfaces at common pixel sizes.
pub fn sanity_check_power_save(
    cfg: &ChipConfig,
    bpp: u32,
    num_samples: u32,
    num_slices: u32,
    mip_level: u32,
) -> Result<(), AddrError> {
    if !cfg.arch.is_northern_islands() {
        return Err(AddrError::unsupported(format!(
            "power save tiling is not available on {}",
            cfg.arch
        )));
    }
    if !matches!(bpp, 8 | 16 | 32 | 64) {
        return Err(AddrError::unsupported(format!(
            "power save tiling does not support {bpp} bpp"
        )));
    }
    if num_samples > 1 || num_slices > 1 || mip_level > 0 || cfg.lower_pipes > cfg.pipes {
        return Err(AddrError::unsupported(
            "power save tiling requires a single sample, single slice, mip 0 surface",
        ));
    }
    Ok(())
}

pub struct PowerSaveAlignments {
    pub base_align: u32,
    pub pitch_align: u32,
    pub height_align: u32,
}

pub fn power_save_alignments(cfg: &ChipConfig, display: bool) -> PowerSaveAlignments {
    let mut pitch_align = 8;
    if display {
        pitch_align = pow_two_align(pitch_align, 32);
    }
    PowerSaveAlignments {
        // Base addresses must clear a full row across every pipe and bank.
        base_align: cfg.pipes * cfg.banks * cfg.row_size,
        pitch_align,
        height_align: 8,
    }
}

/// Padded pitch, height and total size for a power save surface.
///
/// The slice byte count must land on a base alignment boundary, so the
/// pitch is grown until it does.
pub fn power_save_dimensions(
    cfg: &ChipConfig,
    align: &PowerSaveAlignments,
    width: u32,
    height: u32,
    bpp: u32,
) -> (u32, u32, u64) {
    let mut pitch = pow_two_align(width, align.pitch_align);
    let height = pow_two_align(height, align.pitch_align);

    while (pitch as u64 * height as u64 * bpp as u64 / 8) % align.base_align as u64 != 0 {
        pitch += align.pitch_align;
    }

    let surf_size = pitch as u64 * height as u64 * bpp as u64 / 8;
    (pitch, height, surf_size)
}

fn pixel_index(x: u32, y: u32, bpp: u32) -> u32 {
    let x0 = bit(x, 0);
    let x1 = bit(x, 1);
    let x2 = bit(x, 2);
    let y0 = bit(y, 0);
    let y1 = bit(y, 1);
    let y2 = bit(y, 2);

    match bpp {
        8 => x0 | x1 << 1 | x2 << 2 | y1 << 3 | y0 << 4 | y2 << 5,
        16 => x0 | x1 << 1 | x2 << 2 | y0 << 3 | y1 << 4,
        32 => x0 | x1 << 1 | y0 << 2 | x2 << 3,
        _ => x0 | y0 << 1 | x1 << 2,
    }
}

fn pixel_coord(offset_bits: u32, bpp: u32) -> (u32, u32) {
    let index = offset_bits / bpp;
    let b = |n| bit(index, n);
    match bpp {
        8 => (index & 7, b(5) << 2 | b(3) << 1 | b(4)),
        16 => (index & 7, b(4) << 1 | b(3)),
        32 => (b(3) << 2 | b(1) << 1 | b(0), (index & 4) >> 2),
        _ => (b(2) << 1 | b(0), (index & 2) >> 1),
    }
}

/// Address of `(x, y)` in a power save surface. The bit position is always
/// zero, power save formats are whole bytes.
pub fn addr_from_coord_power_save(cfg: &ChipConfig, x: u32, y: u32, bpp: u32, pitch: u32) -> u64 {
    let pipe_interleave = cfg.pipe_interleave_bytes as u64;
    let lower_pipes = cfg.lower_pipes as u64;
    let row_size = cfg.row_size as u64;
    let pipes = cfg.pipes as u64;
    let banks = cfg.banks as u64;

    let (tile_width, tile_height) = tile_dims(bpp);

    let pixel_offset = (pixel_index(x, y, bpp) * bpp / 8) as u64;

    let tile_offset = ((y / tile_height) as u64 * (pitch / tile_width) as u64
        + (x / tile_width) as u64)
        * POWER_SAVE_TILE_BYTES as u64;

    let col_lsb = tile_offset % pipe_interleave;
    let pipe_lsb = (tile_offset / pipe_interleave) % lower_pipes;
    let col_msb = (tile_offset / (pipe_interleave * lower_pipes)) % (row_size / pipe_interleave);
    let bank = (tile_offset / (row_size * lower_pipes)) % banks;
    let pipe_msb = (tile_offset / (banks * lower_pipes * row_size)) % (pipes / lower_pipes);
    let row = tile_offset / (pipes * banks * row_size);

    row * pipes * banks * row_size
        + col_msb * pipes * banks * pipe_interleave
        + bank * pipes * pipe_interleave
        + pipe_msb * lower_pipes * pipe_interleave
        + pipe_lsb * pipe_interleave
        + col_lsb
        + pixel_offset
}

/// Inverse of [`addr_from_coord_power_save`].
pub fn coord_from_addr_power_save(cfg: &ChipConfig, addr: u64, bpp: u32, pitch: u32) -> (u32, u32) {
    let group_bits = (cfg.pipe_interleave_bytes * 8) as u64;
    let row_bits = (cfg.row_size * 8) as u64;
    let lower_pipes = cfg.lower_pipes as u64;
    let pipes = cfg.pipes as u64;
    let banks = cfg.banks as u64;

    let (tile_width, tile_height) = tile_dims(bpp);
    let tiles_per_row = pitch / tile_width;

    let bit_addr = addr * 8;
    let elem_offset = (bit_addr % (POWER_SAVE_TILE_BYTES * 8) as u64) as u32;
    let (mut x, mut y) = pixel_coord(elem_offset, bpp);

    let pre = bit_addr - elem_offset as u64;
    let col_lsb = pre % group_bits;
    let pipe_lsb = (pre / group_bits) % lower_pipes;
    let pipe_msb = (pre / group_bits / lower_pipes) % (pipes / lower_pipes);
    let bank = (pre / group_bits / pipes) % banks;
    let col_msb = (pre / group_bits / pipes / banks) % (row_bits / group_bits);
    let row = pre / row_bits / pipes / banks;

    let tile_offset = row * row_bits * pipes * banks
        + pipe_msb * banks * (row_bits / group_bits) * lower_pipes * group_bits
        + bank * (row_bits / group_bits) * lower_pipes * group_bits
        + col_msb * lower_pipes * group_bits
        + pipe_lsb * group_bits
        + col_lsb;

    let tile_index = tile_offset / (POWER_SAVE_TILE_BYTES * 8) as u64;

    x += (tile_index % tiles_per_row as u64) as u32 * tile_width;
    y += (tile_index / tiles_per_row as u64) as u32 * tile_height;

    (x, y)
}
