// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pixel ordering inside a micro tile.
//!
//! The hardware interleaves x/y (and z, for thick tiles) coordinate bits into
//! a pixel index with a per-bpp pattern. Displayable surfaces keep pixels of
//! a row closer together so scanout stays within a burst; everything else
//! uses one shared pattern.

use crate::bitmath::bit;
use crate::tile::TileType;

/// Index of the pixel at `(x, y, z)` within its micro tile.
///
/// Coordinates are taken modulo the micro tile footprint. Returns `None` for
/// a bpp without a defined ordering.
pub fn pixel_index_in_micro_tile(
    x: u32,
    y: u32,
    z: u32,
    bpp: u32,
    tile_type: TileType,
    thickness: u32,
) -> Option<u32> {
    let x0 = bit(x, 0);
    let x1 = bit(x, 1);
    let x2 = bit(x, 2);
    let y0 = bit(y, 0);
    let y1 = bit(y, 1);
    let y2 = bit(y, 2);

    let bits: [u32; 6] = if tile_type == TileType::Displayable {
        match bpp {
            8 => [x0, x1, x2, y1, y0, y2],
            16 => [x0, x1, x2, y0, y1, y2],
            32 => [x0, x1, y0, x2, y1, y2],
            64 => [x0, y0, x1, x2, y1, y2],
            128 => [y0, x0, x1, x2, y1, y2],
            _ => return None,
        }
    } else {
        [x0, y0, x1, y1, x2, y2]
    };

    let mut index = 0;
    for (pos, b) in bits.iter().enumerate() {
        index |= b << pos;
    }

    if thickness > 1 {
        index |= bit(z, 0) << 6 | bit(z, 1) << 7;
        if thickness == 8 {
            index |= bit(z, 2) << 8;
        }
    }

    Some(index)
}

/// Inverse of [`pixel_index_in_micro_tile`]: micro tile local `(x, y, z)`.
pub fn pixel_coord_from_index(
    index: u32,
    bpp: u32,
    tile_type: TileType,
    thickness: u32,
) -> Option<(u32, u32, u32)> {
    let b = |n| bit(index, n);

    let (x, y) = if tile_type == TileType::Displayable {
        match bpp {
            8 => (index & 7, b(5) << 2 | b(3) << 1 | b(4)),
            16 => (index & 7, b(5) << 2 | b(4) << 1 | b(3)),
            32 => (b(3) << 2 | b(1) << 1 | b(0), b(5) << 2 | b(4) << 1 | b(2)),
            64 => (b(3) << 2 | b(2) << 1 | b(0), b(5) << 2 | b(4) << 1 | b(1)),
            128 => (b(3) << 2 | b(2) << 1 | b(1), b(5) << 2 | b(4) << 1 | b(0)),
            _ => return None,
        }
    } else {
        (b(4) << 2 | b(2) << 1 | b(0), b(5) << 2 | b(3) << 1 | b(1))
    };

    let z = if thickness > 1 {
        b(8) << 2 | b(7) << 1 | b(6)
    } else {
        0
    };

    Some((x, y, z))
}
