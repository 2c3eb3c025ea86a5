// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pipe and bank coordinate hashing.
//!
//! Macro tiled surfaces spread micro tiles across pipes and banks by XOR
//! mixing coordinate bits, so that a walk in any screen direction touches
//! every pipe and bank before revisiting one. The tables are fixed by the
//! hardware per pipe/bank count; both directions are implemented here.
//!
//! Swizzles and slice rotations are folded into the hash the same way the
//! memory controller folds them: banks are un-rotated on the way back, pipe
//! swizzle is not (callers that need exact coordinate recovery run with a
//! zero pipe swizzle).

use crate::bitmath::{bit, log2};
use crate::config::ChipConfig;
use crate::tile::{TileInfo, TileMode, MICRO_TILE_HEIGHT, MICRO_TILE_WIDTH};

/// Per-slice pipe rotation factor for 3D macro modes.
pub(crate) fn pipe_rotation(cfg: &ChipConfig, tile_mode: TileMode) -> u32 {
    if tile_mode.is_macro_3d() {
        if cfg.pipes < 4 {
            1
        } else {
            cfg.pipes / 2 - 1
        }
    } else {
        0
    }
}

/// Per-slice bank rotation factor.
pub(crate) fn bank_rotation(cfg: &ChipConfig, banks: u32, tile_mode: TileMode) -> u32 {
    if tile_mode.is_macro_2d() {
        banks / 2 - 1
    } else if tile_mode.is_macro_3d() {
        if cfg.pipes < 4 {
            1
        } else {
            cfg.pipes / 2 - 1
        }
    } else {
        0
    }
}

/// Pipe index serving the micro tile at `(x, y)`.
pub fn pipe_from_coord(
    cfg: &ChipConfig,
    x: u32,
    y: u32,
    slice: u32,
    tile_mode: TileMode,
    pipe_swizzle: u32,
) -> u32 {
    let x3 = bit(x, 3);
    let x4 = bit(x, 4);
    let x5 = bit(x, 5);
    let y3 = bit(y, 3);
    let y4 = bit(y, 4);
    let y5 = bit(y, 5);

    let pipe = if cfg.pipes == 2 {
        x3 ^ y3
    } else if cfg.pipes == 4 {
        (x4 ^ y3) | (x3 ^ y4) << 1
    } else if cfg.pipes == 8 {
        if cfg.shader_engines == 1 {
            (x4 ^ y4 ^ x5) | (x3 ^ y5) << 1 | (x4 ^ y3 ^ y5) << 2
        } else if cfg.shader_engine_tile_size == 16 {
            (x4 ^ y3 ^ x5) | (x3 ^ y5) << 1 | (x4 ^ y4) << 2
        } else {
            (x4 ^ y3 ^ x5) | (x3 ^ y4) << 1 | (x5 ^ y5) << 2
        }
    } else {
        0
    };

    let mut swizzle = pipe_swizzle;
    swizzle += pipe_rotation(cfg, tile_mode) * (slice / tile_mode.thickness());
    swizzle &= cfg.pipes - 1;

    pipe ^ swizzle
}

/// Bank index serving the micro tile at `(x, y)`.
///
/// `tile_split_slice` is the index of the split micro tile slab the element
/// landed in, zero for unsplit tiles.
pub fn bank_from_coord(
    cfg: &ChipConfig,
    info: &TileInfo,
    tile_mode: TileMode,
    x: u32,
    y: u32,
    slice: u32,
    tile_split_slice: u32,
    bank_swizzle: u32,
) -> u32 {
    let tx = x / MICRO_TILE_WIDTH / (info.bank_width * cfg.pipes);
    let ty = y / MICRO_TILE_HEIGHT / info.bank_height;

    let x3 = bit(tx, 0);
    let x4 = bit(tx, 1);
    let x5 = bit(tx, 2);
    let x6 = bit(tx, 3);
    let y3 = bit(ty, 0);
    let y4 = bit(ty, 1);
    let y5 = bit(ty, 2);
    let y6 = bit(ty, 3);

    // Bank counts outside {2,4,8,16} are rejected by the macro tiled sanity
    // check before any address math runs.
    let mut bank = if info.banks == 16 {
        (x3 ^ y6) | (x4 ^ y5 ^ y6) << 1 | (x5 ^ y4) << 2 | (x6 ^ y3) << 3
    } else if info.banks == 8 {
        (x3 ^ y5) | (x4 ^ y4 ^ y5) << 1 | (x5 ^ y3) << 2
    } else if info.banks == 4 {
        (x3 ^ y4) | (x4 ^ y3) << 1
    } else {
        x3 ^ y3
    };

    let thickness = tile_mode.thickness();
    let rotation = bank_rotation(cfg, info.banks, tile_mode);
    let slice_rotation = if tile_mode.is_macro_3d() {
        rotation * (slice / thickness) / cfg.pipes
    } else {
        rotation * (slice / thickness)
    };

    let tile_split_rotation = if matches!(tile_mode, TileMode::Macro2dThin | TileMode::Macro3dThin)
    {
        (info.banks / 2 + 1) * tile_split_slice
    } else {
        0
    };

    bank ^= bank_swizzle + slice_rotation;
    bank ^= tile_split_rotation;
    bank &= info.banks - 1;

    bank
}

/// Pipe index stored in an address.
pub fn pipe_from_addr(cfg: &ChipConfig, addr: u64) -> u32 {
    let pipe_interleave_bits = log2(cfg.pipe_interleave_bytes);
    ((addr >> pipe_interleave_bits) as u32) & (cfg.pipes - 1)
}

/// Bank index stored in an address.
pub fn bank_from_addr(cfg: &ChipConfig, banks: u32, addr: u64) -> u32 {
    let bank_shift =
        log2(cfg.pipe_interleave_bytes) + log2(cfg.pipes) + log2(cfg.bank_interleave);
    ((addr >> bank_shift) as u32) & (banks - 1)
}

/// Recover the bank and pipe derived coordinate bits.
///
/// `x`/`y` carry everything already reconstructed from the address: the
/// pixel position, the micro tile within the bank unit and the macro tile
/// base. The returned coordinates have the bank bits (as
/// `macro_aspect_ratio` directs, split between x and y) and the pipe bits
/// merged back in.
pub fn coord_from_bank_pipe(
    cfg: &ChipConfig,
    info: &TileInfo,
    tile_mode: TileMode,
    x: u32,
    y: u32,
    slice: u32,
    bank: u32,
    pipe: u32,
    bank_swizzle: u32,
    tile_slices: u32,
) -> (u32, u32) {
    let mut x = x;
    let mut y = y;

    let x_tile_bits = x / (MICRO_TILE_WIDTH * info.bank_width * cfg.pipes);
    let y_tile_bits = y / (MICRO_TILE_HEIGHT * info.bank_height);

    let tile_split_rotation = if tile_mode.is_macro_tiled() {
        info.banks / 2 + 1
    } else {
        0
    };

    let thickness = tile_mode.thickness();
    let rotation = bank_rotation(cfg, info.banks, tile_mode);
    let slice_rotation = if pipe_rotation(cfg, tile_mode) == 0 {
        rotation * (slice / thickness)
    } else {
        rotation * (slice / thickness) / cfg.pipes
    };

    let mut bank = bank;
    bank ^= tile_split_rotation * tile_slices;
    bank ^= slice_rotation + bank_swizzle;
    bank %= info.banks;

    let b = |n| bit(bank, n);
    let xt = |n| bit(x_tile_bits, n);
    let yt = |n| bit(y_tile_bits, n);

    let mut y_bit3 = 0;
    let mut y_bit4 = 0;
    let mut y_bit5 = 0;
    let mut y_bit6 = 0;
    let mut x_bit3 = 0;
    let mut x_bit4 = 0;
    let mut x_bit5 = 0;

    match (info.macro_aspect_ratio, info.banks) {
        (1, 2) => {
            y_bit3 = b(0) ^ xt(0);
        }
        (1, 4) => {
            y_bit4 = b(0) ^ xt(0);
            y_bit3 = b(1) ^ xt(1);
        }
        (1, 8) => {
            y_bit3 = b(2) ^ xt(2);
            y_bit5 = b(0) ^ xt(0);
            y_bit4 = b(1) ^ xt(1) ^ y_bit5;
        }
        (1, 16) => {
            y_bit3 = b(3) ^ xt(3);
            y_bit4 = b(2) ^ xt(2);
            y_bit6 = b(0) ^ xt(0);
            y_bit5 = b(1) ^ xt(1) ^ y_bit6;
        }
        (2, 2) => {
            x_bit3 = b(0) ^ yt(0);
        }
        (2, 4) => {
            x_bit3 = b(0) ^ yt(1);
            y_bit3 = b(1) ^ xt(1);
        }
        (2, 8) => {
            x_bit3 = b(0) ^ yt(2);
            y_bit3 = b(2) ^ xt(2);
            y_bit4 = b(1) ^ xt(1) ^ yt(2);
        }
        (2, 16) => {
            x_bit3 = b(0) ^ yt(3);
            y_bit3 = b(3) ^ xt(3);
            y_bit4 = b(2) ^ xt(2);
            y_bit5 = b(1) ^ xt(1) ^ yt(3);
        }
        (4, 4) => {
            x_bit3 = b(0) ^ yt(1);
            x_bit4 = b(1) ^ yt(0);
        }
        (4, 8) => {
            x_bit3 = b(0) ^ yt(2);
            y_bit3 = b(2) ^ xt(2);
            x_bit4 = b(1) ^ yt(1) ^ yt(2);
        }
        (4, 16) => {
            x_bit3 = b(0) ^ yt(3);
            x_bit4 = b(1) ^ yt(2) ^ yt(3);
            y_bit3 = b(3) ^ xt(3);
            y_bit4 = b(2) ^ xt(2);
        }
        (8, 8) => {
            x_bit3 = b(0) ^ yt(2);
            x_bit4 = b(1) ^ yt(1) ^ yt(2);
            x_bit5 = b(2) ^ yt(0);
        }
        (8, 16) => {
            x_bit3 = b(0) ^ yt(3);
            x_bit4 = b(1) ^ yt(2) ^ yt(3);
            x_bit5 = b(2) ^ yt(1);
            y_bit3 = b(3) ^ xt(3);
        }
        _ => {}
    }

    let y_tiles = y_bit6 << 3 | y_bit5 << 2 | y_bit4 << 1 | y_bit3;
    let x_tiles = x_bit5 << 2 | x_bit4 << 1 | x_bit3;

    y += y_tiles * info.bank_height * MICRO_TILE_HEIGHT;
    x += x_tiles * cfg.pipes * info.bank_width * MICRO_TILE_WIDTH;

    // Pipe bits come back from the raw pipe index against the final y.
    let p = |n| bit(pipe, n);
    let mut x3 = 0;
    let mut x4 = 0;
    let mut x5 = 0;
    if cfg.pipes == 2 {
        x3 = p(0) ^ bit(y, 3);
    } else if cfg.pipes == 4 {
        x4 = p(0) ^ bit(y, 3);
        x3 = p(1) ^ bit(y, 4);
    } else if cfg.pipes == 8 {
        if cfg.shader_engines == 1 {
            x3 = p(1) ^ bit(y, 5);
            x4 = p(2) ^ bit(y, 3) ^ bit(y, 5);
            x5 = p(0) ^ bit(y, 4) ^ x4;
        } else if cfg.shader_engine_tile_size == 16 {
            x3 = p(1) ^ bit(y, 5);
            x4 = p(2) ^ bit(y, 4);
            x5 = p(0) ^ bit(y, 3) ^ x4;
        } else {
            x3 = p(1) ^ bit(y, 4);
            x5 = p(2) ^ bit(y, 5);
            x4 = p(0) ^ bit(y, 3) ^ x5;
        }
    }

    x += (x5 << 2 | x4 << 1 | x3) << 3;

    (x, y)
}

#[cfg(test)]
mod test {
    use super::*;
    use tessera_core::Arch;

    fn config(pipes: u32, shader_engines: u32, se_tile_size: u32) -> ChipConfig {
        ChipConfig {
            arch: Arch::NorthernIslands,
            pipes,
            banks: 8,
            ranks: 1,
            logical_banks: 8,
            row_size: 2048,
            pipe_interleave_bytes: 256,
            bank_interleave: 1,
            shader_engines,
            shader_engine_tile_size: se_tile_size,
            lower_pipes: 1,
            max_samples: 16,
        }
    }

    fn info(banks: u32, bank_width: u32, bank_height: u32, ratio: u32) -> TileInfo {
        TileInfo {
            banks,
            bank_width,
            bank_height,
            macro_aspect_ratio: ratio,
            tile_split_bytes: 2048,
        }
    }

    #[test]
    fn pipe_stays_in_range() {
        for (pipes, se, tile) in [(1, 1, 16), (2, 1, 16), (4, 1, 16), (8, 1, 16), (8, 2, 16), (8, 2, 32)] {
            let cfg = config(pipes, se, tile);
            for y in (0..128).step_by(8) {
                for x in (0..128).step_by(8) {
                    let pipe = pipe_from_coord(&cfg, x, y, 0, TileMode::Macro2dThin, 0);
                    assert!(pipe < pipes);
                }
            }
        }
    }

    #[test]
    fn pipe_swizzle_is_an_xor() {
        let cfg = config(4, 1, 16);
        for swizzle in 0..4 {
            for y in (0..64).step_by(8) {
                for x in (0..64).step_by(8) {
                    let base = pipe_from_coord(&cfg, x, y, 0, TileMode::Macro2dThin, 0);
                    let swizzled = pipe_from_coord(&cfg, x, y, 0, TileMode::Macro2dThin, swizzle);
                    assert_eq!(swizzled, base ^ swizzle);
                }
            }
        }
    }

    #[test]
    fn adjacent_tiles_land_on_distinct_pipes() {
        let cfg = config(4, 1, 16);
        for y in (0..64).step_by(8) {
            for x in (0..64).step_by(8) {
                let here = pipe_from_coord(&cfg, x, y, 0, TileMode::Macro2dThin, 0);
                let right = pipe_from_coord(&cfg, x + 8, y, 0, TileMode::Macro2dThin, 0);
                let below = pipe_from_coord(&cfg, x, y + 8, 0, TileMode::Macro2dThin, 0);
                assert_ne!(here, right);
                assert_ne!(here, below);
            }
        }
    }

    #[test]
    fn bank_stays_in_range() {
        let cfg = config(2, 1, 16);
        for banks in [2, 4, 8, 16] {
            let ti = info(banks, 1, 2, 1);
            for y in (0..512).step_by(8) {
                for x in (0..512).step_by(8) {
                    let bank =
                        bank_from_coord(&cfg, &ti, TileMode::Macro2dThin, x, y, 0, 0, 0);
                    assert!(bank < banks);
                }
            }
        }
    }

    /// Strip the bank and pipe derived bits from a coordinate the way the
    /// address decomposition produces it: pixel position, micro tile within
    /// the bank unit and the macro tile base survive, everything else is
    /// re-derived from the bank/pipe indices.
    fn strip(cfg: &ChipConfig, ti: &TileInfo, x: u32, y: u32) -> (u32, u32) {
        let macro_pitch = 8 * ti.bank_width * cfg.pipes * ti.macro_aspect_ratio;
        let macro_height = 8 * ti.bank_height * ti.banks / ti.macro_aspect_ratio;
        let px = x % 8
            + ((x / 8 / cfg.pipes) % ti.bank_width) * cfg.pipes * 8
            + (x / macro_pitch) * macro_pitch;
        let py = y % 8 + ((y / 8) % ti.bank_height) * 8 + (y / macro_height) * macro_height;
        (px, py)
    }

    #[test]
    fn bank_pipe_bits_round_trip() {
        let combos = [
            (1, 2),
            (1, 4),
            (1, 8),
            (1, 16),
            (2, 4),
            (2, 8),
            (2, 16),
            (4, 4),
            (4, 8),
            (4, 16),
            (8, 8),
            (8, 16),
        ];
        for (pipes, se, tile) in [(2, 1, 16), (4, 1, 16), (8, 1, 16), (8, 2, 16), (8, 2, 32)] {
            let cfg = config(pipes, se, tile);
            for (ratio, banks) in combos {
                let ti = info(banks, 1, 2, ratio);
                let macro_pitch = 8 * ti.bank_width * cfg.pipes * ratio;
                let macro_height = 8 * ti.bank_height * banks / ratio;
                for y in (0..2 * macro_height).step_by(8) {
                    for x in (0..2 * macro_pitch).step_by(8) {
                        let pipe = pipe_from_coord(&cfg, x, y, 0, TileMode::Macro2dThin, 0);
                        let bank =
                            bank_from_coord(&cfg, &ti, TileMode::Macro2dThin, x, y, 0, 0, 0);
                        let (px, py) = strip(&cfg, &ti, x, y);
                        let (rx, ry) = coord_from_bank_pipe(
                            &cfg,
                            &ti,
                            TileMode::Macro2dThin,
                            px,
                            py,
                            0,
                            bank,
                            pipe,
                            0,
                            0,
                        );
                        assert_eq!(
                            (rx, ry),
                            (x, y),
                            "pipes={pipes} se={se}/{tile} ratio={ratio} banks={banks}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn bank_swizzle_round_trips() {
        let cfg = config(2, 1, 16);
        let ti = info(8, 1, 1, 1);
        for swizzle in 0..8 {
            for y in (0..128).step_by(8) {
                for x in (0..128).step_by(8) {
                    let pipe = pipe_from_coord(&cfg, x, y, 0, TileMode::Macro2dThin, 0);
                    let bank =
                        bank_from_coord(&cfg, &ti, TileMode::Macro2dThin, x, y, 0, 0, swizzle);
                    let (px, py) = strip(&cfg, &ti, x, y);
                    let (rx, ry) = coord_from_bank_pipe(
                        &cfg,
                        &ti,
                        TileMode::Macro2dThin,
                        px,
                        py,
                        0,
                        bank,
                        pipe,
                        swizzle,
                        0,
                    );
                    assert_eq!((rx, ry), (x, y));
                }
            }
        }
    }

    #[test]
    fn addr_field_extraction() {
        let cfg = config(4, 1, 16);
        // pipe sits right above the 256B interleave, bank above pipe.
        let addr: u64 = 0b11_10 << 8 | 0xab;
        assert_eq!(pipe_from_addr(&cfg, addr), 0b10);
        assert_eq!(bank_from_addr(&cfg, 8, addr), 0b11);
    }
}
