// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

//! Macro tile parameter resolution.
//!
//! Callers rarely pin every tile parameter; unset fields are chosen here
//! from the surface dimensions, pixel size, sample count and usage flags.
//! The rules interlock: the tile split caps the effective tile size, the
//! tile size seeds the bank width/height search, and the aspect ratio is
//! then balanced against the bank footprint. Resolution is deterministic:
//! the same inputs always produce the same parameters.

use crate::bitmath::{bits_to_bytes, log2, next_pow2, pow_two_align};
use crate::config::ChipConfig;
use crate::tile::{
    SurfaceFlags, TileInfo, TileInfoSpec, TileMode, TileType, MICRO_TILE_PIXELS,
};

/// Parameters used by every mode that carries no bank structure.
pub const TILE_INFO_NON_MACRO: TileInfo = TileInfo {
    banks: 2,
    bank_width: 1,
    bank_height: 1,
    macro_aspect_ratio: 1,
    tile_split_bytes: 64,
};

/// Tile split for compressed depth, indexed by log2(samples).
const COMPRESS_Z_TILE_SPLIT: [u32; 5] = [64, 128, 128, 256, 512];

/// Resolve unset tile parameters and the effective tile type for a surface.
pub fn resolve_tile_info(
    cfg: &ChipConfig,
    tile_mode: TileMode,
    flags: SurfaceFlags,
    bpp: u32,
    pitch: u32,
    height: u32,
    num_samples: u32,
    spec: &TileInfoSpec,
    tile_type: TileType,
) -> (TileInfo, TileType) {
    let thickness = tile_mode.thickness();
    let num_samples = num_samples.max(1);

    let mut tile_type = tile_type;
    if !tile_mode.is_linear() {
        if cfg.arch.is_northern_islands() {
            if bpp >= 128 {
                tile_type = if flags.display {
                    TileType::Displayable
                } else {
                    TileType::NonDisplayable
                };
            } else if thickness > 1 {
                tile_type = TileType::NonDisplayable;
            }
        }
        if flags.depth || flags.stencil {
            tile_type = TileType::DepthSampleOrder;
        }
    }

    if !tile_mode.is_macro_tiled() {
        let info = TileInfo {
            banks: spec.banks.unwrap_or(TILE_INFO_NON_MACRO.banks),
            bank_width: spec.bank_width.unwrap_or(TILE_INFO_NON_MACRO.bank_width),
            bank_height: spec.bank_height.unwrap_or(TILE_INFO_NON_MACRO.bank_height),
            macro_aspect_ratio: spec
                .macro_aspect_ratio
                .unwrap_or(TILE_INFO_NON_MACRO.macro_aspect_ratio),
            tile_split_bytes: spec
                .tile_split_bytes
                .unwrap_or(TILE_INFO_NON_MACRO.tile_split_bytes),
        };
        return (info, tile_type);
    }

    let mut flags = flags;
    let mut spec = *spec;

    // A multisampled texture is being read back from a color buffer; resolve
    // it with the color rules so the tile splits agree.
    if num_samples > 1 && !(flags.depth || flags.stencil) {
        flags.texture = false;
        flags.color = true;
    }

    // Stencil shares the depth plane's bank structure. When the caller pins
    // nothing, derive the depth parameters first and only pick a stencil
    // specific tile split.
    if flags.stencil && spec == TileInfoSpec::default() {
        let depth_flags = SurfaceFlags {
            depth: true,
            compress_z: flags.compress_z,
            opt4_space: flags.opt4_space,
            ..Default::default()
        };
        let (depth_info, _) = resolve_tile_info(
            cfg,
            tile_mode,
            depth_flags,
            32,
            pitch,
            height,
            num_samples,
            &TileInfoSpec::default(),
            tile_type,
        );
        spec = TileInfoSpec::from(depth_info);
        spec.tile_split_bytes = None;
    }

    let log2_samples = log2(num_samples) as usize;

    let tile_split_bytes = spec.tile_split_bytes.unwrap_or_else(|| {
        let mut split = if flags.stencil {
            if flags.compress_z {
                COMPRESS_Z_TILE_SPLIT[log2_samples]
            } else {
                cfg.row_size
            }
        } else if flags.color {
            if num_samples > 1 {
                let estimated = 256.max(bits_to_bytes(bpp) * next_pow2(log2_samples as u32) * 64);
                if estimated > cfg.row_size {
                    tracing::debug!(
                        "clamping {estimated}B tile split to the {}B row size",
                        cfg.row_size
                    );
                    cfg.row_size
                } else {
                    estimated
                }
            } else {
                cfg.row_size
            }
        } else if flags.depth {
            if flags.compress_z {
                COMPRESS_Z_TILE_SPLIT[log2_samples]
            } else {
                cfg.row_size
            }
        } else {
            cfg.row_size
        };

        // Thick tiles never actually split; widen the split so the sanity
        // check passes and no split is observed.
        let micro_tile_size = bits_to_bytes(MICRO_TILE_PIXELS * thickness * bpp);
        if thickness > 1 && split < micro_tile_size && micro_tile_size <= cfg.row_size {
            split = micro_tile_size;
        }
        split
    });

    let banks = spec.banks.unwrap_or_else(|| {
        default_bank_count(cfg, tile_mode, bpp, num_samples, pitch, height, tile_split_bytes)
    });

    let tile_size = tile_split_bytes
        .min(bits_to_bytes(MICRO_TILE_PIXELS * thickness * bpp * num_samples));

    let (bank_width, bank_height) = match (spec.bank_width, spec.bank_height) {
        (None, None) => default_bank_dims(cfg, &flags, bpp, num_samples, thickness, tile_size, tile_split_bytes),
        (None, Some(bh)) => (fit_bank_dim(cfg, bh, bh, tile_size), bh),
        (Some(bw), None) => {
            let seed = if flags.fmask {
                if num_samples >= 8 {
                    1
                } else {
                    4
                }
            } else {
                bw
            };
            (bw, fit_bank_dim(cfg, seed, bw, tile_size))
        }
        (Some(bw), Some(bh)) => (bw, bh),
    };

    let macro_aspect_ratio = spec.macro_aspect_ratio.unwrap_or_else(|| {
        let mut ratio = 1;

        if flags.opt4_space {
            let mut width_align = 8 * cfg.pipes * bank_width;
            let mut height_align = 8 * banks * bank_height;

            // Trade height alignment for width alignment while the pitch can
            // absorb it and the height cannot.
            while pitch % (2 * width_align) == 0
                && height % height_align != 0
                && ratio < 4
            {
                ratio <<= 1;
                width_align <<= 1;
                height_align >>= 1;
            }

            if height % height_align != 0 && ratio < 4 {
                let actual = pow_two_align(pitch, width_align) as u64
                    * pow_two_align(height, height_align) as u64;
                let widened = pow_two_align(pitch, width_align * 2) as u64
                    * pow_two_align(height, height_align / 2) as u64;
                if widened < actual {
                    ratio <<= 1;
                }
            }
        }

        // Few-pipe chips need a wider ratio for multisampled color so the
        // associated fmask stays addressable as a texture.
        if cfg.pipes <= 2 && ratio == 1 && num_samples > 1 && flags.color {
            let fmask_tile_size = 64 * if num_samples == 8 { 4 } else { 1 };
            let min_ratio = cfg.pipe_interleave_bytes * cfg.bank_interleave
                / (fmask_tile_size * cfg.pipes * bank_width);
            if min_ratio > ratio {
                ratio = min_ratio;
            }
        }

        if flags.texture {
            if bank_height >= 4 {
                ratio = 2;
            }
        } else if flags.color {
            if bank_height == 4 {
                ratio = 2;
            }
        } else if flags.depth && num_samples == 1 {
            let tile_size_stencil = tile_split_bytes.min(64);
            let align = 1.max(
                cfg.pipe_interleave_bytes * cfg.bank_interleave
                    / (tile_size_stencil * cfg.pipes * bank_width),
            );
            if align > ratio {
                ratio = align;
            }
        }

        while banks < ratio {
            ratio >>= 1;
        }
        ratio
    });

    (
        TileInfo {
            banks,
            bank_width,
            bank_height,
            macro_aspect_ratio,
            tile_split_bytes,
        },
        tile_type,
    )
}

/// Bank count when the caller leaves it open: all logical banks, halved only
/// for tiny surfaces with very large micro tiles.
fn default_bank_count(
    cfg: &ChipConfig,
    tile_mode: TileMode,
    bpp: u32,
    num_samples: u32,
    pitch: u32,
    height: u32,
    tile_split_bytes: u32,
) -> u32 {
    let logical_banks = cfg.logical_banks;

    if pitch >= 64 && height >= 8 * logical_banks {
        logical_banks
    } else if tile_mode.is_macro_3d() {
        logical_banks
    } else if cfg.pipes == 1 && logical_banks <= 4 {
        logical_banks
    } else {
        let micro_tile_bytes = tile_split_bytes.min(bits_to_bytes(
            bpp * tile_mode.thickness() * MICRO_TILE_PIXELS * num_samples,
        ));
        if micro_tile_bytes > 1024 && logical_banks >= 8 {
            logical_banks >> 1
        } else {
            logical_banks
        }
    }
}

/// Pick both bank dimensions: seed from usage, then grow the footprint to a
/// 256 byte minimum and shrink it back under the row size.
fn default_bank_dims(
    cfg: &ChipConfig,
    flags: &SurfaceFlags,
    bpp: u32,
    num_samples: u32,
    thickness: u32,
    tile_size: u32,
    tile_split_bytes: u32,
) -> (u32, u32) {
    let (mut bank_width, mut bank_height) = if !flags.depth && !flags.stencil {
        let bh = if tile_size <= 32 {
            8
        } else if tile_size <= 64 {
            4
        } else if tile_size <= 128 {
            2
        } else {
            1
        };
        (1, bh)
    } else if num_samples > 1 {
        // The stencil plane aliases this structure at 8bpp, so its pipe
        // interleave requirement decides the seed.
        let tile_size_stencil = tile_split_bytes
            .min(bits_to_bytes(MICRO_TILE_PIXELS * thickness * 8 * num_samples));
        let scale = cfg.pipe_interleave_bytes / tile_size_stencil;
        if scale > 1 {
            let bw = if scale > 4 { 2 } else { 1 };
            (bw, scale / bw)
        } else {
            (1, 1)
        }
    } else {
        (2, 4)
    };

    let mut footprint = tile_size * bank_width * bank_height;
    let mut step = 0;
    while footprint < 256 {
        if step & 1 == 0 {
            bank_width <<= 1;
        } else {
            bank_height <<= 1;
        }
        step += 1;
        footprint = tile_size * bank_width * bank_height;
    }

    if tile_size <= cfg.row_size {
        let mut step = 0;
        let mut stalled = 0;
        while footprint > cfg.row_size {
            let before = (bank_width, bank_height);
            if step & 1 == 0 && bank_width > 1 {
                bank_width >>= 1;
            } else if bank_height > 1 {
                if flags.depth {
                    // A 64bpp depth plane keeps its bank height even though
                    // the footprint overflows the row, otherwise it cannot
                    // line up with its stencil plane.
                    if bpp >= 64 && bank_height <= 4 {
                        tracing::warn!(
                            "keeping bank height {bank_height} for {bpp}bpp depth, footprint \
                             {footprint}B exceeds the {}B row",
                            cfg.row_size
                        );
                        break;
                    }
                } else {
                    bank_height >>= 1;
                }
            }
            step += 1;
            footprint = tile_size * bank_width * bank_height;
            if (bank_width, bank_height) == before {
                stalled += 1;
                if stalled >= 2 {
                    tracing::warn!("bank footprint {footprint}B cannot shrink under the row size");
                    break;
                }
            } else {
                stalled = 0;
            }
        }
    }

    (bank_width, bank_height)
}

/// Pick one bank dimension with the other pinned by the caller.
fn fit_bank_dim(cfg: &ChipConfig, seed: u32, other: u32, tile_size: u32) -> u32 {
    let mut dim = seed;
    while tile_size * dim * other < 256 {
        dim <<= 1;
    }
    if tile_size <= cfg.row_size {
        while tile_size * dim * other > cfg.row_size && dim > 1 {
            dim >>= 1;
        }
    }
    dim
}

#[cfg(test)]
mod test {
    use super::*;
    use tessera_core::Arch;

    fn config(pipes: u32, banks: u32, row_size: u32) -> ChipConfig {
        ChipConfig {
            arch: Arch::NorthernIslands,
            pipes,
            banks,
            ranks: 1,
            logical_banks: banks,
            row_size,
            pipe_interleave_bytes: 256,
            bank_interleave: 1,
            shader_engines: 1,
            shader_engine_tile_size: 16,
            lower_pipes: 1,
            max_samples: 16,
        }
    }

    fn color_flags() -> SurfaceFlags {
        SurfaceFlags {
            color: true,
            ..Default::default()
        }
    }

    #[test]
    fn color_buffer_defaults() {
        let cfg = config(4, 4, 2048);
        let (info, tile_type) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThin,
            color_flags(),
            32,
            256,
            256,
            1,
            &TileInfoSpec::default(),
            TileType::Displayable,
        );
        assert_eq!(info.tile_split_bytes, 2048);
        assert_eq!(info.banks, 4);
        assert_eq!(info.bank_width, 1);
        assert_eq!(info.bank_height, 1);
        assert_eq!(info.macro_aspect_ratio, 1);
        assert_eq!(tile_type, TileType::Displayable);
    }

    #[test]
    fn caller_pinned_fields_are_kept() {
        let cfg = config(4, 8, 2048);
        let spec = TileInfoSpec {
            banks: Some(8),
            bank_width: Some(2),
            bank_height: Some(2),
            macro_aspect_ratio: Some(2),
            tile_split_bytes: Some(512),
        };
        let (info, _) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThin,
            color_flags(),
            32,
            128,
            128,
            1,
            &spec,
            TileType::Displayable,
        );
        assert_eq!(
            info,
            TileInfo {
                banks: 8,
                bank_width: 2,
                bank_height: 2,
                macro_aspect_ratio: 2,
                tile_split_bytes: 512,
            }
        );
    }

    #[test]
    fn non_macro_modes_get_fixed_defaults() {
        let cfg = config(2, 8, 2048);
        let (info, _) = resolve_tile_info(
            &cfg,
            TileMode::Micro1dThin,
            color_flags(),
            32,
            64,
            64,
            1,
            &TileInfoSpec::default(),
            TileType::Displayable,
        );
        assert_eq!(info, TILE_INFO_NON_MACRO);
    }

    #[test]
    fn msaa_color_tile_split_is_estimated() {
        let cfg = config(2, 8, 2048);
        let (info, _) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThin,
            color_flags(),
            32,
            256,
            256,
            4,
            &TileInfoSpec::default(),
            TileType::NonDisplayable,
        );
        // bytes/pixel * pow2(log2 samples) * 64
        assert_eq!(info.tile_split_bytes, 512);
    }

    #[test]
    fn msaa_texture_resolves_like_color() {
        let cfg = config(2, 8, 2048);
        let texture = SurfaceFlags {
            texture: true,
            ..Default::default()
        };
        let (as_texture, _) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThin,
            texture,
            32,
            256,
            256,
            4,
            &TileInfoSpec::default(),
            TileType::NonDisplayable,
        );
        let (as_color, _) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThin,
            color_flags(),
            32,
            256,
            256,
            4,
            &TileInfoSpec::default(),
            TileType::NonDisplayable,
        );
        assert_eq!(as_texture, as_color);
    }

    #[test]
    fn depth_surfaces_use_sample_order() {
        let cfg = config(4, 8, 2048);
        let depth = SurfaceFlags {
            depth: true,
            ..Default::default()
        };
        let (info, tile_type) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThin,
            depth,
            32,
            256,
            256,
            1,
            &TileInfoSpec::default(),
            TileType::Displayable,
        );
        assert_eq!(tile_type, TileType::DepthSampleOrder);
        assert_eq!((info.bank_width, info.bank_height), (2, 4));
    }

    #[test]
    fn stencil_inherits_depth_bank_structure() {
        let cfg = config(4, 8, 2048);
        let stencil = SurfaceFlags {
            stencil: true,
            ..Default::default()
        };
        let depth = SurfaceFlags {
            depth: true,
            ..Default::default()
        };
        let (stencil_info, _) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThin,
            stencil,
            8,
            256,
            256,
            1,
            &TileInfoSpec::default(),
            TileType::Displayable,
        );
        let (depth_info, _) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThin,
            depth,
            32,
            256,
            256,
            1,
            &TileInfoSpec::default(),
            TileType::Displayable,
        );
        assert_eq!(stencil_info.banks, depth_info.banks);
        assert_eq!(stencil_info.bank_width, depth_info.bank_width);
        assert_eq!(stencil_info.bank_height, depth_info.bank_height);
        assert_eq!(stencil_info.macro_aspect_ratio, depth_info.macro_aspect_ratio);
        // Uncompressed stencil splits at the row.
        assert_eq!(stencil_info.tile_split_bytes, 2048);
    }

    #[test]
    fn compressed_depth_uses_split_table() {
        let cfg = config(4, 8, 2048);
        let depth = SurfaceFlags {
            depth: true,
            compress_z: true,
            ..Default::default()
        };
        for (samples, split) in [(1, 64), (2, 128), (4, 128), (8, 256)] {
            let (info, _) = resolve_tile_info(
                &cfg,
                TileMode::Macro2dThin,
                depth,
                32,
                256,
                256,
                samples,
                &TileInfoSpec::default(),
                TileType::Displayable,
            );
            assert_eq!(info.tile_split_bytes, split, "samples={samples}");
        }
    }

    #[test]
    fn wide_depth_keeps_bank_height() {
        // 64bpp depth on a 1KB row chip would have to shrink bank height to
        // fit the row, but that would break the stencil alignment; the
        // footprint is allowed to overflow instead.
        let cfg = config(4, 8, 1024);
        let depth = SurfaceFlags {
            depth: true,
            ..Default::default()
        };
        let (info, _) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThin,
            depth,
            64,
            256,
            256,
            1,
            &TileInfoSpec::default(),
            TileType::Displayable,
        );
        assert_eq!(info.bank_height, 4);
        assert!(info.tile_split_bytes.min(512) * info.bank_width * info.bank_height > cfg.row_size);
    }

    #[test]
    fn thick_modes_widen_tiny_tile_splits() {
        let cfg = config(2, 8, 2048);
        let depth = SurfaceFlags {
            depth: true,
            compress_z: true,
            ..Default::default()
        };
        // Compressed split table would say 64, but a thick 32bpp micro tile
        // is 1024 bytes.
        let (info, _) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThick,
            depth,
            32,
            64,
            64,
            1,
            &TileInfoSpec::default(),
            TileType::Displayable,
        );
        assert_eq!(info.tile_split_bytes, 1024);
    }

    #[test]
    fn small_surfaces_halve_banks() {
        let cfg = config(2, 8, 2048);
        // 32x32, 128bpp, 4 samples: micro tile is 4KB capped to the 2KB
        // split, still over 1KB, so banks halve.
        let (info, _) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThin,
            color_flags(),
            128,
            32,
            32,
            4,
            &TileInfoSpec::default(),
            TileType::NonDisplayable,
        );
        assert_eq!(info.banks, 4);
    }

    #[test]
    fn ratio_never_exceeds_banks() {
        let cfg = config(1, 4, 1024);
        let depth = SurfaceFlags {
            depth: true,
            ..Default::default()
        };
        for bpp in [8, 16, 32, 64] {
            for samples in [1, 2, 4] {
                let (info, _) = resolve_tile_info(
                    &cfg,
                    TileMode::Macro2dThin,
                    depth,
                    bpp,
                    64,
                    64,
                    samples,
                    &TileInfoSpec::default(),
                    TileType::Displayable,
                );
                assert!(info.macro_aspect_ratio <= info.banks);
            }
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let cfg = config(4, 8, 2048);
        let first = resolve_tile_info(
            &cfg,
            TileMode::Macro3dThick,
            color_flags(),
            64,
            512,
            512,
            1,
            &TileInfoSpec::default(),
            TileType::NonDisplayable,
        );
        for _ in 0..10 {
            let again = resolve_tile_info(
                &cfg,
                TileMode::Macro3dThick,
                color_flags(),
                64,
                512,
                512,
                1,
                &TileInfoSpec::default(),
                TileType::NonDisplayable,
            );
            assert_eq!(first, again);
        }
    }

    #[test]
    fn northern_islands_forces_non_displayable_thick() {
        let cfg = config(2, 8, 2048);
        let (_, tile_type) = resolve_tile_info(
            &cfg,
            TileMode::Macro2dThick,
            color_flags(),
            32,
            64,
            64,
            1,
            &TileInfoSpec::default(),
            TileType::Displayable,
        );
        assert_eq!(tile_type, TileType::NonDisplayable);
    }
}
