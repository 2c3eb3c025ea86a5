// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

//! Surface layout computation.
//!
//! Turns a surface description (dimensions, pixel size, sample count, tile
//! mode, usage flags) into the layout the addressing functions require:
//! padded pitch, height and depth, total byte size, alignment requirements
//! and the final tile mode after any degradation. Mip levels can degrade a
//! macro tiled base mode down to micro tiling once the level no longer
//! fills a macro tile.

use crate::bitmath::{bits_to_bytes, bits_to_bytes64, is_pow2, next_pow2, pow_two_align};
use crate::config::ChipConfig;
use crate::error::AddrError;
use crate::resolve::resolve_tile_info;
use crate::tile::{
    SurfaceFlags, TileInfo, TileInfoSpec, TileMode, TileType, MICRO_TILE_HEIGHT,
    MICRO_TILE_PIXELS, MICRO_TILE_WIDTH, THICK_TILE_THICKNESS,
};

/// Description of a single surface (or a single mip level of one).
#[derive(Clone, Copy, Debug)]
pub struct SurfaceRequest {
    pub width: u32,
    pub height: u32,
    pub num_slices: u32,
    pub num_samples: u32,
    pub bpp: u32,
    pub mip_level: u32,
    pub tile_mode: TileMode,
    pub tile_type: TileType,
    pub flags: SurfaceFlags,
    /// Macro tile parameters; unset fields are resolved from the request.
    pub tile_info: TileInfoSpec,
}

/// Padded layout of a surface, ready for address computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceLayout {
    /// Padded pitch in pixels.
    pub pitch: u32,
    /// Padded height in pixels.
    pub height: u32,
    /// Padded slice count.
    pub depth: u32,
    /// Total surface size in bytes.
    pub surf_size: u64,
    pub base_align: u32,
    pub pitch_align: u32,
    pub height_align: u32,
    pub depth_align: u32,
    /// Tile mode actually used, after any degradation.
    pub tile_mode: TileMode,
    pub tile_type: TileType,
    pub tile_info: TileInfo,
    /// Macro tile footprint in pixels. For non macro modes this is the
    /// pitch/height granularity.
    pub block_width: u32,
    pub block_height: u32,
    /// The next mip level would no longer be macro tiled.
    pub last_macro_level: bool,
}

pub fn compute_surface_info(
    cfg: &ChipConfig,
    req: &SurfaceRequest,
) -> Result<SurfaceLayout, AddrError> {
    if req.bpp == 0 || req.bpp > 128 {
        return Err(AddrError::InvalidDimension {
            name: "bpp",
            value: req.bpp,
        });
    }

    let samples = req.num_samples.max(1);
    if samples > cfg.max_samples {
        return Err(AddrError::unsupported(format!(
            "{samples} samples exceeds the {} sample limit of {}",
            cfg.max_samples, cfg.arch
        )));
    }

    let mut tile_mode = req.tile_mode;
    if tile_mode == TileMode::PowerSave {
        return Err(AddrError::unsupported(
            "power save layout is generation specific",
        ));
    }
    if tile_mode.thickness() > 1 && samples > 1 {
        return Err(AddrError::unsupported(
            "thick tile modes are single sample only",
        ));
    }

    let mut width = req.width.max(1);
    let mut height = req.height.max(1);
    let mut slices = req.num_slices.max(1);
    let orig_height = height;
    let mut flags = req.flags;

    // Mip levels (and pow2-padded base levels) round every dimension up.
    // Cube sub-levels keep their face count.
    if flags.pow2_pad {
        width = next_pow2(width);
        height = next_pow2(height);
        slices = next_pow2(slices);
    } else if req.mip_level > 0 {
        width = next_pow2(width);
        height = next_pow2(height);
        if !flags.cube {
            slices = next_pow2(slices);
        }
    }

    if !flags.disallow_large_thick_degrade {
        tile_mode = degrade_large_thick_tile(cfg, tile_mode, req.bpp);
    }

    let (mut tile_info, tile_type) = resolve_tile_info(
        cfg,
        tile_mode,
        flags,
        req.bpp,
        width,
        height,
        samples,
        &req.tile_info,
        req.tile_type,
    );

    let mut pad_dims = 0;
    if flags.cube {
        if req.mip_level == 0 {
            pad_dims = 2;
        }
        // A lone face addresses like a plain 2D surface.
        if slices == 1 {
            flags.cube = false;
        }
    }

    match tile_mode {
        TileMode::LinearGeneral | TileMode::LinearAligned => Ok(linear_layout(
            cfg,
            tile_mode,
            req.bpp,
            samples,
            flags,
            pad_dims,
            req.mip_level,
            width,
            height,
            slices,
            tile_info,
            tile_type,
        )),
        TileMode::Micro1dThin | TileMode::Micro1dThick => Ok(micro_tiled_layout(
            cfg,
            tile_mode,
            req.bpp,
            samples,
            flags,
            pad_dims,
            req.mip_level,
            width,
            height,
            slices,
            tile_info,
            tile_type,
        )),
        _ => macro_tiled_layout(
            cfg,
            tile_mode,
            req.bpp,
            samples,
            flags,
            pad_dims,
            req.mip_level,
            width,
            height,
            orig_height,
            slices,
            &mut tile_info,
            tile_type,
        ),
    }
}

/// A thick micro tile larger than a memory row defeats the row buffer, so
/// the mode drops to the next thinner variant that fits.
fn degrade_large_thick_tile(cfg: &ChipConfig, tile_mode: TileMode, bpp: u32) -> TileMode {
    let thickness = tile_mode.thickness();
    if thickness > 1 {
        let tile_size = MICRO_TILE_PIXELS * thickness * (bpp >> 3);
        if tile_size > cfg.row_size {
            let degraded = match tile_mode {
                TileMode::Macro2dXThick if (tile_size >> 1) <= cfg.row_size => TileMode::Macro2dThick,
                TileMode::Macro2dXThick | TileMode::Macro2dThick => TileMode::Macro2dThin,
                TileMode::Macro3dXThick if (tile_size >> 1) <= cfg.row_size => TileMode::Macro3dThick,
                TileMode::Macro3dXThick | TileMode::Macro3dThick => TileMode::Macro3dThin,
                other => other,
            };
            if degraded != tile_mode {
                tracing::debug!(
                    ?tile_mode,
                    ?degraded,
                    tile_size,
                    row_size = cfg.row_size,
                    "thick tile exceeds a row, degrading"
                );
            }
            return degraded;
        }
    }
    tile_mode
}

/// The display engine ignores the low five pitch bits, so scanout surfaces
/// get a 32 pixel pitch granularity on top of the mode's own.
fn adjust_pitch_alignment(flags: SurfaceFlags, pitch_align: &mut u32) {
    if flags.display {
        *pitch_align = pow_two_align(*pitch_align, 32);
    }
}

/// Pad pitch, height and slices to their alignments. `pad_dims` limits how
/// many dimensions are padded (cube base levels only pad two).
#[allow(clippy::too_many_arguments)]
fn pad_dimensions(
    tile_mode: TileMode,
    flags: SurfaceFlags,
    mut pad_dims: u32,
    mip_level: u32,
    pitch: &mut u32,
    pitch_align: u32,
    height: &mut u32,
    height_align: u32,
    slices: &mut u32,
    slice_align: u32,
) {
    let thickness = tile_mode.thickness();

    // Cube sub-levels pad as a 3D texture when the caller kept all faces.
    if mip_level > 0 && flags.cube {
        pad_dims = if *slices > 1 { 3 } else { 2 };
    }

    if pad_dims == 0 {
        pad_dims = 3;
    }

    if is_pow2(pitch_align) {
        *pitch = pow_two_align(*pitch, pitch_align);
    } else {
        *pitch = (*pitch + pitch_align - 1) / pitch_align * pitch_align;
    }

    if pad_dims > 1 {
        if is_pow2(height_align) {
            *height = pow_two_align(*height, height_align);
        } else {
            *height = (*height + height_align - 1) / height_align * height_align;
        }
    }

    if pad_dims > 2 || thickness > 1 {
        if flags.cube {
            *slices = next_pow2(*slices);
        }
        if thickness > 1 {
            *slices = pow_two_align(*slices, slice_align);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn linear_layout(
    cfg: &ChipConfig,
    tile_mode: TileMode,
    bpp: u32,
    samples: u32,
    flags: SurfaceFlags,
    pad_dims: u32,
    mip_level: u32,
    width: u32,
    height: u32,
    slices: u32,
    tile_info: TileInfo,
    tile_type: TileType,
) -> SurfaceLayout {
    let (base_align, mut pitch_align, height_align) = match tile_mode {
        // General linear surfaces only require element alignment.
        TileMode::LinearGeneral => (if bpp > 8 { bpp / 8 } else { 1 }, 1, 1),
        // Aligned linear rows start on pipe interleave boundaries; the
        // pitch granularity is 64 pixels or one interleave of pixels,
        // whichever is greater.
        _ => (
            cfg.pipe_interleave_bytes,
            (cfg.pipe_interleave_bytes / bits_to_bytes(bpp)).max(64),
            1,
        ),
    };
    adjust_pitch_alignment(flags, &mut pitch_align);

    let (mut pitch, mut height, mut slices) = (width, height, slices);
    pad_dimensions(
        tile_mode,
        flags,
        pad_dims,
        mip_level,
        &mut pitch,
        pitch_align,
        &mut height,
        height_align,
        &mut slices,
        1,
    );

    let slice_size =
        bits_to_bytes64(pitch as u64 * height as u64 * bpp as u64 * samples as u64);

    SurfaceLayout {
        pitch,
        height,
        depth: slices,
        surf_size: slice_size * slices as u64,
        base_align,
        pitch_align,
        height_align,
        depth_align: 1,
        tile_mode,
        tile_type,
        tile_info,
        block_width: pitch_align,
        block_height: height_align,
        last_macro_level: false,
    }
}

/// Pitch granularity that keeps one row of micro tiles covering a whole
/// pipe interleave. Depth surfaces with a stencil plane size for the 8 bpp
/// stencil since its rows are the longer ones.
fn micro_tiled_pitch_alignment(
    cfg: &ChipConfig,
    thickness: u32,
    mut bpp: u32,
    flags: SurfaceFlags,
    samples: u32,
) -> u32 {
    if flags.depth && !flags.no_stencil {
        bpp = 8;
    }

    let pixels_per_micro_tile = MICRO_TILE_PIXELS * thickness;
    let pixels_per_interleave = cfg.pipe_interleave_bytes * 8 / (bpp * samples);
    let micro_tiles_per_interleave = pixels_per_interleave / pixels_per_micro_tile;

    (micro_tiles_per_interleave * MICRO_TILE_WIDTH).max(MICRO_TILE_WIDTH)
}

#[allow(clippy::too_many_arguments)]
fn micro_tiled_layout(
    cfg: &ChipConfig,
    tile_mode: TileMode,
    bpp: u32,
    samples: u32,
    flags: SurfaceFlags,
    pad_dims: u32,
    mip_level: u32,
    width: u32,
    height: u32,
    slices: u32,
    tile_info: TileInfo,
    tile_type: TileType,
) -> SurfaceLayout {
    let mut tile_mode = tile_mode;
    let mut thickness = tile_mode.thickness();

    // Shallow mip levels of a thick surface drop to thin tiling.
    if mip_level > 0 && tile_mode == TileMode::Micro1dThick && slices < THICK_TILE_THICKNESS {
        tile_mode = TileMode::Micro1dThin;
        thickness = 1;
    }

    let base_align = cfg.pipe_interleave_bytes;
    let mut pitch_align = micro_tiled_pitch_alignment(cfg, thickness, bpp, flags, samples);
    let height_align = MICRO_TILE_HEIGHT;
    adjust_pitch_alignment(flags, &mut pitch_align);

    let (mut pitch, mut height, mut slices) = (width, height, slices);
    pad_dimensions(
        tile_mode,
        flags,
        pad_dims,
        mip_level,
        &mut pitch,
        pitch_align,
        &mut height,
        height_align,
        &mut slices,
        thickness,
    );

    let slice_size =
        bits_to_bytes64(pitch as u64 * height as u64 * bpp as u64 * samples as u64);

    SurfaceLayout {
        pitch,
        height,
        depth: slices,
        surf_size: slice_size * slices as u64,
        base_align,
        pitch_align,
        height_align,
        depth_align: thickness,
        tile_mode,
        tile_type,
        tile_info,
        block_width: pitch_align,
        block_height: height_align,
        last_macro_level: false,
    }
}

/// Macro tile parameters must have been resolved before this runs.
fn sanity_check_macro_tiled(cfg: &ChipConfig, info: &TileInfo) -> Result<(), AddrError> {
    if !matches!(info.banks, 2 | 4 | 8 | 16) {
        return Err(AddrError::unsupported(format!(
            "invalid bank count {}",
            info.banks
        )));
    }
    if !matches!(info.bank_width, 1 | 2 | 4 | 8) {
        return Err(AddrError::unsupported(format!(
            "invalid bank width {}",
            info.bank_width
        )));
    }
    if !matches!(info.bank_height, 1 | 2 | 4 | 8) {
        return Err(AddrError::unsupported(format!(
            "invalid bank height {}",
            info.bank_height
        )));
    }
    if !matches!(info.macro_aspect_ratio, 1 | 2 | 4 | 8) {
        return Err(AddrError::unsupported(format!(
            "invalid macro aspect ratio {}",
            info.macro_aspect_ratio
        )));
    }
    // Ratios above the bank count would give a macro tile height below one
    // micro tile.
    if info.banks < info.macro_aspect_ratio {
        return Err(AddrError::unsupported(format!(
            "macro aspect ratio {} exceeds bank count {}",
            info.macro_aspect_ratio, info.banks
        )));
    }
    if info.tile_split_bytes > cfg.row_size {
        tracing::warn!(
            tile_split_bytes = info.tile_split_bytes,
            row_size = cfg.row_size,
            "tile split exceeds the row size"
        );
    }
    // Two shader engines only exist on eight pipe parts.
    if cfg.shader_engines == 2 && cfg.pipes != 8 {
        return Err(AddrError::unsupported(format!(
            "2 shader engines require 8 pipes, have {}",
            cfg.pipes
        )));
    }
    if cfg.pipes * info.banks < 4 {
        return Err(AddrError::unsupported(format!(
            "{} pipes x {} banks cannot hash a macro tile",
            cfg.pipes, info.banks
        )));
    }
    Ok(())
}

/// Shrink bank width, then bank height, until a bank's worth of micro
/// tiles fits in one memory row.
fn reduce_bank_width_height(
    cfg: &ChipConfig,
    tile_size: u32,
    bpp: u32,
    flags: SurfaceFlags,
    samples: u32,
    mut bank_height_align: u32,
    info: &mut TileInfo,
) -> Result<(), AddrError> {
    if tile_size * info.bank_width * info.bank_height <= cfg.row_size {
        return Ok(());
    }

    let interleave = cfg.pipe_interleave_bytes * cfg.bank_interleave;
    let mut still_greater = true;

    if info.bank_width > 1 {
        while still_greater && info.bank_width > 1 {
            info.bank_width >>= 1;
            still_greater = tile_size * info.bank_width * info.bank_height > cfg.row_size;
        }

        // The narrower bank changes the alignment floor, which can pull
        // the aspect ratio up with it.
        bank_height_align = (interleave / (tile_size * info.bank_width)).max(1);
        if samples == 1 {
            let aspect_align = (interleave / (tile_size * cfg.pipes * info.bank_width)).max(1);
            info.macro_aspect_ratio = pow_two_align(info.macro_aspect_ratio, aspect_align);
        }
    }

    // 64 bit depth keeps its bank height for sampling; a split row is
    // acceptable there.
    if flags.depth && bpp >= 64 {
        still_greater = false;
    }

    if still_greater && info.bank_height > bank_height_align {
        while still_greater && info.bank_height > bank_height_align {
            info.bank_height >>= 1;
            if info.bank_height < bank_height_align {
                info.bank_height = bank_height_align;
                break;
            }
            still_greater = tile_size * info.bank_width * info.bank_height > cfg.row_size;
        }
    }

    if still_greater {
        tracing::warn!(
            tile_size,
            bank_width = info.bank_width,
            bank_height = info.bank_height,
            row_size = cfg.row_size,
            "bank footprint still exceeds a row"
        );
        return Err(AddrError::unsupported(
            "macro tile bank footprint does not fit in a memory row",
        ));
    }
    Ok(())
}

struct MacroAlignments {
    base_align: u32,
    pitch_align: u32,
    height_align: u32,
    block_width: u32,
    block_height: u32,
}

/// Compute macro tile alignments. Bank height and aspect ratio are aligned
/// up (and bank width/height reduced) in place so the returned alignments
/// always describe `info` as adjusted.
fn compute_macro_alignments(
    cfg: &ChipConfig,
    tile_mode: TileMode,
    bpp: u32,
    samples: u32,
    flags: SurfaceFlags,
    info: &mut TileInfo,
) -> Result<MacroAlignments, AddrError> {
    sanity_check_macro_tiled(cfg, info)?;

    let thickness = tile_mode.thickness();
    let pipes = cfg.pipes;
    let interleave = cfg.pipe_interleave_bytes * cfg.bank_interleave;

    let tile_size = info
        .tile_split_bytes
        .min(bits_to_bytes(MICRO_TILE_PIXELS * thickness * bpp * samples));

    // A column of micro tiles in one bank must cover at least a pipe
    // interleave's worth of banks.
    let bank_height_align = (interleave / (tile_size * info.bank_width)).max(1);
    info.bank_height = pow_two_align(info.bank_height, bank_height_align);

    if samples == 1 {
        let aspect_align = (interleave / (tile_size * pipes * info.bank_width)).max(1);
        info.macro_aspect_ratio = pow_two_align(info.macro_aspect_ratio, aspect_align);
    }

    reduce_bank_width_height(cfg, tile_size, bpp, flags, samples, bank_height_align, info)?;

    let block_width = MICRO_TILE_WIDTH * info.bank_width * pipes * info.macro_aspect_ratio;
    let mut pitch_align = block_width;
    adjust_pitch_alignment(flags, &mut pitch_align);

    let block_height = MICRO_TILE_HEIGHT * info.bank_height * info.banks / info.macro_aspect_ratio;

    Ok(MacroAlignments {
        base_align: pipes * info.bank_width * info.banks * info.bank_height * tile_size,
        pitch_align,
        height_align: block_height,
        block_width,
        block_height,
    })
}

/// Degrade a thick mode whose slice count no longer fills a thick micro
/// tile, scaling the tile byte estimate along with it.
fn degrade_thick_for_slices(tile_mode: TileMode, slices: u32, bytes_per_tile: &mut u32) -> TileMode {
    match tile_mode {
        TileMode::Micro1dThick => {
            *bytes_per_tile >>= 2;
            TileMode::Micro1dThin
        }
        TileMode::Macro2dThick => {
            *bytes_per_tile >>= 2;
            TileMode::Macro2dThin
        }
        TileMode::Macro3dThick => {
            *bytes_per_tile >>= 2;
            TileMode::Macro3dThin
        }
        TileMode::Macro2dXThick => {
            if slices < THICK_TILE_THICKNESS {
                *bytes_per_tile >>= 3;
                TileMode::Macro2dThin
            } else {
                *bytes_per_tile >>= 1;
                TileMode::Macro2dThick
            }
        }
        TileMode::Macro3dXThick => {
            if slices < THICK_TILE_THICKNESS {
                *bytes_per_tile >>= 3;
                TileMode::Macro3dThin
            } else {
                *bytes_per_tile >>= 1;
                TileMode::Macro3dThick
            }
        }
        other => other,
    }
}

/// Tile mode for a mip level: a macro mode degrades to micro tiling once
/// the level is smaller than a macro tile or a tile no longer spans a full
/// bank interleave.
#[allow(clippy::too_many_arguments)]
fn mip_level_tile_mode(
    cfg: &ChipConfig,
    base: TileMode,
    bpp: u32,
    pitch: u32,
    height: u32,
    slices: u32,
    samples: u32,
    pitch_align: u32,
    height_align: u32,
    info: &TileInfo,
) -> TileMode {
    let mut exp = base;
    let thickness = base.thickness();
    let interleave = cfg.pipe_interleave_bytes * cfg.bank_interleave;

    let mut bytes_per_tile =
        bits_to_bytes(MICRO_TILE_PIXELS * thickness * next_pow2(bpp) * samples);

    if slices < thickness {
        exp = degrade_thick_for_slices(exp, slices, &mut bytes_per_tile);
    }

    bytes_per_tile = bytes_per_tile.min(info.tile_split_bytes);

    let threshold1 = bytes_per_tile * cfg.pipes * info.bank_width * info.macro_aspect_ratio;
    let threshold2 = bytes_per_tile * info.bank_width * info.bank_height;

    match exp {
        TileMode::Macro2dThin | TileMode::Macro3dThin => {
            if pitch < pitch_align
                || height < height_align
                || interleave > threshold1
                || interleave > threshold2
            {
                exp = TileMode::Micro1dThin;
            }
        }
        TileMode::Macro2dThick
        | TileMode::Macro3dThick
        | TileMode::Macro2dXThick
        | TileMode::Macro3dXThick => {
            if pitch < pitch_align || height < height_align {
                exp = TileMode::Micro1dThick;
            }
        }
        _ => {}
    }

    exp
}

/// Whether the next smaller mip level would fall back to micro tiling.
/// The next height halves from this level's unpadded height.
#[allow(clippy::too_many_arguments)]
fn next_level_is_micro_tiled(
    cfg: &ChipConfig,
    tile_mode: TileMode,
    bpp: u32,
    width: u32,
    orig_height: u32,
    slices: u32,
    samples: u32,
    flags: SurfaceFlags,
    block_width: u32,
    block_height: u32,
    info: &TileInfo,
) -> bool {
    let next_pitch = next_pow2(width >> 1);
    let next_height = next_pow2(orig_height >> 1);
    let next_slices = if flags.volume {
        (slices >> 1).max(1)
    } else {
        slices
    };

    mip_level_tile_mode(
        cfg,
        tile_mode,
        bpp,
        next_pitch,
        next_height,
        next_slices,
        samples,
        block_width,
        block_height,
        info,
    )
    .is_micro_tiled()
}

#[allow(clippy::too_many_arguments)]
fn macro_tiled_layout(
    cfg: &ChipConfig,
    tile_mode: TileMode,
    bpp: u32,
    samples: u32,
    flags: SurfaceFlags,
    pad_dims: u32,
    mip_level: u32,
    width: u32,
    height: u32,
    orig_height: u32,
    slices: u32,
    tile_info: &mut TileInfo,
    tile_type: TileType,
) -> Result<SurfaceLayout, AddrError> {
    let orig_tile_mode = tile_mode;
    let mut align = compute_macro_alignments(cfg, tile_mode, bpp, samples, flags, tile_info)?;

    let thickness = tile_mode.thickness();
    let mut exp_tile_mode = tile_mode;

    if mip_level > 0 {
        exp_tile_mode = mip_level_tile_mode(
            cfg,
            tile_mode,
            bpp,
            width,
            height,
            slices,
            samples,
            align.pitch_align,
            align.height_align,
            tile_info,
        );

        if !exp_tile_mode.is_macro_tiled() {
            tracing::debug!(?orig_tile_mode, ?exp_tile_mode, mip_level, "mip level drops to micro tiling");
            return Ok(micro_tiled_layout(
                cfg,
                exp_tile_mode,
                bpp,
                samples,
                flags,
                pad_dims,
                mip_level,
                width,
                height,
                slices,
                *tile_info,
                tile_type,
            ));
        }

        // A thickness change means different alignments and padding
        // throughout, so restart with the degraded mode.
        if exp_tile_mode.thickness() != thickness {
            return macro_tiled_layout(
                cfg,
                exp_tile_mode,
                bpp,
                samples,
                flags,
                pad_dims,
                mip_level,
                width,
                height,
                orig_height,
                slices,
                tile_info,
                tile_type,
            );
        }
    }

    if exp_tile_mode != orig_tile_mode {
        align = compute_macro_alignments(cfg, exp_tile_mode, bpp, samples, flags, tile_info)?;
    }

    let (mut pitch, mut padded_height, mut padded_slices) = (width, height, slices);
    pad_dimensions(
        exp_tile_mode,
        flags,
        pad_dims,
        mip_level,
        &mut pitch,
        align.pitch_align,
        &mut padded_height,
        align.height_align,
        &mut padded_slices,
        exp_tile_mode.thickness(),
    );

    let last_macro_level = if mip_level > 0 && samples == 1 {
        next_level_is_micro_tiled(
            cfg,
            exp_tile_mode,
            bpp,
            width,
            orig_height,
            slices,
            samples,
            flags,
            align.block_width,
            align.block_height,
            tile_info,
        )
    } else {
        false
    };

    // Macro tiled slices are sized with the element width rounded up to a
    // power of two, matching the addressing math.
    let bytes_per_slice = bits_to_bytes64(
        pitch as u64 * padded_height as u64 * next_pow2(bpp) as u64 * samples as u64,
    );

    Ok(SurfaceLayout {
        pitch,
        height: padded_height,
        depth: padded_slices,
        surf_size: bytes_per_slice * padded_slices as u64,
        base_align: align.base_align,
        pitch_align: align.pitch_align,
        height_align: align.height_align,
        depth_align: exp_tile_mode.thickness(),
        tile_mode: exp_tile_mode,
        tile_type,
        tile_info: *tile_info,
        block_width: align.block_width,
        block_height: align.block_height,
        last_macro_level,
    })
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

    fn request(tile_mode: TileMode, width: u32, height: u32, bpp: u32) -> SurfaceRequest {
        SurfaceRequest {
            width,
            height,
            num_slices: 1,
            num_samples: 1,
            bpp,
            mip_level: 0,
            tile_mode,
            tile_type: TileType::Displayable,
            flags: SurfaceFlags {
                color: true,
                ..Default::default()
            },
            tile_info: TileInfoSpec::default(),
        }
    }

    #[test]
    fn linear_general_is_tightly_packed() {
        let cfg = config(4, 4, 2048);
        let layout =
            compute_surface_info(&cfg, &request(TileMode::LinearGeneral, 100, 50, 32)).unwrap();
        assert_eq!(layout.pitch, 100);
        assert_eq!(layout.height, 50);
        assert_eq!(layout.surf_size, 100 * 50 * 4);
        assert_eq!(layout.base_align, 4);
        assert_eq!(layout.pitch_align, 1);
    }

    #[test]
    fn linear_aligned_pads_pitch() {
        let cfg = config(4, 4, 2048);
        let layout =
            compute_surface_info(&cfg, &request(TileMode::LinearAligned, 100, 50, 32)).unwrap();
        // max(64 pixels, one pipe interleave of pixels)
        assert_eq!(layout.pitch_align, 64);
        assert_eq!(layout.pitch, 128);
        assert_eq!(layout.height, 50);
        assert_eq!(layout.surf_size, 128 * 50 * 4);
        assert_eq!(layout.base_align, 256);
    }

    #[test]
    fn micro_tiled_pads_to_tile_grid() {
        let cfg = config(4, 4, 2048);
        let layout =
            compute_surface_info(&cfg, &request(TileMode::Micro1dThin, 100, 100, 32)).unwrap();
        assert_eq!(layout.pitch_align, 8);
        assert_eq!(layout.height_align, 8);
        assert_eq!(layout.pitch, 104);
        assert_eq!(layout.height, 104);
        assert_eq!(layout.surf_size, 104 * 104 * 4);
        assert_eq!(layout.base_align, 256);
        assert_eq!(layout.depth_align, 1);
    }

    #[test]
    fn display_surfaces_align_pitch_to_32() {
        let cfg = config(4, 4, 2048);
        let mut req = request(TileMode::Micro1dThin, 64, 64, 128);
        req.flags.display = true;
        let layout = compute_surface_info(&cfg, &req).unwrap();
        assert_eq!(layout.pitch_align, 32);
    }

    #[test]
    fn shallow_thick_mips_drop_to_thin() {
        let cfg = config(4, 4, 2048);
        let mut req = request(TileMode::Micro1dThick, 64, 64, 32);
        req.mip_level = 1;
        req.num_slices = 2;
        let layout = compute_surface_info(&cfg, &req).unwrap();
        assert_eq!(layout.tile_mode, TileMode::Micro1dThin);
        assert_eq!(layout.depth_align, 1);
    }

    #[test]
    fn macro_2d_color_layout() {
        let cfg = config(4, 4, 2048);
        let layout =
            compute_surface_info(&cfg, &request(TileMode::Macro2dThin, 256, 256, 32)).unwrap();
        assert_eq!(layout.tile_mode, TileMode::Macro2dThin);
        assert_eq!(
            layout.tile_info,
            TileInfo {
                banks: 4,
                bank_width: 1,
                bank_height: 1,
                macro_aspect_ratio: 1,
                tile_split_bytes: 2048,
            }
        );
        assert_eq!(layout.pitch, 256);
        assert_eq!(layout.height, 256);
        assert_eq!(layout.pitch_align, 32);
        assert_eq!(layout.height_align, 32);
        assert_eq!(layout.block_width, 32);
        assert_eq!(layout.block_height, 32);
        assert_eq!(layout.base_align, 4 * 1 * 4 * 1 * 256);
        assert_eq!(layout.surf_size, 256 * 256 * 4);
        assert_eq!(layout.depth_align, 1);
        assert!(!layout.last_macro_level);
    }

    #[test]
    fn macro_dimensions_pad_to_block() {
        let cfg = config(4, 4, 2048);
        let layout =
            compute_surface_info(&cfg, &request(TileMode::Macro2dThin, 100, 100, 32)).unwrap();
        assert_eq!(layout.pitch, 128);
        assert_eq!(layout.height, 128);
        assert_eq!(layout.surf_size, 128 * 128 * 4);
        assert_eq!(layout.pitch % layout.block_width, 0);
        assert_eq!(layout.height % layout.block_height, 0);
    }

    #[test]
    fn thick_modes_reject_multisample() {
        let cfg = config(4, 4, 2048);
        let mut req = request(TileMode::Macro2dThick, 64, 64, 32);
        req.num_samples = 4;
        assert!(compute_surface_info(&cfg, &req).is_err());
    }

    #[test]
    fn oversized_thick_tiles_degrade() {
        let cfg = config(4, 4, 1024);
        let mut req = request(TileMode::Macro2dXThick, 64, 64, 32);
        req.num_slices = 8;
        let layout = compute_surface_info(&cfg, &req).unwrap();
        // 64 pixels * 8 deep * 4 bytes = 2KiB > 1KiB row, but half fits.
        assert_eq!(layout.tile_mode, TileMode::Macro2dThick);
        assert_eq!(layout.depth, 8);
        assert_eq!(layout.depth_align, 4);
        assert_eq!(layout.surf_size, 64 * 64 * 4 * 8);
    }

    #[test]
    fn degrade_can_be_disallowed() {
        let cfg = config(4, 4, 1024);
        let mut req = request(TileMode::Macro2dXThick, 64, 64, 32);
        req.num_slices = 8;
        req.flags.disallow_large_thick_degrade = true;
        let layout = compute_surface_info(&cfg, &req).unwrap();
        assert_eq!(layout.tile_mode, TileMode::Macro2dXThick);
        assert_eq!(layout.depth_align, 8);
    }

    #[test]
    fn small_mip_levels_fall_back_to_micro_tiling() {
        let cfg = config(4, 4, 2048);
        let mut req = request(TileMode::Macro2dThin, 16, 16, 32);
        req.mip_level = 1;
        let layout = compute_surface_info(&cfg, &req).unwrap();
        assert_eq!(layout.tile_mode, TileMode::Micro1dThin);
    }

    #[test]
    fn last_macro_level_is_flagged() {
        let cfg = config(4, 4, 2048);

        let mut req = request(TileMode::Macro2dThin, 32, 32, 32);
        req.mip_level = 1;
        let layout = compute_surface_info(&cfg, &req).unwrap();
        assert_eq!(layout.tile_mode, TileMode::Macro2dThin);
        assert!(layout.last_macro_level);

        let mut req = request(TileMode::Macro2dThin, 128, 128, 32);
        req.mip_level = 1;
        let layout = compute_surface_info(&cfg, &req).unwrap();
        assert_eq!(layout.tile_mode, TileMode::Macro2dThin);
        assert!(!layout.last_macro_level);
    }

    #[test]
    fn pinned_bad_bank_count_is_rejected() {
        let cfg = config(4, 4, 2048);
        let mut req = request(TileMode::Macro2dThin, 256, 256, 32);
        req.tile_info.banks = Some(3);
        assert!(compute_surface_info(&cfg, &req).is_err());
    }

    #[test]
    fn sample_limit_is_enforced() {
        let mut cfg = config(4, 4, 2048);
        cfg.arch = Arch::Evergreen;
        cfg.max_samples = 8;
        let mut req = request(TileMode::Macro2dThin, 256, 256, 32);
        req.num_samples = 16;
        assert!(compute_surface_info(&cfg, &req).is_err());
    }

    #[test]
    fn invalid_bpp_is_rejected() {
        let cfg = config(4, 4, 2048);
        assert!(compute_surface_info(&cfg, &request(TileMode::Macro2dThin, 64, 64, 0)).is_err());
        assert!(compute_surface_info(&cfg, &request(TileMode::Macro2dThin, 64, 64, 256)).is_err());
    }

    #[test]
    fn power_save_is_not_handled_here() {
        let cfg = config(4, 4, 2048);
        assert!(compute_surface_info(&cfg, &request(TileMode::PowerSave, 64, 64, 32)).is_err());
    }

    #[test]
    fn mip_levels_round_dimensions_up() {
        let cfg = config(4, 4, 2048);
        let mut req = request(TileMode::Macro2dThin, 100, 100, 32);
        req.mip_level = 1;
        let layout = compute_surface_info(&cfg, &req).unwrap();
        // 100 -> 128 before block padding even enters the picture.
        assert_eq!(layout.pitch, 128);
        assert_eq!(layout.height, 128);
    }
}
