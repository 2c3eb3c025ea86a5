// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bidirectional mapping between pixel coordinates and byte addresses.
//!
//! Three families: linear (row major), micro tiled (8x8 tiles laid out row
//! major) and macro tiled (micro tiles hashed across pipes and banks, with
//! the address bit layout `[offset | bank | bankInterleave | pipe |
//! pipeInterleave]`).
//!
//! Pitch, height and the tile parameters must come out of
//! `compute_surface_info`; the macro tiled math requires the padded
//! dimensions to be whole multiples of the macro tile footprint.

use crate::bitmath::{bits_to_bytes64, log2};
use crate::config::ChipConfig;
use crate::error::AddrError;
use crate::hash::{
    bank_from_addr, bank_from_coord, coord_from_bank_pipe, pipe_from_addr, pipe_from_coord,
};
use crate::pixel::{pixel_coord_from_index, pixel_index_in_micro_tile};
use crate::tile::{TileInfo, TileMode, TileType, MICRO_TILE_PIXELS};

/// Coordinate to address lookup.
#[derive(Clone, Copy, Debug)]
pub struct AddrFromCoordRequest {
    pub x: u32,
    pub y: u32,
    pub slice: u32,
    pub sample: u32,
    pub bpp: u32,
    /// Padded pitch in pixels.
    pub pitch: u32,
    /// Padded height in pixels.
    pub height: u32,
    pub num_slices: u32,
    pub num_samples: u32,
    pub tile_mode: TileMode,
    pub tile_type: TileType,
    pub tile_info: TileInfo,
    pub bank_swizzle: u32,
    pub pipe_swizzle: u32,
}

/// Address to coordinate lookup.
#[derive(Clone, Copy, Debug)]
pub struct CoordFromAddrRequest {
    pub addr: u64,
    pub bit_position: u32,
    pub bpp: u32,
    pub pitch: u32,
    pub height: u32,
    pub num_slices: u32,
    pub num_samples: u32,
    pub tile_mode: TileMode,
    pub tile_type: TileType,
    pub tile_info: TileInfo,
    pub bank_swizzle: u32,
    pub pipe_swizzle: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TiledAddr {
    pub addr: u64,
    /// Bit offset within the byte, nonzero only for sub-byte formats.
    pub bit_position: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TiledCoord {
    pub x: u32,
    pub y: u32,
    pub slice: u32,
    pub sample: u32,
}

pub fn compute_addr_from_coord(
    cfg: &ChipConfig,
    req: &AddrFromCoordRequest,
) -> Result<TiledAddr, AddrError> {
    if req.x >= req.pitch {
        return Err(AddrError::InvalidDimension { name: "x", value: req.x });
    }
    if req.y >= req.height {
        return Err(AddrError::InvalidDimension { name: "y", value: req.y });
    }
    if req.slice >= req.num_slices.max(1) {
        return Err(AddrError::InvalidDimension { name: "slice", value: req.slice });
    }
    if req.sample >= req.num_samples.max(1) {
        return Err(AddrError::InvalidDimension { name: "sample", value: req.sample });
    }

    match req.tile_mode {
        TileMode::LinearGeneral | TileMode::LinearAligned => Ok(addr_from_coord_linear(req)),
        TileMode::Micro1dThin | TileMode::Micro1dThick => addr_from_coord_micro(req),
        TileMode::PowerSave => Err(AddrError::unsupported(
            "power save addressing is generation specific",
        )),
        _ => addr_from_coord_macro(cfg, req),
    }
}

pub fn compute_coord_from_addr(
    cfg: &ChipConfig,
    req: &CoordFromAddrRequest,
) -> Result<TiledCoord, AddrError> {
    match req.tile_mode {
        TileMode::LinearGeneral | TileMode::LinearAligned => Ok(coord_from_addr_linear(req)),
        TileMode::Micro1dThin | TileMode::Micro1dThick => coord_from_addr_micro(req),
        TileMode::PowerSave => Err(AddrError::unsupported(
            "power save addressing is generation specific",
        )),
        _ => coord_from_addr_macro(cfg, req),
    }
}

fn addr_from_coord_linear(req: &AddrFromCoordRequest) -> TiledAddr {
    let slice_pixels = req.pitch as u64 * req.height as u64;
    let pixel = (req.slice as u64 + req.sample as u64 * req.num_slices.max(1) as u64)
        * slice_pixels
        + req.y as u64 * req.pitch as u64
        + req.x as u64;
    let addr_bits = pixel * req.bpp as u64;

    TiledAddr {
        addr: addr_bits / 8,
        bit_position: (addr_bits % 8) as u32,
    }
}

fn coord_from_addr_linear(req: &CoordFromAddrRequest) -> TiledCoord {
    let num_slices = req.num_slices.max(1) as u64;
    let slice_pixels = req.pitch as u64 * req.height as u64;
    let linear = (req.addr * 8 + req.bit_position as u64) / req.bpp as u64;

    TiledCoord {
        x: ((linear % slice_pixels) % req.pitch as u64) as u32,
        y: ((linear % slice_pixels) / req.pitch as u64 % req.height as u64) as u32,
        slice: ((linear / slice_pixels) % num_slices) as u32,
        sample: ((linear / slice_pixels) / num_slices) as u32,
    }
}

/// Sample and pixel offsets inside a micro tile, in bits. Depth surfaces
/// store all samples of a pixel together; everything else stores whole
/// sample planes back to back.
fn element_offset_bits(
    pixel_index: u32,
    sample: u32,
    bpp: u32,
    num_samples: u32,
    sample_plane_bits: u64,
    tile_type: TileType,
) -> u64 {
    if tile_type == TileType::DepthSampleOrder {
        pixel_index as u64 * (bpp * num_samples) as u64 + sample as u64 * bpp as u64
    } else {
        pixel_index as u64 * bpp as u64 + sample as u64 * sample_plane_bits
    }
}

fn addr_from_coord_micro(req: &AddrFromCoordRequest) -> Result<TiledAddr, AddrError> {
    let thickness = req.tile_mode.thickness();
    let num_samples = req.num_samples.max(1);

    let micro_tile_bits =
        MICRO_TILE_PIXELS as u64 * thickness as u64 * req.bpp as u64 * num_samples as u64;
    let micro_tile_bytes = bits_to_bytes64(micro_tile_bits);
    let slice_bytes = bits_to_bytes64(
        req.pitch as u64 * req.height as u64 * thickness as u64 * req.bpp as u64
            * num_samples as u64,
    );

    let micro_tiles_per_row = req.pitch / 8;
    let micro_tile_offset = (req.y as u64 / 8 * micro_tiles_per_row as u64 + req.x as u64 / 8)
        * micro_tile_bytes;
    let slice_offset = (req.slice / thickness) as u64 * slice_bytes;

    let pixel_index = pixel_index_in_micro_tile(
        req.x,
        req.y,
        req.slice,
        req.bpp,
        req.tile_type,
        thickness,
    )
    .ok_or_else(|| AddrError::unhandled(format!("no micro tile ordering for {} bpp", req.bpp)))?;

    let element_offset = element_offset_bits(
        pixel_index,
        req.sample,
        req.bpp,
        num_samples,
        micro_tile_bits / num_samples as u64,
        req.tile_type,
    );

    Ok(TiledAddr {
        addr: slice_offset + micro_tile_offset + element_offset / 8,
        bit_position: (element_offset % 8) as u32,
    })
}

/// Split an intra-tile bit offset back into pixel index and sample, then
/// into micro tile local coordinates.
fn pixel_coord_from_element_offset(
    offset_bits: u64,
    bpp: u32,
    num_samples: u32,
    thickness: u32,
    tile_type: TileType,
) -> Result<(u32, u32, u32, u32), AddrError> {
    let (pixel_index, sample) = if tile_type == TileType::DepthSampleOrder {
        let sample_pixel_bits = (bpp * num_samples) as u64;
        (
            (offset_bits / sample_pixel_bits) as u32,
            ((offset_bits % sample_pixel_bits) / bpp as u64) as u32,
        )
    } else {
        let sample_plane_bits = MICRO_TILE_PIXELS as u64 * bpp as u64 * thickness as u64;
        (
            ((offset_bits % sample_plane_bits) / bpp as u64) as u32,
            (offset_bits / sample_plane_bits) as u32,
        )
    };

    let (x, y, z) = pixel_coord_from_index(pixel_index, bpp, tile_type, thickness)
        .ok_or_else(|| AddrError::unhandled(format!("no micro tile ordering for {bpp} bpp")))?;

    Ok((x, y, z, sample))
}

fn coord_from_addr_micro(req: &CoordFromAddrRequest) -> Result<TiledCoord, AddrError> {
    let thickness = req.tile_mode.thickness();
    let num_samples = req.num_samples.max(1);

    let micro_tile_bits =
        MICRO_TILE_PIXELS as u64 * thickness as u64 * req.bpp as u64 * num_samples as u64;
    let slice_bits = req.pitch as u64 * req.height as u64 * thickness as u64 * req.bpp as u64
        * num_samples as u64;
    let row_bits = (req.pitch / 8) as u64 * micro_tile_bits;

    let mut bit_addr = req.addr * 8 + req.bit_position as u64;

    let slice_index = (bit_addr / slice_bits) as u32;
    bit_addr %= slice_bits;

    let micro_tile_y = (bit_addr / row_bits) as u32 * 8;
    bit_addr %= row_bits;

    let micro_tile_x = (bit_addr / micro_tile_bits) as u32 * 8;
    let pixel_offset_bits = bit_addr % micro_tile_bits;

    let (px, py, pz, sample) = pixel_coord_from_element_offset(
        pixel_offset_bits,
        req.bpp,
        num_samples,
        thickness,
        req.tile_type,
    )?;

    Ok(TiledCoord {
        x: micro_tile_x + px,
        y: micro_tile_y + py,
        slice: slice_index * thickness + pz,
        sample,
    })
}

fn addr_from_coord_macro(
    cfg: &ChipConfig,
    req: &AddrFromCoordRequest,
) -> Result<TiledAddr, AddrError> {
    let info = &req.tile_info;
    let thickness = req.tile_mode.thickness();
    let num_samples = req.num_samples.max(1);

    let pipe_interleave_bits = log2(cfg.pipe_interleave_bytes);
    let pipe_bits = log2(cfg.pipes);
    let bank_interleave_bits = log2(cfg.bank_interleave);
    let bank_bits = log2(info.banks);

    let micro_tile_bits =
        MICRO_TILE_PIXELS as u64 * thickness as u64 * req.bpp as u64 * num_samples as u64;
    let mut micro_tile_bytes = micro_tile_bits / 8;

    let pixel_index = pixel_index_in_micro_tile(
        req.x,
        req.y,
        req.slice,
        req.bpp,
        req.tile_type,
        thickness,
    )
    .ok_or_else(|| AddrError::unhandled(format!("no micro tile ordering for {} bpp", req.bpp)))?;

    let element_bits = element_offset_bits(
        pixel_index,
        req.sample,
        req.bpp,
        num_samples,
        micro_tile_bits / num_samples as u64,
        req.tile_type,
    );
    let bit_position = (element_bits % 8) as u32;
    let mut element_offset = element_bits / 8;

    // Oversized thin micro tiles are split across slice-like slabs at the
    // tile split boundary.
    let tile_split_bytes = info.tile_split_bytes as u64;
    let (slices_per_tile, tile_split_slice) =
        if micro_tile_bytes > tile_split_bytes && thickness == 1 {
            let split = (element_offset / tile_split_bytes) as u32;
            element_offset %= tile_split_bytes;
            let per_tile = (micro_tile_bytes / tile_split_bytes) as u32;
            micro_tile_bytes = tile_split_bytes;
            (per_tile, split)
        } else {
            (1, 0)
        };

    let macro_tile_pitch = 8 * info.bank_width * cfg.pipes * info.macro_aspect_ratio;
    let macro_tile_height = 8 * info.bank_height * info.banks / info.macro_aspect_ratio;
    if req.pitch % macro_tile_pitch != 0 {
        return Err(AddrError::InvalidDimension { name: "pitch", value: req.pitch });
    }
    if req.height % macro_tile_height != 0 {
        return Err(AddrError::InvalidDimension { name: "height", value: req.height });
    }

    let macro_tiles_per_row = (req.pitch / macro_tile_pitch) as u64;
    let macro_tile_bytes = micro_tile_bytes * (macro_tile_pitch / 8) as u64
        * (macro_tile_height / 8) as u64
        / (cfg.pipes * info.banks) as u64;

    let macro_tile_offset = ((req.y / macro_tile_height) as u64 * macro_tiles_per_row
        + (req.x / macro_tile_pitch) as u64)
        * macro_tile_bytes;

    let macro_tiles_per_slice = macro_tiles_per_row * (req.height / macro_tile_height) as u64;
    let slice_bytes = macro_tiles_per_slice * macro_tile_bytes;
    let slice_offset = slice_bytes
        * (tile_split_slice as u64 + slices_per_tile as u64 * (req.slice / thickness) as u64);

    let tile_row_index = (req.y / 8) % info.bank_height;
    let tile_column_index = (req.x / 8 / cfg.pipes) % info.bank_width;
    let tile_offset =
        (tile_row_index * info.bank_width + tile_column_index) as u64 * micro_tile_bytes;

    let total_offset = slice_offset + macro_tile_offset + tile_offset + element_offset;

    let pipe = pipe_from_coord(cfg, req.x, req.y, req.slice, req.tile_mode, req.pipe_swizzle);
    let bank = bank_from_coord(
        cfg,
        info,
        req.tile_mode,
        req.x,
        req.y,
        req.slice,
        tile_split_slice,
        req.bank_swizzle,
    );

    let pipe_interleave_offset = total_offset & (cfg.pipe_interleave_bytes as u64 - 1);
    let bank_interleave_offset =
        (total_offset >> pipe_interleave_bits) & (cfg.bank_interleave as u64 - 1);
    let offset = total_offset >> (pipe_interleave_bits + bank_interleave_bits);

    let addr = pipe_interleave_offset
        | (pipe as u64) << pipe_interleave_bits
        | bank_interleave_offset << (pipe_interleave_bits + pipe_bits)
        | (bank as u64) << (pipe_interleave_bits + pipe_bits + bank_interleave_bits)
        | offset << (pipe_interleave_bits + pipe_bits + bank_interleave_bits + bank_bits);

    Ok(TiledAddr { addr, bit_position })
}

fn coord_from_addr_macro(
    cfg: &ChipConfig,
    req: &CoordFromAddrRequest,
) -> Result<TiledCoord, AddrError> {
    let info = &req.tile_info;
    let thickness = req.tile_mode.thickness();
    let num_samples = req.num_samples.max(1);

    let group_bits = (cfg.pipe_interleave_bytes * 8) as u64;
    let addr_bits = req.addr * 8 + req.bit_position as u64;

    // Strip the pipe, bank interleave and bank fields back out of the
    // address, leaving the plain surface offset.
    let above_group = addr_bits / group_bits / cfg.pipes as u64;
    let total_offset_bits = addr_bits % group_bits
        + (above_group % cfg.bank_interleave as u64) * group_bits
        + (above_group / cfg.bank_interleave as u64 / info.banks as u64)
            * group_bits
            * cfg.bank_interleave as u64;

    let micro_tile_bits =
        req.bpp as u64 * thickness as u64 * MICRO_TILE_PIXELS as u64 * num_samples as u64;
    let micro_tile_bytes = micro_tile_bits / 8;
    let slices_per_tile = if micro_tile_bytes > info.tile_split_bytes as u64 && thickness == 1 {
        (micro_tile_bytes / info.tile_split_bytes as u64) as u32
    } else {
        1
    };
    let tile_bits = micro_tile_bits / slices_per_tile as u64;

    let macro_width = info.bank_width * cfg.pipes * info.macro_aspect_ratio;
    let macro_height = info.bank_height * info.banks / info.macro_aspect_ratio;
    if req.pitch % (macro_width * 8) != 0 {
        return Err(AddrError::InvalidDimension { name: "pitch", value: req.pitch });
    }
    if req.height % (macro_height * 8) != 0 {
        return Err(AddrError::InvalidDimension { name: "height", value: req.height });
    }
    let pitch_in_macro_tiles = (req.pitch / 8 / macro_width) as u64;

    let macro_tile_bits =
        macro_width as u64 * macro_height as u64 * tile_bits / (info.banks * cfg.pipes) as u64;

    let mut macro_tile_index = total_offset_bits / macro_tile_bits;
    let macro_tiles_per_slice =
        (req.pitch / (macro_width * 8)) as u64 * (req.height / (macro_height * 8)) as u64;

    let slices = macro_tile_index / macro_tiles_per_slice;
    let mut slice = (slices / slices_per_tile as u64) as u32 * thickness;
    let tile_slices = (slices % slices_per_tile as u64) as u32;

    let element_offset = tile_slices as u64 * tile_bits + total_offset_bits % tile_bits;
    let (mut x, mut y, z, sample) = pixel_coord_from_element_offset(
        element_offset,
        req.bpp,
        num_samples,
        thickness,
        req.tile_type,
    )?;
    slice += z;

    macro_tile_index %= macro_tiles_per_slice;
    y += (macro_tile_index / pitch_in_macro_tiles) as u32 * macro_height * 8;
    x += (macro_tile_index % pitch_in_macro_tiles) as u32 * macro_width * 8;

    let tile_index = ((total_offset_bits % macro_tile_bits) / tile_bits) as u32;
    y += (tile_index / info.bank_width) % info.bank_height * 8;
    x += tile_index % info.bank_width * cfg.pipes * 8;

    let bank = bank_from_addr(cfg, info.banks, req.addr);
    let pipe = pipe_from_addr(cfg, req.addr);

    let (x, y) = coord_from_bank_pipe(
        cfg,
        info,
        req.tile_mode,
        x,
        y,
        slice,
        bank,
        pipe,
        req.bank_swizzle,
        tile_slices,
    );

    Ok(TiledCoord { x, y, slice, sample })
}
