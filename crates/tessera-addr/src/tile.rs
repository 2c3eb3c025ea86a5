// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

//! Tile modes, tile types and the macro tile parameter bundle.

pub const MICRO_TILE_WIDTH: u32 = 8;
pub const MICRO_TILE_HEIGHT: u32 = 8;
pub const MICRO_TILE_PIXELS: u32 = MICRO_TILE_WIDTH * MICRO_TILE_HEIGHT;
pub const THICK_TILE_THICKNESS: u32 = 4;
pub const XTHICK_TILE_THICKNESS: u32 = 8;
pub const POWER_SAVE_TILE_BYTES: u32 = 64;

/// How pixels of a surface are arranged in memory.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum TileMode {
    /// Row-major with no padding requirements beyond the pixel size.
    LinearGeneral,
    /// Row-major, padded so rows start on pipe interleave boundaries.
    LinearAligned,
    Micro1dThin,
    Micro1dThick,
    Macro2dThin,
    Macro2dThick,
    Macro2dXThick,
    Macro3dThin,
    Macro3dThick,
    Macro3dXThick,
    /// Reduced-banking mode for idle-screen scanout, Northern Islands only.
    PowerSave,
}

impl TileMode {
    /// Number of slices a micro tile spans.
    pub fn thickness(self) -> u32 {
        match self {
            TileMode::Micro1dThick | TileMode::Macro2dThick | TileMode::Macro3dThick => {
                THICK_TILE_THICKNESS
            }
            TileMode::Macro2dXThick | TileMode::Macro3dXThick => XTHICK_TILE_THICKNESS,
            _ => 1,
        }
    }

    pub fn is_linear(self) -> bool {
        matches!(self, TileMode::LinearGeneral | TileMode::LinearAligned)
    }

    pub fn is_micro_tiled(self) -> bool {
        matches!(
            self,
            TileMode::Micro1dThin | TileMode::Micro1dThick | TileMode::PowerSave
        )
    }

    pub fn is_macro_tiled(self) -> bool {
        self.is_macro_2d() || self.is_macro_3d()
    }

    pub fn is_macro_2d(self) -> bool {
        matches!(
            self,
            TileMode::Macro2dThin | TileMode::Macro2dThick | TileMode::Macro2dXThick
        )
    }

    pub fn is_macro_3d(self) -> bool {
        matches!(
            self,
            TileMode::Macro3dThin | TileMode::Macro3dThick | TileMode::Macro3dXThick
        )
    }
}

/// Pixel ordering inside a micro tile.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum TileType {
    #[default]
    Displayable,
    NonDisplayable,
    /// Sample-major ordering used by depth and stencil surfaces.
    DepthSampleOrder,
}

/// What the surface is used for. Drives tile parameter selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceFlags {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
    pub texture: bool,
    pub fmask: bool,
    pub volume: bool,
    pub cube: bool,
    /// Depth surface carries no stencil plane.
    pub no_stencil: bool,
    /// Depth/stencil compression is enabled, tightening tile splits.
    pub compress_z: bool,
    /// Trade bank conflicts for a smaller footprint on narrow surfaces.
    pub opt4_space: bool,
    /// Scanned out by the display engine; pitch gets extra alignment.
    pub display: bool,
    /// Pad mip 0 to powers of two even though it normally is not.
    pub pow2_pad: bool,
    /// Keep thick micro tiles even when they overflow a row.
    pub disallow_large_thick_degrade: bool,
}

/// Caller-supplied macro tile parameters. `None` fields are chosen by the
/// resolver; passing a fully populated spec pins the layout exactly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileInfoSpec {
    pub banks: Option<u32>,
    pub bank_width: Option<u32>,
    pub bank_height: Option<u32>,
    pub macro_aspect_ratio: Option<u32>,
    pub tile_split_bytes: Option<u32>,
}

impl TileInfoSpec {
    pub fn is_fully_specified(&self) -> bool {
        self.banks.is_some()
            && self.bank_width.is_some()
            && self.bank_height.is_some()
            && self.macro_aspect_ratio.is_some()
            && self.tile_split_bytes.is_some()
    }
}

impl From<TileInfo> for TileInfoSpec {
    fn from(info: TileInfo) -> Self {
        TileInfoSpec {
            banks: Some(info.banks),
            bank_width: Some(info.bank_width),
            bank_height: Some(info.bank_height),
            macro_aspect_ratio: Some(info.macro_aspect_ratio),
            tile_split_bytes: Some(info.tile_split_bytes),
        }
    }
}

/// Fully resolved macro tile parameters. Every field is a power of two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileInfo {
    pub banks: u32,
    /// Width of a bank unit, in micro tiles.
    pub bank_width: u32,
    /// Height of a bank unit, in micro tiles.
    pub bank_height: u32,
    /// Width:height ratio of the macro tile footprint.
    pub macro_aspect_ratio: u32,
    /// Byte offset at which a micro tile is split across slices of a
    /// sample-split surface.
    pub tile_split_bytes: u32,
}
