// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0
#![crate_type = "lib"]

pub use addr::{
    compute_addr_from_coord, compute_coord_from_addr, AddrFromCoordRequest, CoordFromAddrRequest,
    TiledAddr, TiledCoord,
};
pub use chip::{Chip, ChipImpl, Evergreen, NorthernIslands};
pub use config::{ChipConfig, GbAddrConfig};
pub use error::{AddrError, ConfigError};
pub use surface::{compute_surface_info, SurfaceLayout, SurfaceRequest};
pub use tile::{SurfaceFlags, TileInfo, TileInfoSpec, TileMode, TileType};

/// Tessera-addr maps between pixel coordinates and memory addresses for
/// tiled surfaces. Everything defined in `ChipImpl` is implemented in a
/// generation agnostic way; chip specific behavior lives in `Evergreen` and
/// `NorthernIslands`.
///

pub mod addr;
mod bitmath;
pub mod chip;
pub mod config;
pub mod error;
pub mod hash;
pub mod pixel;
pub mod powersave;
pub mod resolve;
pub mod surface;
pub mod tile;
