// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

use tessera_core::Arch;

use crate::addr::{
    compute_addr_from_coord, compute_coord_from_addr, AddrFromCoordRequest, CoordFromAddrRequest,
    TiledAddr, TiledCoord,
};
use crate::chip::ChipImpl;
use crate::config::ChipConfig;
use crate::error::{AddrError, BtWrapper};
use crate::hash;
use crate::resolve::resolve_tile_info;
use crate::surface::{compute_surface_info, SurfaceLayout, SurfaceRequest};
use crate::tile::{TileInfo, TileMode, TileType};

/// First generation of the shared addressing scheme. No power save tiling
/// and at most eight samples per pixel.
pub struct Evergreen {
    config: ChipConfig,
}

impl Evergreen {
    pub fn new(config: ChipConfig) -> Result<Self, AddrError> {
        if !config.arch.is_evergreen() {
            return Err(AddrError::WrongChipArch {
                actual: config.arch,
                expected: Arch::Evergreen,
                backtrace: BtWrapper::capture(),
            });
        }
        Ok(Self { config })
    }
}

impl ChipImpl for Evergreen {
    fn get_arch(&self) -> Arch {
        Arch::Evergreen
    }

    fn config(&self) -> &ChipConfig {
        &self.config
    }

    fn compute_surface_info(&self, req: &SurfaceRequest) -> Result<SurfaceLayout, AddrError> {
        if req.tile_mode == TileMode::PowerSave {
            return Err(AddrError::unsupported(
                "power save tiling is not available on evergreen",
            ));
        }
        compute_surface_info(&self.config, req)
    }

    fn addr_from_coord(&self, req: &AddrFromCoordRequest) -> Result<TiledAddr, AddrError> {
        if req.tile_mode == TileMode::PowerSave {
            return Err(AddrError::unsupported(
                "power save tiling is not available on evergreen",
            ));
        }
        compute_addr_from_coord(&self.config, req)
    }

    fn coord_from_addr(&self, req: &CoordFromAddrRequest) -> Result<TiledCoord, AddrError> {
        if req.tile_mode == TileMode::PowerSave {
            return Err(AddrError::unsupported(
                "power save tiling is not available on evergreen",
            ));
        }
        compute_coord_from_addr(&self.config, req)
    }

    fn resolve_tile_info(&self, req: &SurfaceRequest) -> (TileInfo, TileType) {
        resolve_tile_info(
            &self.config,
            req.tile_mode,
            req.flags,
            req.bpp,
            req.width,
            req.height,
            req.num_samples.max(1),
            &req.tile_info,
            req.tile_type,
        )
    }

    fn pipe_from_coord(
        &self,
        x: u32,
        y: u32,
        slice: u32,
        tile_mode: TileMode,
        pipe_swizzle: u32,
    ) -> u32 {
        hash::pipe_from_coord(&self.config, x, y, slice, tile_mode, pipe_swizzle)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
