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
use crate::powersave::{
    addr_from_coord_power_save, coord_from_addr_power_save, power_save_alignments,
    power_save_dimensions, sanity_check_power_save,
};
use crate::resolve::{resolve_tile_info, TILE_INFO_NON_MACRO};
use crate::surface::{compute_surface_info, SurfaceLayout, SurfaceRequest};
use crate::tile::{TileInfo, TileMode, TileType};

/// Second generation: up to 16 samples, configurable lower pipe count and
/// the power save tiling mode for idle-screen scanout.
pub struct NorthernIslands {
    config: ChipConfig,
}

impl NorthernIslands {
    pub fn new(config: ChipConfig) -> Result<Self, AddrError> {
        if !config.arch.is_northern_islands() {
            return Err(AddrError::WrongChipArch {
                actual: config.arch,
                expected: Arch::NorthernIslands,
                backtrace: BtWrapper::capture(),
            });
        }
        Ok(Self { config })
    }

    fn power_save_layout(&self, req: &SurfaceRequest) -> Result<SurfaceLayout, AddrError> {
        sanity_check_power_save(
            &self.config,
            req.bpp,
            req.num_samples.max(1),
            req.num_slices.max(1),
            req.mip_level,
        )?;

        let align = power_save_alignments(&self.config, req.flags.display);
        let (pitch, height, surf_size) = power_save_dimensions(
            &self.config,
            &align,
            req.width.max(1),
            req.height.max(1),
            req.bpp,
        );

        Ok(SurfaceLayout {
            pitch,
            height,
            depth: 1,
            surf_size,
            base_align: align.base_align,
            pitch_align: align.pitch_align,
            height_align: align.height_align,
            depth_align: 1,
            tile_mode: TileMode::PowerSave,
            tile_type: req.tile_type,
            tile_info: TILE_INFO_NON_MACRO,
            block_width: align.pitch_align,
            block_height: align.height_align,
            last_macro_level: false,
        })
    }
}

impl ChipImpl for NorthernIslands {
    fn get_arch(&self) -> Arch {
        Arch::NorthernIslands
    }

    fn config(&self) -> &ChipConfig {
        &self.config
    }

    fn compute_surface_info(&self, req: &SurfaceRequest) -> Result<SurfaceLayout, AddrError> {
        if req.tile_mode == TileMode::PowerSave {
            return self.power_save_layout(req);
        }
        compute_surface_info(&self.config, req)
    }

    fn addr_from_coord(&self, req: &AddrFromCoordRequest) -> Result<TiledAddr, AddrError> {
        if req.tile_mode == TileMode::PowerSave {
            sanity_check_power_save(
                &self.config,
                req.bpp,
                req.num_samples.max(1),
                req.num_slices.max(1),
                0,
            )?;
            if req.x >= req.pitch {
                return Err(AddrError::InvalidDimension {
                    name: "x",
                    value: req.x,
                });
            }
            if req.y >= req.height {
                return Err(AddrError::InvalidDimension {
                    name: "y",
                    value: req.y,
                });
            }
            return Ok(TiledAddr {
                addr: addr_from_coord_power_save(&self.config, req.x, req.y, req.bpp, req.pitch),
                bit_position: 0,
            });
        }
        compute_addr_from_coord(&self.config, req)
    }

    fn coord_from_addr(&self, req: &CoordFromAddrRequest) -> Result<TiledCoord, AddrError> {
        if req.tile_mode == TileMode::PowerSave {
            sanity_check_power_save(
                &self.config,
                req.bpp,
                req.num_samples.max(1),
                req.num_slices.max(1),
                0,
            )?;
            let (x, y) = coord_from_addr_power_save(&self.config, req.addr, req.bpp, req.pitch);
            return Ok(TiledCoord {
                x,
                y,
                slice: 0,
                sample: 0,
            });
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
