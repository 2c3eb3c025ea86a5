// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

mod evergreen;
mod northern_islands;

pub use evergreen::Evergreen;
pub use northern_islands::NorthernIslands;

use tessera_core::Arch;

use crate::addr::{AddrFromCoordRequest, CoordFromAddrRequest, TiledAddr, TiledCoord};
use crate::config::ChipConfig;
use crate::error::AddrError;
use crate::surface::{SurfaceLayout, SurfaceRequest};
use crate::tile::{TileInfo, TileMode, TileType};

/// Defines common functionality for all supported generations.
/// This is a convinence interface that allows generation agnostic code to be
/// written; the per-generation differences (sample limits, power save
/// tiling) live behind it.
pub trait ChipImpl: Send + Sync + 'static {
    /// Returns the current arch of the chip, can be used to avoid
    /// needing to ducktype when downcasting.
    fn get_arch(&self) -> Arch;

    /// Decoded memory controller configuration the chip was created with.
    fn config(&self) -> &ChipConfig;

    /// Padded layout, alignments and final tile mode for a surface.
    fn compute_surface_info(&self, req: &SurfaceRequest) -> Result<SurfaceLayout, AddrError>;

    /// Byte address of a pixel. Pitch, height and tile parameters must come
    /// from [`ChipImpl::compute_surface_info`].
    fn addr_from_coord(&self, req: &AddrFromCoordRequest) -> Result<TiledAddr, AddrError>;

    /// Inverse of [`ChipImpl::addr_from_coord`].
    fn coord_from_addr(&self, req: &CoordFromAddrRequest) -> Result<TiledCoord, AddrError>;

    /// Fill the unset macro tile parameters of a surface request.
    fn resolve_tile_info(&self, req: &SurfaceRequest) -> (TileInfo, TileType);

    /// Pipe that owns the micro tile containing `(x, y)`.
    fn pipe_from_coord(
        &self,
        x: u32,
        y: u32,
        slice: u32,
        tile_mode: TileMode,
        pipe_swizzle: u32,
    ) -> u32;

    /// Convinence function to downcast to a concrete type.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// A wrapper around a chip that implements `ChipImpl`.
/// This allows us to create and use chips without knowing their type,
/// but we can still downcast to the concrete type if we need to.
pub struct Chip {
    pub inner: Box<dyn ChipImpl>,
}

impl From<Box<dyn ChipImpl>> for Chip {
    fn from(inner: Box<dyn ChipImpl>) -> Self {
        Self { inner }
    }
}

impl Chip {
    /// Build a chip from raw register state.
    pub fn open(
        arch: Arch,
        gb_addr_config: u32,
        bank_field: u32,
        rank_field: u32,
    ) -> Result<Self, AddrError> {
        let config = ChipConfig::decode(arch, gb_addr_config, bank_field, rank_field)?;
        Self::from_config(config)
    }

    pub fn from_config(config: ChipConfig) -> Result<Self, AddrError> {
        let inner: Box<dyn ChipImpl> = match config.arch {
            Arch::Evergreen => Box::new(Evergreen::new(config)?),
            Arch::NorthernIslands => Box::new(NorthernIslands::new(config)?),
        };
        Ok(Self { inner })
    }

    /// Downcast to an evergreen chip
    pub fn as_evergreen(&self) -> Option<&Evergreen> {
        self.inner.as_any().downcast_ref::<Evergreen>()
    }

    /// Downcast to a northern islands chip
    pub fn as_northern_islands(&self) -> Option<&NorthernIslands> {
        self.inner.as_any().downcast_ref::<NorthernIslands>()
    }
}

impl ChipImpl for Chip {
    fn get_arch(&self) -> Arch {
        self.inner.get_arch()
    }

    fn config(&self) -> &ChipConfig {
        self.inner.config()
    }

    fn compute_surface_info(&self, req: &SurfaceRequest) -> Result<SurfaceLayout, AddrError> {
        self.inner.compute_surface_info(req)
    }

    fn addr_from_coord(&self, req: &AddrFromCoordRequest) -> Result<TiledAddr, AddrError> {
        self.inner.addr_from_coord(req)
    }

    fn coord_from_addr(&self, req: &CoordFromAddrRequest) -> Result<TiledCoord, AddrError> {
        self.inner.coord_from_addr(req)
    }

    fn resolve_tile_info(&self, req: &SurfaceRequest) -> (TileInfo, TileType) {
        self.inner.resolve_tile_info(req)
    }

    fn pipe_from_coord(
        &self,
        x: u32,
        y: u32,
        slice: u32,
        tile_mode: TileMode,
        pipe_swizzle: u32,
    ) -> u32 {
        self.inner.pipe_from_coord(x, y, slice, tile_mode, pipe_swizzle)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self.inner.as_any()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolve::TILE_INFO_NON_MACRO;
    use crate::tile::{SurfaceFlags, TileInfoSpec};

    fn config(arch: Arch, pipes: u32, banks: u32, row_size: u32) -> ChipConfig {
        ChipConfig {
            arch,
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
            max_samples: if arch.is_northern_islands() { 16 } else { 8 },
        }
    }

    fn surface(tile_mode: TileMode, width: u32, height: u32, bpp: u32) -> SurfaceRequest {
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
    fn from_config_picks_the_generation() {
        let chip = Chip::from_config(config(Arch::NorthernIslands, 4, 8, 2048)).unwrap();
        assert_eq!(chip.get_arch(), Arch::NorthernIslands);
        assert!(chip.as_northern_islands().is_some());
        assert!(chip.as_evergreen().is_none());

        let chip = Chip::from_config(config(Arch::Evergreen, 2, 4, 1024)).unwrap();
        assert!(chip.as_evergreen().is_some());
    }

    #[test]
    fn construction_rejects_the_wrong_arch() {
        assert!(Evergreen::new(config(Arch::NorthernIslands, 4, 8, 2048)).is_err());
        assert!(NorthernIslands::new(config(Arch::Evergreen, 2, 4, 1024)).is_err());
    }

    #[test]
    fn evergreen_rejects_power_save() {
        let chip = Chip::from_config(config(Arch::Evergreen, 2, 4, 1024)).unwrap();
        assert!(chip
            .compute_surface_info(&surface(TileMode::PowerSave, 64, 64, 8))
            .is_err());
    }

    #[test]
    fn chip_computes_macro_layouts() {
        let chip = Chip::from_config(config(Arch::NorthernIslands, 4, 4, 2048)).unwrap();
        let layout = chip
            .compute_surface_info(&surface(TileMode::Macro2dThin, 256, 256, 32))
            .unwrap();
        assert_eq!(layout.pitch, 256);
        assert_eq!(layout.surf_size, 256 * 256 * 4);

        let addr = chip
            .addr_from_coord(&AddrFromCoordRequest {
                x: 0,
                y: 0,
                slice: 0,
                sample: 0,
                bpp: 32,
                pitch: layout.pitch,
                height: layout.height,
                num_slices: 1,
                num_samples: 1,
                tile_mode: layout.tile_mode,
                tile_type: layout.tile_type,
                tile_info: layout.tile_info,
                bank_swizzle: 0,
                pipe_swizzle: 0,
            })
            .unwrap();
        assert_eq!(addr.addr, 0);
    }

    #[test]
    fn northern_islands_power_save_round_trip() {
        let chip = Chip::from_config(config(Arch::NorthernIslands, 2, 4, 1024)).unwrap();
        let layout = chip
            .compute_surface_info(&surface(TileMode::PowerSave, 64, 64, 8))
            .unwrap();
        assert_eq!(layout.tile_mode, TileMode::PowerSave);
        assert_eq!(layout.base_align, 2 * 4 * 1024);
        assert_eq!(layout.surf_size % layout.base_align as u64, 0);
        assert_eq!(layout.tile_info, TILE_INFO_NON_MACRO);

        let req = AddrFromCoordRequest {
            x: 33,
            y: 17,
            slice: 0,
            sample: 0,
            bpp: 8,
            pitch: layout.pitch,
            height: layout.height,
            num_slices: 1,
            num_samples: 1,
            tile_mode: TileMode::PowerSave,
            tile_type: TileType::Displayable,
            tile_info: layout.tile_info,
            bank_swizzle: 0,
            pipe_swizzle: 0,
        };
        let addr = chip.addr_from_coord(&req).unwrap();
        assert_eq!(addr.bit_position, 0);
        assert!(addr.addr < layout.surf_size);

        let coord = chip
            .coord_from_addr(&CoordFromAddrRequest {
                addr: addr.addr,
                bit_position: 0,
                bpp: 8,
                pitch: layout.pitch,
                height: layout.height,
                num_slices: 1,
                num_samples: 1,
                tile_mode: TileMode::PowerSave,
                tile_type: TileType::Displayable,
                tile_info: layout.tile_info,
                bank_swizzle: 0,
                pipe_swizzle: 0,
            })
            .unwrap();
        assert_eq!((coord.x, coord.y, coord.slice, coord.sample), (33, 17, 0, 0));
    }

    #[test]
    fn power_save_rejects_multisample() {
        let chip = Chip::from_config(config(Arch::NorthernIslands, 2, 4, 1024)).unwrap();
        let mut req = surface(TileMode::PowerSave, 64, 64, 8);
        req.num_samples = 4;
        assert!(chip.compute_surface_info(&req).is_err());
    }
}
