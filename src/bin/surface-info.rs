// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use tessera_addr::{Chip, ChipImpl, SurfaceFlags, SurfaceRequest, TileInfoSpec, TileMode, TileType};
use tessera_core::Arch;

/// Print the padded layout of a tiled surface.
#[derive(Parser)]
struct Cmd {
    /// Chip generation (evergreen or northern-islands)
    #[arg(long, default_value = "northern-islands")]
    arch: String,

    /// Raw GB_ADDR_CONFIG register value (hex accepted)
    #[arg(long, default_value = "0x10000002")]
    gb_addr_config: String,

    /// Raw bank count register field
    #[arg(long, default_value_t = 0)]
    bank_field: u32,

    /// Raw rank count register field
    #[arg(long, default_value_t = 0)]
    rank_field: u32,

    #[arg(long)]
    width: u32,

    #[arg(long)]
    height: u32,

    #[arg(long, default_value_t = 32)]
    bpp: u32,

    /// linear, linear-aligned, 1d, 1d-thick, 2d, 2d-thick, 2d-xthick,
    /// 3d, 3d-thick, 3d-xthick or power-save
    #[arg(long, default_value = "2d")]
    tile_mode: String,

    #[arg(long, default_value_t = 1)]
    samples: u32,

    #[arg(long, default_value_t = 1)]
    slices: u32,

    #[arg(long, default_value_t = 0)]
    mip_level: u32,

    /// Surface is scanned out by the display engine
    #[arg(long)]
    display: bool,

    /// Depth surface instead of a color buffer
    #[arg(long)]
    depth: bool,
}

fn parse_tile_mode(value: &str) -> Option<TileMode> {
    Some(match value {
        "linear" => TileMode::LinearGeneral,
        "linear-aligned" => TileMode::LinearAligned,
        "1d" => TileMode::Micro1dThin,
        "1d-thick" => TileMode::Micro1dThick,
        "2d" => TileMode::Macro2dThin,
        "2d-thick" => TileMode::Macro2dThick,
        "2d-xthick" => TileMode::Macro2dXThick,
        "3d" => TileMode::Macro3dThin,
        "3d-thick" => TileMode::Macro3dThick,
        "3d-xthick" => TileMode::Macro3dXThick,
        "power-save" => TileMode::PowerSave,
        _ => return None,
    })
}

fn parse_u32(value: &str) -> Result<u32, std::num::ParseIntError> {
    if let Some(hex) = value.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        value.parse()
    }
}

fn main() {
    let cmd = Cmd::parse();

    let arch: Arch = cmd.arch.parse().expect("unrecognized arch");
    let gb_addr_config = parse_u32(&cmd.gb_addr_config).expect("invalid gb-addr-config");
    let tile_mode = parse_tile_mode(&cmd.tile_mode).expect("unrecognized tile mode");

    let chip = Chip::open(arch, gb_addr_config, cmd.bank_field, cmd.rank_field)
        .expect("failed to decode chip configuration");

    let request = SurfaceRequest {
        width: cmd.width,
        height: cmd.height,
        num_slices: cmd.slices,
        num_samples: cmd.samples,
        bpp: cmd.bpp,
        mip_level: cmd.mip_level,
        tile_mode,
        tile_type: TileType::Displayable,
        flags: SurfaceFlags {
            color: !cmd.depth,
            depth: cmd.depth,
            display: cmd.display,
            ..Default::default()
        },
        tile_info: TileInfoSpec::default(),
    };

    match chip.compute_surface_info(&request) {
        Ok(layout) => {
            println!("tile mode:    {:?}", layout.tile_mode);
            println!("tile type:    {:?}", layout.tile_type);
            println!("pitch:        {} ({} align)", layout.pitch, layout.pitch_align);
            println!("height:       {} ({} align)", layout.height, layout.height_align);
            println!("depth:        {} ({} align)", layout.depth, layout.depth_align);
            println!("size:         {} bytes ({} align)", layout.surf_size, layout.base_align);
            println!(
                "macro tile:   {} banks, bank {}x{}, aspect {}, split {}",
                layout.tile_info.banks,
                layout.tile_info.bank_width,
                layout.tile_info.bank_height,
                layout.tile_info.macro_aspect_ratio,
                layout.tile_info.tile_split_bytes
            );
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
