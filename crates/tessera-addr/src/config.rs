// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

//! Decoded memory controller configuration.
//!
//! The raw `GB_ADDR_CONFIG` register plus the bank/rank fields from the
//! memory controller are decoded exactly once, at startup, into a
//! [`ChipConfig`]. Every field is a closed enumeration; a value outside the
//! enumeration is a fatal [`ConfigError`], never a guess.

use tessera_core::Arch;

use crate::error::ConfigError;

/// Raw layout of the `GB_ADDR_CONFIG` register.
#[bitfield_struct::bitfield(u32)]
pub struct GbAddrConfig {
    #[bits(3)]
    pub num_pipes: u8,
    #[bits(1)]
    _pad0: u8,
    #[bits(3)]
    pub pipe_interleave_size: u8,
    #[bits(1)]
    _pad1: u8,
    #[bits(3)]
    pub bank_interleave_size: u8,
    #[bits(1)]
    _pad2: u8,
    #[bits(2)]
    pub num_shader_engines: u8,
    #[bits(2)]
    _pad3: u8,
    #[bits(3)]
    pub shader_engine_tile_size: u8,
    #[bits(1)]
    _pad4: u8,
    #[bits(3)]
    pub num_gpus: u8,
    #[bits(1)]
    _pad5: u8,
    #[bits(2)]
    pub multi_gpu_tile_size: u8,
    #[bits(2)]
    _pad6: u8,
    #[bits(2)]
    pub row_size: u8,
    #[bits(1)]
    pub num_lower_pipes: u8,
    #[bits(1)]
    _pad7: u8,
}

/// Immutable, fully decoded addressing configuration for one chip.
///
/// All counts are in their natural units (pipes, banks, bytes), not the raw
/// register encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChipConfig {
    pub arch: Arch,
    pub pipes: u32,
    pub banks: u32,
    pub ranks: u32,
    /// `banks * ranks`, the number of banks the hashers actually see.
    pub logical_banks: u32,
    pub row_size: u32,
    pub pipe_interleave_bytes: u32,
    pub bank_interleave: u32,
    pub shader_engines: u32,
    pub shader_engine_tile_size: u32,
    pub lower_pipes: u32,
    pub max_samples: u32,
}

impl ChipConfig {
    /// Decode the raw register values.
    ///
    /// `bank_field` and `rank_field` are the raw bank/rank count fields from
    /// the memory controller configuration.
    pub fn decode(
        arch: Arch,
        gb_addr_config: u32,
        bank_field: u32,
        rank_field: u32,
    ) -> Result<Self, ConfigError> {
        let reg = GbAddrConfig::from(gb_addr_config);

        let pipes = match reg.num_pipes() {
            0 => 1,
            1 => 2,
            2 => 4,
            3 => 8,
            other => return Err(ConfigError::NumPipes(other as u32)),
        };

        let pipe_interleave_bytes = match reg.pipe_interleave_size() {
            0 => 256,
            1 => 512,
            other => return Err(ConfigError::PipeInterleave(other as u32)),
        };

        let row_size = match reg.row_size() {
            0 => 1024,
            1 => 2048,
            2 => 4096,
            other => return Err(ConfigError::RowSize(other as u32)),
        };

        let bank_interleave = match reg.bank_interleave_size() {
            0 => 1,
            1 => 2,
            2 => 4,
            3 => 8,
            other => return Err(ConfigError::BankInterleave(other as u32)),
        };

        let shader_engines = match reg.num_shader_engines() {
            0 => 1,
            1 => 2,
            other => return Err(ConfigError::ShaderEngines(other as u32)),
        };

        let shader_engine_tile_size = match reg.shader_engine_tile_size() {
            0 => 16,
            1 => 32,
            other => return Err(ConfigError::ShaderEngineTileSize(other as u32)),
        };

        let lower_pipes = match reg.num_lower_pipes() {
            0 => 1,
            _ => 2,
        };

        let banks = match bank_field {
            0 => 4,
            1 => 8,
            2 => 16,
            other => return Err(ConfigError::Banks(other)),
        };

        let ranks = match rank_field {
            0 => 1,
            1 => 2,
            other => return Err(ConfigError::Ranks(other)),
        };

        let logical_banks = banks * ranks;
        if logical_banks > 16 {
            return Err(ConfigError::TooManyLogicalBanks { banks, ranks });
        }

        if arch.is_northern_islands() && lower_pipes > pipes {
            return Err(ConfigError::LowerPipesExceedPipes { lower_pipes, pipes });
        }

        let max_samples = if arch.is_northern_islands() { 16 } else { 8 };

        tracing::debug!(
            "decoded addressing config for {arch}: {pipes} pipes, {banks} banks x {ranks} ranks, \
             {row_size}B rows, {pipe_interleave_bytes}B pipe interleave"
        );

        Ok(ChipConfig {
            arch,
            pipes,
            banks,
            ranks,
            logical_banks,
            row_size,
            pipe_interleave_bytes,
            bank_interleave,
            shader_engines,
            shader_engine_tile_size,
            lower_pipes,
            max_samples,
        })
    }
}
