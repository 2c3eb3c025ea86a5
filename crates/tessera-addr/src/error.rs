// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

use tessera_core::Arch;
use thiserror::Error;

#[derive(Debug)]
pub struct BtWrapper(pub std::backtrace::Backtrace);

impl BtWrapper {
    #[inline(always)]
    pub fn capture() -> Self {
        Self(std::backtrace::Backtrace::capture())
    }
}

impl Display for BtWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let std::backtrace::BacktraceStatus::Captured = self.0.status() {
            self.0.fmt(f)?;
        }
        Ok(())
    }
}

/// An unrecognized enumerant in one of the raw configuration registers.
/// These are fatal, nothing downstream can run with a partially decoded
/// configuration.
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unrecognized pipe count field (0x{0:x})")]
    NumPipes(u32),
    #[error("unrecognized pipe interleave field (0x{0:x})")]
    PipeInterleave(u32),
    #[error("unrecognized row size field (0x{0:x})")]
    RowSize(u32),
    #[error("unrecognized bank interleave field (0x{0:x})")]
    BankInterleave(u32),
    #[error("unrecognized shader engine count field (0x{0:x})")]
    ShaderEngines(u32),
    #[error("unrecognized shader engine tile size field (0x{0:x})")]
    ShaderEngineTileSize(u32),
    #[error("unrecognized bank count field (0x{0:x})")]
    Banks(u32),
    #[error("unrecognized rank count field (0x{0:x})")]
    Ranks(u32),
    #[error("{banks} banks x {ranks} ranks exceeds the 16 logical bank limit")]
    TooManyLogicalBanks { banks: u32, ranks: u32 },
    #[error("{lower_pipes} lower pipes but only {pipes} pipes")]
    LowerPipesExceedPipes { lower_pipes: u32, pipes: u32 },
}

#[derive(Error, Debug)]
pub enum AddrError {
    #[error("Tried to address a chip with the wrong architecture, expected {expected:?} but got {actual:?}\n{backtrace}")]
    WrongChipArch {
        actual: Arch,
        expected: Arch,
        backtrace: BtWrapper,
    },

    #[error("unsupported request: {0}\n{1}")]
    UnsupportedRequest(String, BtWrapper),

    #[error("unhandled case: {0}\n{1}")]
    UnhandledCase(String, BtWrapper),

    #[error("invalid {name}: {value}")]
    InvalidDimension { name: &'static str, value: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AddrError {
    #[inline]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedRequest(msg.into(), BtWrapper::capture())
    }

    #[inline]
    pub fn unhandled(msg: impl Into<String>) -> Self {
        Self::UnhandledCase(msg.into(), BtWrapper::capture())
    }
}
