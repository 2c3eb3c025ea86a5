// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0
#![crate_type = "lib"]

pub use tessera_addr;
pub use tessera_core;

pub use tessera_addr::{Chip, ChipImpl};
pub use tessera_core::Arch;
