// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Hash, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    Evergreen,
    NorthernIslands,
}

impl Default for Arch {
    fn default() -> Self {
        Self::Evergreen
    }
}

impl Arch {
    pub fn is_evergreen(&self) -> bool {
        matches!(self, Arch::Evergreen)
    }

    pub fn is_northern_islands(&self) -> bool {
        matches!(self, Arch::NorthernIslands)
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "evergreen" => Ok(Arch::Evergreen),
            "northern-islands" => Ok(Arch::NorthernIslands),
            err => Err(err.to_string()),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::Evergreen => write!(f, "Evergreen"),
            Arch::NorthernIslands => write!(f, "NorthernIslands"),
        }
    }
}
