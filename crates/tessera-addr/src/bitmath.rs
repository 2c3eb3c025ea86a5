// SPDX-FileCopyrightText: © 2023 Tenstorrent Inc.
// SPDX-License-Identifier: Apache-2.0

//! Small bit manipulation helpers shared by the layout and addressing code.

pub(crate) fn bits_to_bytes(bits: u32) -> u32 {
    (bits + 7) >> 3
}

pub(crate) fn bits_to_bytes64(bits: u64) -> u64 {
    (bits + 7) >> 3
}

/// Smallest power of two >= `v`, with `next_pow2(0) == 1`.
pub(crate) fn next_pow2(v: u32) -> u32 {
    let mut out = 1;
    while v > out {
        out <<= 1;
    }
    out
}

pub(crate) fn is_pow2(v: u32) -> bool {
    v != 0 && (v & (v - 1)) == 0
}

/// Round `x` up to a multiple of `align`. `align` must be a power of two.
pub(crate) fn pow_two_align(x: u32, align: u32) -> u32 {
    (x + align - 1) & !(align - 1)
}

/// Floor log2; only meaningful for power of two inputs here.
pub(crate) fn log2(v: u32) -> u32 {
    31 - v.leading_zeros()
}

pub(crate) fn bit(v: u32, b: u32) -> u32 {
    (v >> b) & 1
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn next_pow2_rounds_up() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(3), 4);
        assert_eq!(next_pow2(64), 64);
        assert_eq!(next_pow2(65), 128);
    }

    #[test]
    fn pow_two_align_rounds_up() {
        assert_eq!(pow_two_align(0, 8), 0);
        assert_eq!(pow_two_align(1, 8), 8);
        assert_eq!(pow_two_align(8, 8), 8);
        assert_eq!(pow_two_align(100, 32), 128);
    }

    #[test]
    fn bits_to_bytes_rounds_up() {
        assert_eq!(bits_to_bytes(1), 1);
        assert_eq!(bits_to_bytes(8), 1);
        assert_eq!(bits_to_bytes(9), 2);
    }
}
