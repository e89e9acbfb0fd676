// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the DMA address type.

use super::DmaAddr;

#[test]
fn null_address() {
    assert!(DmaAddr::null().is_null());
    assert!(!DmaAddr::new(0x1000).is_null());
}

#[test]
fn offset_and_diff() {
    let base = DmaAddr::new(0x5800_0000);
    let addr = base + 0x840;
    assert_eq!(addr.as_u64(), 0x5800_0840);
    assert_eq!(addr.diff(base), 0x840);
}

#[test]
fn register_value_truncates_to_low_word() {
    assert_eq!(DmaAddr::new(0x1_2345_6789).as_reg(), 0x2345_6789);
}

#[test]
fn alignment() {
    assert_eq!(DmaAddr::new(0x1008).is_aligned(8), Some(true));
    assert_eq!(DmaAddr::new(0x1004).is_aligned(8), Some(false));
    assert_eq!(DmaAddr::new(0x1000).is_aligned(3), None);
}

#[test]
fn debug_format_is_hex() {
    assert_eq!(std::format!("{:?}", DmaAddr::new(0xff)), "DmaAddr(0xff)");
    assert_eq!(std::format!("{}", DmaAddr::new(0xff)), "0xff");
}
