// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! In-memory layout of display lists as parsed by the device.
//!
//! All structures are described as 32-bit word offsets. The device reads
//! them through DMA, so the host writes them word by word into the
//! device-visible arena.
//!
//! # Body
//!
//! A body is an array of entries, each entry one register write:
//!
//! ```text
//! +--------+--------+--------+--------+----
//! | addr 0 | data 0 | addr 1 | data 1 | ...
//! +--------+--------+--------+--------+----
//! ```
//!
//! # Header
//!
//! ```text
//! word 0        num_lists (number of bodies minus one)
//! word 1 + 2*i  num_bytes of body i
//! word 2 + 2*i  address of body i             (i < HEADER_LISTS)
//! word 17       next header address
//! word 18       flags (AUTO_START, INT_ENABLE)
//! --- extended header only ---
//! word 19       padding
//! word 20       pre-command count (low half) | extended flags (high half)
//! word 21       pre-command list address
//! word 22       post-command count
//! word 23       post-command list address
//! ```

/// Size of one body entry in bytes.
pub const ENTRY_SIZE: usize = 8;

/// Size of one body entry in 32-bit words.
pub const ENTRY_WORDS: usize = ENTRY_SIZE / 4;

/// Default number of entries per display list body.
pub const DL_NUM_ENTRIES: usize = 256;

/// Maximum number of bodies a single header can reference.
pub const HEADER_LISTS: usize = 8;

/// Header word holding the number of bodies minus one.
pub const HDR_NUM_LISTS: usize = 0;

/// Header word holding the byte size of body `list`.
#[must_use]
pub const fn hdr_list_num_bytes(list: usize) -> usize {
    1 + 2 * list
}

/// Header word holding the address of body `list`.
#[must_use]
pub const fn hdr_list_addr(list: usize) -> usize {
    2 + 2 * list
}

/// Header word holding the next header address.
pub const HDR_NEXT_HEADER: usize = 1 + 2 * HEADER_LISTS;

/// Header word holding the header flags.
pub const HDR_FLAGS: usize = HDR_NEXT_HEADER + 1;

/// Number of words in a plain header.
pub const HEADER_WORDS: usize = HDR_FLAGS + 1;

/// Extended header word holding the pre-command count and extended flags.
pub const HDR_EXT_CMD: usize = HEADER_WORDS + 1;

/// Extended header word holding the pre-command list address.
pub const HDR_EXT_PRE_PLIST: usize = HEADER_WORDS + 2;

/// Extended header word holding the post-command count.
pub const HDR_EXT_POST_NUM: usize = HEADER_WORDS + 3;

/// Extended header word holding the post-command list address.
pub const HDR_EXT_POST_PLIST: usize = HEADER_WORDS + 4;

/// Number of words in an extended header.
pub const HEADER_EXT_WORDS: usize = HEADER_WORDS + 5;

/// Start processing the next list without waiting for software.
pub const DLH_AUTO_START: u32 = 1 << 0;

/// Raise the frame end interrupt when this list completes.
pub const DLH_INT_ENABLE: u32 = 1 << 1;

/// Execute the pre-commands before this list (extended flags).
pub const DLH_EXT_PRE_CMD_EXEC: u32 = 1 << 9;

/// Execute the post-commands after this list (extended flags).
pub const DLH_EXT_POST_CMD_EXEC: u32 = 1 << 8;

/// Space reserved behind a body for its header, in bytes.
///
/// Rounded up to the 8-byte alignment the device requires for headers.
#[must_use]
pub const fn header_size(extended: bool) -> usize {
    let words = if extended { HEADER_EXT_WORDS } else { HEADER_WORDS };
    (words * 4 + 7) & !7
}

// =============================================================================
// Extended commands
// =============================================================================

/// Words in one extended command header.
///
/// ```text
/// word 0  opcode
/// word 1  flags
/// word 2  address of the command data
/// word 3  reserved
/// ```
pub const EXT_CMD_WORDS: usize = 4;

/// Extended command header word: opcode.
pub const EXT_CMD_OPCODE: usize = 0;
/// Extended command header word: flags.
pub const EXT_CMD_FLAGS: usize = 1;
/// Extended command header word: data address.
pub const EXT_CMD_ADDRESS_SET: usize = 2;
/// Extended command header word: reserved.
pub const EXT_CMD_RESERVED: usize = 3;

/// Auto-field command: re-latch source addresses per field.
pub const EXTCMD_AUTOFLD: u32 = 0x32;

/// Auto-field command: raise an interrupt per field.
pub const AUTOFLD_INT: u32 = 1 << 0;

/// Auto-field command: enable re-latching for input `input`.
#[must_use]
pub const fn autofld_input_enable(input: usize) -> u32 {
    1 << (16 + input)
}

/// Inputs an auto-field command can describe.
pub const AUTOFLD_INPUTS: usize = 5;

/// Words of auto-field data per input.
///
/// ```text
/// word 0  top field Y     word 1  bottom field Y
/// word 2  top field C0    word 3  bottom field C0
/// word 4  top field C1    word 5  bottom field C1
/// word 6  reserved        word 7  reserved
/// ```
pub const AUTOFLD_INPUT_WORDS: usize = 8;

/// Words of data carried by one auto-field command.
pub const AUTOFLD_DATA_WORDS: usize = AUTOFLD_INPUTS * AUTOFLD_INPUT_WORDS;
