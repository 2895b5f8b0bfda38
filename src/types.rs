// ─── Type Indices ───────────────────────────────────────────────────────────

/// Number of entries in the primitive encoder table. Record type indices
/// start here.
pub const PRIMITIVE_COUNT: usize = 14;
pub const FIRST_RECORD_INDEX: u32 = PRIMITIVE_COUNT as u32;

// ─── Binary Layout ──────────────────────────────────────────────────────────
//
//  ┌──────────────────────────────────────────────┐
//  │ Header (8 bytes)                             │
//  │   type_word:  u32 (LE)                       │
//  │     bit 31 set   → top-level value is array  │
//  │     bits 0..31   → terminal type index       │
//  │   depth_word: u32 (LE)  array nesting depth  │
//  │                         (0 for non-arrays)   │
//  ├──────────────────────────────────────────────┤
//  │ Payload (variable)                           │
//  └──────────────────────────────────────────────┘
//
//  Array payload:
//  ┌──────────────────────────────────────────────┐
//  │ count: u32 (LE)                              │
//  │ offsets: [u32; count]   only if dynamic elem │
//  │ nulls: [u8; ⌈count/8⌉]  only if nullable     │
//  │   (else padding to elem width, numeric only) │
//  │ elements, packed                             │
//  └──────────────────────────────────────────────┘
//
//  Record payload:
//  ┌──────────────────────────────────────────────┐
//  │ fixed fields at cumulative declared offsets  │
//  │ nulls: [u8; ⌈nullable/8⌉]                    │
//  │ offsets: [u32; dynamic]  relative to marker  │
//  │ marker → dynamic fields in declared order    │
//  └──────────────────────────────────────────────┘

pub const HEADER_SIZE: usize = 8;
pub const ARRAY_FLAG: u32 = 1 << 31;
pub const LENGTH_SIZE: usize = 4;
pub const OFFSET_SIZE: usize = 4;

pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;
pub const MIN_INITIAL_CAPACITY: usize = 16;
pub const DEFAULT_RECORD_RESERVE: usize = 999;

/// Bytes needed for a presence bitmap covering `count` slots.
#[inline]
pub const fn bitmap_len(count: usize) -> usize {
    count.div_ceil(8)
}
