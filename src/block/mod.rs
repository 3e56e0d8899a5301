//! Block Module
//!
//! Fixed-size file regions holding a usage bitmap and an array of
//! fixed-size records.
//!
//! ## Responsibilities
//! - Compute how many records of a given size fit in a block
//! - Allocate and free record slots through the bitmap
//! - Keep `UsedCount` equal to the bitmap's population count
//! - Group blocks by record type (`TypeDirectory`)
//!
//! ## Block Format
//! ```text
//! ┌──────────────┬──────────────────────┬──────────────────────────────┐
//! │UsedCount (4) │ Bitmap ⌈count/8⌉     │ Records: count × record_size │
//! └──────────────┴──────────────────────┴──────────────────────────────┘
//!   bit i (byte i/8, LSB first) set ⇔ record i is allocated
//! ```

mod allocator;
mod directory;
mod layout;

pub use allocator::Block;
pub use directory::{BlockDirectory, TypeDirectory};
pub use layout::{BlockLayout, USED_COUNT_SIZE};
