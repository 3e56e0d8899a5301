//! Array Module
//!
//! Singly linked lists of fixed-capacity value arrays.
//!
//! ## Layout
//! ```text
//!   head                         node 2
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │ length = n           │     │ length (unused)      │
//! │ values[32]           │     │ values[32]           │
//! │ first = head         │     │ first = head         │
//! │ next ────────────────┼────►│ next = 0             │
//! └──────────────────────┘     └──────────────────────┘
//! ```
//! Free slots hold the value type's empty value and are refilled by later
//! adds; removal never compacts.

mod processor;

pub use processor::ArrayProcessor;
