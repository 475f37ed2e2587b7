#![no_std]
#![deny(warnings)]

pub use miden_base::*;
pub use miden_base_macros::{component, export_type, generate, note, note_script, tx_script};
pub use miden_base_sys::bindings::*;
/// Unified `Felt` and related helpers.
pub use miden_field as felt;
/// Felt representation helpers.
pub use miden_field_repr as felt_repr;
pub use miden_sdk_alloc::BumpAlloc;
pub use miden_stdlib_sys::*;
// Re-export since `wit_bindgen::generate!` is used in `generate!`
pub use wit_bindgen;
