//! Row structs for the update tables.
//!
//! Each struct derives `FromRow` and mirrors one SELECT shape. Conversion into
//! the domain types in `relflow_core::model` happens here so repositories only
//! deal with rows.

pub mod release;
pub mod update;
