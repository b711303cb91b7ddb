//! Compiler passes rewriting a protocol before it is proved.
//!
//! A pass receives the same [crate::compiled::Builder] surface as the
//! definer and must leave all per-round registries mutually consistent.

pub mod dummy;
