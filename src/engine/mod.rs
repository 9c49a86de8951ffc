//! Derivations from the original dataset to drawable geometry.
//!
//! Every stage is a synchronous function of its inputs and is recomputed on
//! demand:
//!
//! | Stage | Input | Output |
//! |-------|-------|--------|
//! | [`modification::derive`] | original dataset, modification list, contig order | working dataset |
//! | [`visibility::compute_allowed`] | working dataset, workspace, settings | allowed set + per-contig status |
//! | [`layout::compute_layout`] | working dataset, allowed set, contig order, viewport | scales, offsets, ticks |
//! | [`frame::build_frame`] | all of the above | one [`frame::Frame`] for the renderer |
//!
//! [`modification::ModificationEngine`] caches derived datasets keyed by an
//! MD5 fingerprint of the modification list and contig order.

pub mod frame;
pub mod layout;
pub mod modification;
pub mod visibility;
