//! Framing layer: turns an unstructured byte stream into complete frames.
//! Everything in here is transport-agnostic.

pub mod frame_assembler;

pub use frame_assembler::{FeedResult, Frame, FrameAssembler};
