//! Audio capture side
//!
//! This module provides:
//! - Sample spec validation and frame sizing
//! - The shared [`AudioFrame`] buffer
//! - The [`FrameSource`] trait with reader and `parec` implementations

pub mod frame;
pub mod parec;
pub mod source;
pub mod spec;

pub use frame::AudioFrame;
pub use parec::ParecSource;
pub use source::{FrameSource, ReaderSource};
pub use spec::{FrameLayout, SampleFormat, SampleSpec};
