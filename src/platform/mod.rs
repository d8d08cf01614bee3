//! Platform resolution
//!
//! This module maps the raw operating system and architecture identifiers a
//! host reports onto the closed set of platforms that have release assets.

mod detection;

pub use detection::{Arch, Os, PlatformKey, RawHost, resolve};
