//! `sandbox-perception` – geometry on top of raw tag detections.
//!
//! # Modules
//!
//! - [`tag_frame`] – rotates a tag's camera-relative offset by the vehicle
//!   heading and corrects for the camera tilt.

pub mod tag_frame;

pub use tag_frame::{DerivedPosition, TagFrame};
