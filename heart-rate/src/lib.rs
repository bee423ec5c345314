//! # Heart Rate
//!
//! Extracts a heart rate from a stream of camera frames of an illuminated fingertip or face
//! (photoplethysmography). Each frame is reduced to its mean colour; the red channel is
//! bandpass filtered and pushed into a sliding history window. Every tick the window is
//! searched for its dominant frequency, giving a beats-per-minute estimate, and its
//! trailing portion is tested for a rising threshold crossing, giving discrete beats.
//!
//! The [Pipeline](pipeline::Pipeline) runs these stages once per frame, strictly in order.
//! Outputs are handed to consumers through a non-blocking [delivery] channel.
pub mod delivery;
pub mod detectors;
pub mod filter;
pub mod frame;
pub mod history;
pub mod parameters;
pub mod pipeline;
pub mod source;
pub mod spectrum;
