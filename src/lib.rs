//! Pixel-difference scoring for bee aggregation experiments in CASU arenas.
//!
//! An arena is filmed from above with one region-of-interest mask per CASU.
//! For each video frame, [`compare_frames`] counts the pixels in every ROI
//! that differ from a bee-free background frame (bee presence) and from a
//! frame a fixed number of steps earlier (bee movement), producing one flat
//! [`Row`] of counts. [`compute`] then reduces a sequence of rows into a
//! single integer score using one of six named scoring functions, selected
//! by the `image_processing_function` key of the [`Config`].
//!
//! The score is consumed as a fitness value by an evolutionary algorithm,
//! or directly by offline analysis tools. This crate owns neither the
//! driver loop nor the video files; it only measures.

pub mod compare;
pub mod config;
pub mod score;

pub use compare::{compare_frames, region_pixel_diff, CompareError, Row, NO_PREVIOUS_FRAME};
pub use config::{Config, ConfigError};
pub use score::{compute, ScoreError, ScoreKind, Unit};
