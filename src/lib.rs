//! Tallies hand-marked bubbles on scanned answer forms.
//!
//! A coordinates file locates every bubble. Each scan is binarized, the square
//! around each bubble is classified as blank, shaded or crossed out, and the
//! shaded bubbles are counted per answer choice.

pub mod classify;
pub mod coordinates;
pub mod debug;
pub mod form;
pub mod geometry;
pub mod image_utils;
pub mod interpret;
pub mod marks;
pub mod report;
pub mod statistics;
pub mod types;
