#![warn(
    // Warnings rather than hard errors so that downstream experiments can still build while a
    // lint is being looked at; CI runs clippy with `-D warnings`.
    clippy::pedantic,
    missing_docs,
)]
//! Shared building blocks for the lanecut crates: logging setup, the typed error model and the
//! default constants of the travel-time model.

pub mod constants;
pub mod errors;
pub mod logging;

pub use errors::{
    LaneError,
    LaneResult,
};
