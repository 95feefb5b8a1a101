//! # Subbuteo Development Tools
//!
//! Command-line tools for development:
//! - Rules, scenario and snapshot validators
//! - Default rules template

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod validate;
