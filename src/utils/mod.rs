//! Utility functions
//!
//! Provides logging setup and level handling.

pub mod logging;
