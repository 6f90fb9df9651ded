//! # Build Backend Tests




/// openocd load and flash.
pub mod programmer;
