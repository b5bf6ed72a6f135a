//! # graphcodec
//!
//! Command-line front end for `graphcodec-core`: configuration loading and
//! the commands that read, check and convert documents on disk.

pub mod cli;
pub mod config;
