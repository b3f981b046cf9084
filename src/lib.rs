//! archive-files: bundles files and directories into a zip archive.
//!
//! This crate provides the archiving engine, the external cipher gateway and
//! the pipeline that encrypts, relocates and cleans up the resulting archive.

pub mod archiver;
pub mod cipher;
pub mod commands;
pub mod config;
pub mod constants;
pub mod duration;
mod error;
pub mod logger;
pub mod path_filter;
pub mod path_util;
pub mod pipeline;

pub use error::{Error, Result};
