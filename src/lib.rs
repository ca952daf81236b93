//! Launches the containerized text-feature preprocessing step for idiom
//! annotation data: resolve host paths, prepare the output directory, and run
//! the image with the four bind mounts it expects.

pub mod cli;
pub mod config;
pub mod docker;
pub mod paths;
pub mod pipeline;
