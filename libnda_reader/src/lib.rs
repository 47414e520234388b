//! # nda_reader
//!
//! nda_reader decodes the binary `.nda` files written by Neware battery cyclers, written in
//! Rust. It turns the fixed-width records of one or more files into time ordered record
//! tables, groups the records into steps and cycles, and summarizes each step and cycle.
//! Several files recorded for the same test unit can be merged into a single timeline.
//!
//! ## Installation
//!
//! The only method of install is from source, which is laid out below.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./nda_reader_cli` from the top
//! level nda_reader repository. The binary is installed to your cargo install location
//! (typically something like `~/.cargo/bin/`) and can be removed with
//! `cargo uninstall nda_reader_cli`.
//!
//! ## Configuration
//!
//! A run of nda_reader is described by a YAML configuration file. A template can be made
//! with `nda_reader_cli -p config.yml new`. The format is as follows:
//!
//! ```yml
//! file_paths: []
//! active_mass_g: null
//! design_capacity_ah: null
//! rated_capacity_ah: null
//! voltage_upper_limit: null
//! voltage_lower_limit: null
//! merge: false
//! add_cycle_to_records: true
//! step_boundary: MergeAcrossFiles
//! summary_path: null
//! n_threads: 1
//! ```
//!
//! - file_paths: The `.nda` files of one test unit, in load order
//! - active_mass_g, design_capacity_ah, rated_capacity_ah, voltage_upper_limit,
//! voltage_lower_limit: Cell parameters. A `null` or zero value is replaced by what was
//! decoded from the last file in the list (header mass, largest discharge capacity, and
//! the observed voltage range).
//! - merge: Merge all files into an extra `merged_data` entry. Refused if any file failed
//! to decode.
//! - add_cycle_to_records: Copy the cycle of each step onto its records
//! - step_boundary: `MergeAcrossFiles` lets a step continue from the end of one file into
//! the next when the step method is unchanged. `SplitAtFileBoundary` always starts a new
//! step at a new file.
//! - summary_path: If set, a YAML summary of the metadata and cycle table of every entry is
//! written here
//! - n_threads: The number of parallel worker threads to divide the files amongst. Only
//! the threads that would do work are created. Must be at least 1.
//!
//! ## Output
//!
//! Every entry of a [`dataset::Dataset`] (one per decoded file, plus `merged_data`) exposes
//! the following tables by name:
//!
//! ```text
//! meta_data  - header fields, capacity_max_Ah, voltage_upper_limit, voltage_lower_limit
//! raw_data   - primary records
//! auxt_data  - auxiliary (temperature) records, if the file has any
//! step_data  - one row per step
//! cycle_data - one row per cycle
//! ```
//!
//! All tables implement `serde::Serialize`.
pub mod config;
pub mod constants;
pub mod cycle;
pub mod dataset;
pub mod error;
pub mod header;
pub mod merge;
pub mod nda_file;
pub mod process;
pub mod record;
pub mod scale;
pub mod step;
pub mod stream;
pub mod worker_status;

#[cfg(test)]
mod fixtures;
