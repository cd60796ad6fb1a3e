//! Host-side assembly for nb-core: configuration files, seed files and the
//! logging that the engine itself never does.

pub mod config;
pub mod error;
pub mod runtime;
pub mod seed;

pub use config::{CONFIG_ENV, RuntimeConfig};
pub use error::{Result, RuntimeError};
pub use runtime::{CycleReport, FocusAtom, build_gog, build_kernel, run_kernel};
pub use seed::{SeedAtom, SeedFile, SeedLink, SeedReport, SeedStimulus};
