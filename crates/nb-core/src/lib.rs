//! NanoBrain cognitive kernel.
//!
//! A mutable hypergraph of atoms and links carrying probabilistic truth and
//! attention values, an attention economy that decays and spreads importance
//! along links, a golden-ratio prime encoder with its Phase Prime Metric, the
//! Time Crystal Transform built on it, and a depth-bounded tree of kernels
//! (the Garden of Gardens) whose metrics fold upward.
//!
//! Zero I/O: the engine never logs or prints. Hosts own transport,
//! configuration files and presentation.

pub mod atom_type;
pub mod atomspace;
pub mod attention;
pub mod config;
pub mod constants;
pub mod error;
pub mod gog;
pub mod kernel;
pub mod ppm;
pub mod scoring;
pub mod tct;
pub mod truth;

pub use atom_type::{AtomType, TypeKind, TypeRegistry};
pub use atomspace::{Atom, AtomSpace, Handle, Link};
pub use attention::{AttentionEconomy, AttentionStats, AttentionValue};
pub use config::{AttentionConfig, GOGConfig, TCTransformConfig, TimeCrystalConfig, UnifiedConfig};
pub use constants::{
    DEFAULT_DIMENSIONS, EPSILON, FUNDAMENTAL_PRIMES, NEUTRAL_COHERENCE, PHI, PI, VERSION,
    constants,
};
pub use error::{NanoBrainError, Result};
pub use gog::{GardenId, GardenInfo, GardenOfGardens, GogMetrics, PetalId, ResonantPair};
pub use kernel::{KernelMetrics, LifecycleState, UnifiedKernel};
pub use ppm::{compute_ppm_coherence, prime_consistency, prime_encode, prime_importance, resonance_frequency};
pub use scoring::{ActivitySnapshot, CoherenceScorer, CoherenceScores, EntropyPrimeScorer};
pub use tct::{TCTransformEngine, TCTransformResult};
pub use truth::{RevisionRule, TruthValue, TruthValueEngine};
