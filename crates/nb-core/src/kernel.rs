//! Unified kernel: one AtomSpace, one attention economy and the PPM metrics,
//! behind a single per-instance lock.
//!
//! Every mutation takes the write lock, so id allocation and cycle updates
//! are serialized. A cycle's decay, diffusion and metric recomputation happen
//! under one write guard, so readers never observe half a cycle.

use std::collections::VecDeque;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};

use crate::atom_type::{AtomType, TypeKind};
use crate::atomspace::{Atom, AtomSpace, Handle, Link};
use crate::attention::{AttentionEconomy, AttentionStats, AttentionValue};
use crate::config::UnifiedConfig;
use crate::constants::FUNDAMENTAL_PRIMES;
use crate::error::{NanoBrainError, Result};
use crate::scoring::{ActivitySnapshot, CoherenceScorer, EntropyPrimeScorer};
use crate::truth::TruthValue;

const SUBJECT: &str = "kernel";

/// Lifecycle of a kernel or garden container. `Shutdown` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Created,
    Active,
    Shutdown,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Active => "active",
            LifecycleState::Shutdown => "shutdown",
        }
    }

    /// Created -> Active. Initializing an active instance is a no-op.
    pub(crate) fn activate(&mut self, subject: &'static str) -> Result<()> {
        match self {
            LifecycleState::Shutdown => Err(NanoBrainError::AlreadyShutdown(subject)),
            _ => {
                *self = LifecycleState::Active;
                Ok(())
            }
        }
    }

    pub(crate) fn shut_down(&mut self, subject: &'static str) -> Result<()> {
        match self {
            LifecycleState::Shutdown => Err(NanoBrainError::AlreadyShutdown(subject)),
            _ => {
                *self = LifecycleState::Shutdown;
                Ok(())
            }
        }
    }

    pub(crate) fn ensure_active(&self, subject: &'static str) -> Result<()> {
        match self {
            LifecycleState::Active => Ok(()),
            _ => Err(NanoBrainError::NotActive(subject)),
        }
    }
}

/// Point-in-time kernel snapshot. Recomputed on every request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelMetrics {
    pub total_atoms: usize,
    pub total_links: usize,
    pub quantum_coherence: f64,
    pub consciousness_emergence: f64,
    pub attention_entropy: f64,
    pub ppm_coherence: f64,
    pub total_attention: f64,
    pub cycles: u64,
    /// `quantum_coherence` meets the configured threshold.
    pub coherent: bool,
}

pub(crate) struct KernelCore {
    state: LifecycleState,
    space: AtomSpace,
    cycles: u64,
    history: VecDeque<KernelMetrics>,
}

pub struct UnifiedKernel {
    config: UnifiedConfig,
    economy: AttentionEconomy,
    scorer: Box<dyn CoherenceScorer>,
    core: RwLock<KernelCore>,
}

impl UnifiedKernel {
    pub fn new(config: UnifiedConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            economy: AttentionEconomy::new(config.attention.clone()),
            scorer: Box::new(EntropyPrimeScorer),
            core: RwLock::new(KernelCore {
                state: LifecycleState::Created,
                space: AtomSpace::with_revision_rule(config.revision_rule),
                cycles: 0,
                history: VecDeque::new(),
            }),
            config,
        })
    }

    /// Replace the scoring function used for the terminal metrics.
    pub fn with_scorer(mut self, scorer: impl CoherenceScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn config(&self) -> &UnifiedConfig {
        &self.config
    }

    pub fn initialize(&self) -> Result<()> {
        self.core.write().state.activate(SUBJECT)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.core.write().state.shut_down(SUBJECT)
    }

    pub fn is_active(&self) -> bool {
        self.core.read().state == LifecycleState::Active
    }

    pub fn state(&self) -> LifecycleState {
        self.core.read().state
    }

    // ------------------------------------------------------------------
    // Atoms and links
    // ------------------------------------------------------------------

    /// Create a node from a type name, granting the configured creation stimulus.
    pub fn create_atom(&self, type_name: &str, name: &str, strength: f64, confidence: f64) -> Result<Handle> {
        let truth = TruthValue::new(strength, confidence)?;
        let mut core = self.core.write();
        core.state.ensure_active(SUBJECT)?;
        let atom_type = core.space.resolve_type(type_name, TypeKind::Node)?;
        self.insert_atom(&mut core, atom_type, name, truth, self.config.creation_stimulus)
    }

    pub fn create_typed_atom(&self, atom_type: AtomType, name: &str, truth: TruthValue) -> Result<Handle> {
        let mut core = self.core.write();
        core.state.ensure_active(SUBJECT)?;
        self.insert_atom(&mut core, atom_type, name, truth, self.config.creation_stimulus)
    }

    fn insert_atom(
        &self,
        core: &mut KernelCore,
        atom_type: AtomType,
        name: &str,
        truth: TruthValue,
        stimulus: f64,
    ) -> Result<Handle> {
        let id = core.space.create_atom(atom_type, name, truth)?;
        if stimulus != 0.0 {
            self.economy.stimulate(&mut core.space, id, stimulus)?;
        }
        Ok(id)
    }

    /// Return the node of this type and name, creating it if absent.
    pub fn ensure_atom(&self, type_name: &str, name: &str, strength: f64, confidence: f64) -> Result<Handle> {
        let truth = TruthValue::new(strength, confidence)?;
        let mut core = self.core.write();
        core.state.ensure_active(SUBJECT)?;
        if let Some(existing) = core.space.types().resolve(type_name)
            && let Some(id) = core
                .space
                .atoms_named(name)
                .into_iter()
                .find(|id| core.space.get_atom(*id).is_ok_and(|a| a.atom_type == existing))
        {
            return Ok(id);
        }
        let atom_type = core.space.resolve_type(type_name, TypeKind::Node)?;
        self.insert_atom(&mut core, atom_type, name, truth, self.config.creation_stimulus)
    }

    pub fn create_link(
        &self,
        type_name: &str,
        outgoing: &[Handle],
        strength: f64,
        confidence: f64,
    ) -> Result<Handle> {
        let truth = TruthValue::new(strength, confidence)?;
        let mut core = self.core.write();
        core.state.ensure_active(SUBJECT)?;
        // Check targets before a new link type can be registered.
        if let Some(missing) = outgoing.iter().find(|h| !core.space.contains(**h)) {
            return Err(NanoBrainError::UnknownAtom(*missing));
        }
        let link_type = core.space.resolve_type(type_name, TypeKind::Link)?;
        core.space.create_link(link_type, outgoing.to_vec(), truth)
    }

    pub fn get_atom(&self, id: Handle) -> Result<Atom> {
        let core = self.core.read();
        core.state.ensure_active(SUBJECT)?;
        core.space.get_atom(id).cloned()
    }

    pub fn get_link(&self, id: Handle) -> Result<Link> {
        let core = self.core.read();
        core.state.ensure_active(SUBJECT)?;
        core.space.get_link(id).cloned()
    }

    /// Remove an atom or link; refused while links still reference it.
    pub fn remove_atom(&self, id: Handle) -> Result<()> {
        let mut core = self.core.write();
        core.state.ensure_active(SUBJECT)?;
        core.space.remove(id)
    }

    /// Remove an atom or link and every link referencing it.
    pub fn remove_recursive(&self, id: Handle) -> Result<Vec<Handle>> {
        let mut core = self.core.write();
        core.state.ensure_active(SUBJECT)?;
        core.space.remove_recursive(id)
    }

    pub fn revise_atom(&self, id: Handle, strength: f64, confidence: f64) -> Result<TruthValue> {
        let evidence = TruthValue::new(strength, confidence)?;
        let mut core = self.core.write();
        core.state.ensure_active(SUBJECT)?;
        core.space.revise_atom(id, &evidence)
    }

    pub fn find_atoms(&self, name: &str) -> Result<Vec<Handle>> {
        let core = self.core.read();
        core.state.ensure_active(SUBJECT)?;
        Ok(core.space.atoms_named(name))
    }

    pub fn atom_ids(&self) -> Result<Vec<Handle>> {
        let core = self.core.read();
        core.state.ensure_active(SUBJECT)?;
        Ok(core.space.atom_ids())
    }

    pub fn link_ids(&self) -> Result<Vec<Handle>> {
        let core = self.core.read();
        core.state.ensure_active(SUBJECT)?;
        Ok(core.space.link_ids())
    }

    /// Registered name of a type tag.
    pub fn type_name(&self, atom_type: AtomType) -> String {
        self.core.read().space.type_name(&atom_type).to_string()
    }

    /// Kind a type name resolves to in this kernel, without registering it.
    pub fn type_kind(&self, type_name: &str) -> TypeKind {
        self.core.read().space.types().kind_of_name(type_name)
    }

    pub fn register_type(&self, name: &str, kind: TypeKind) -> Result<AtomType> {
        let mut core = self.core.write();
        core.state.ensure_active(SUBJECT)?;
        Ok(core.space.register_type(name, kind))
    }

    /// Create the fundamental prime number nodes and the two root concepts.
    pub fn seed_fundamentals(&self) -> Result<Vec<Handle>> {
        let mut core = self.core.write();
        core.state.ensure_active(SUBJECT)?;
        let root = TruthValue::new(1.0, 1.0)?;
        let prime = TruthValue::new(0.999, 0.999)?;

        let mut seeded = Vec::with_capacity(FUNDAMENTAL_PRIMES.len() + 2);
        for concept in ["PhilosophicalTransformation", "FractalInformationTheory"] {
            seeded.push(self.insert_atom(&mut core, AtomType::ConceptNode, concept, root, 1000.0)?);
        }
        for (i, p) in FUNDAMENTAL_PRIMES.iter().enumerate() {
            let stimulus = 1000.0 - i as f64 * 10.0;
            let name = format!("Prime{p}");
            seeded.push(self.insert_atom(&mut core, AtomType::NumberNode, &name, prime, stimulus)?);
        }
        Ok(seeded)
    }

    // ------------------------------------------------------------------
    // Attention
    // ------------------------------------------------------------------

    pub fn stimulate(&self, id: Handle, amount: f64) -> Result<AttentionValue> {
        let mut core = self.core.write();
        core.state.ensure_active(SUBJECT)?;
        self.economy.stimulate(&mut core.space, id, amount)
    }

    pub fn attention(&self, id: Handle) -> Result<AttentionValue> {
        let core = self.core.read();
        core.state.ensure_active(SUBJECT)?;
        self.economy.snapshot(&core.space, id)
    }

    pub fn top_attention(&self, k: usize) -> Result<Vec<(Handle, f64)>> {
        let core = self.core.read();
        core.state.ensure_active(SUBJECT)?;
        Ok(self.economy.top_attention(&core.space, k))
    }

    pub fn attention_stats(&self) -> Result<AttentionStats> {
        let core = self.core.read();
        core.state.ensure_active(SUBJECT)?;
        Ok(self.economy.stats(&core.space, self.config.resource_budget))
    }

    // ------------------------------------------------------------------
    // Cycles and metrics
    // ------------------------------------------------------------------

    /// Run `n` attention cycles and return the metrics after the last one.
    pub fn run_cycles(&self, n: usize) -> Result<KernelMetrics> {
        self.run_cycles_until(n, || false)
    }

    /// Like `run_cycles`, but consults `should_stop` before each cycle and
    /// returns early once it reports true.
    pub fn run_cycles_until(&self, n: usize, mut should_stop: impl FnMut() -> bool) -> Result<KernelMetrics> {
        self.core.read().state.ensure_active(SUBJECT)?;
        for _ in 0..n {
            if should_stop() {
                break;
            }
            let mut core = self.core.write();
            core.state.ensure_active(SUBJECT)?;
            self.economy.step(&mut core.space);
            core.cycles += 1;
            if self.config.enable_meta_cognition {
                let metrics = self.measure(&core);
                core.history.push_back(metrics);
                while core.history.len() > self.config.history_len {
                    core.history.pop_front();
                }
            }
        }
        self.get_metrics()
    }

    pub fn process_cycle(&self) -> Result<KernelMetrics> {
        self.run_cycles(1)
    }

    pub fn get_metrics(&self) -> Result<KernelMetrics> {
        let core = self.core.read();
        core.state.ensure_active(SUBJECT)?;
        Ok(self.measure(&core))
    }

    pub fn cycle_count(&self) -> u64 {
        self.core.read().cycles
    }

    /// Metrics recorded after each cycle, oldest first. Empty unless
    /// meta-cognition is enabled.
    pub fn metrics_history(&self) -> Vec<KernelMetrics> {
        self.core.read().history.iter().cloned().collect()
    }

    pub(crate) fn read_core(&self) -> RwLockReadGuard<'_, KernelCore> {
        self.core.read()
    }

    /// Metrics from an already-held guard; fails unless the kernel is active.
    pub(crate) fn metrics_locked(&self, core: &KernelCore) -> Result<KernelMetrics> {
        core.state.ensure_active(SUBJECT)?;
        Ok(self.measure(core))
    }

    fn measure(&self, core: &KernelCore) -> KernelMetrics {
        let snapshot = ActivitySnapshot::capture(&core.space, self.config.time_crystal_dimensions);
        let scores = self.scorer.score(&snapshot);
        let total_attention = core
            .space
            .atoms()
            .map(|a| a.attention.sti.max(0.0))
            .sum();
        KernelMetrics {
            total_atoms: snapshot.total_atoms,
            total_links: snapshot.total_links,
            quantum_coherence: scores.quantum_coherence,
            consciousness_emergence: scores.consciousness_emergence,
            attention_entropy: snapshot.attention_entropy,
            ppm_coherence: snapshot.ppm_coherence,
            total_attention,
            cycles: core.cycles,
            coherent: scores.quantum_coherence >= self.config.time_crystal.quantum_coherence_threshold,
        }
    }
}
