//! Garden of Gardens: a depth-bounded tree of kernels whose leaf results
//! (petals) are folded into summary metrics.
//!
//! Gardens live in a flat table keyed by id; parent/child relations are id
//! references. Every garden owns a kernel, which counts as one petal, and
//! may additionally hold transform results as petals.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::GOGConfig;
use crate::error::{NanoBrainError, Result};
use crate::kernel::{KernelMetrics, LifecycleState, UnifiedKernel};
use crate::ppm::prime_consistency;
use crate::tct::{TCTransformEngine, TCTransformResult};

const SUBJECT: &str = "garden of gardens";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GardenId(u64);

impl GardenId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GardenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gog_{}", self.0)
    }
}

struct Garden {
    name: String,
    parent: Option<GardenId>,
    depth: usize,
    children: Vec<GardenId>,
    kernel: Arc<UnifiedKernel>,
    petals: Vec<TCTransformResult>,
}

/// Read-only view of one garden.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GardenInfo {
    pub id: GardenId,
    pub name: String,
    pub parent: Option<GardenId>,
    pub depth: usize,
    pub children: Vec<GardenId>,
    pub petal_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GogMetrics {
    pub total_gardens: usize,
    pub total_petals: usize,
    /// Mean coherence over every petal; 0 when there are none.
    pub average_coherence: f64,
    pub max_depth_reached: usize,
    /// Gardens whose kernel reports itself coherent.
    pub coherent_gardens: usize,
    /// Transform petal pairs at or above the configured resonance threshold.
    pub resonant_pairs: usize,
}

/// A transform petal: the garden holding it and its position there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PetalId {
    pub garden: GardenId,
    pub index: usize,
}

/// Two transform petals whose dominant primes overlap.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResonantPair {
    pub first: PetalId,
    pub second: PetalId,
    /// Jaccard overlap of the two dominant prime sets.
    pub consistency: f64,
}

struct GardenTable {
    state: LifecycleState,
    gardens: BTreeMap<GardenId, Garden>,
    root: Option<GardenId>,
    context: Option<GardenId>,
    next_id: u64,
}

pub struct GardenOfGardens {
    config: GOGConfig,
    transform: TCTransformEngine,
    table: RwLock<GardenTable>,
}

impl GardenOfGardens {
    pub fn new(config: GOGConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transform: TCTransformEngine::new(config.transform.clone())?,
            table: RwLock::new(GardenTable {
                state: LifecycleState::Created,
                gardens: BTreeMap::new(),
                root: None,
                context: None,
                next_id: 0,
            }),
            config,
        })
    }

    pub fn config(&self) -> &GOGConfig {
        &self.config
    }

    /// Activate the container and plant the root garden at depth 0.
    pub fn initialize(&self) -> Result<()> {
        let mut table = self.table.write();
        if table.state == LifecycleState::Active {
            return Ok(());
        }
        let kernel = self.spawn_kernel()?;
        table.state.activate(SUBJECT)?;
        let root = insert_garden(&mut table, "root", None, 0, kernel);
        table.root = Some(root);
        table.context = Some(root);
        Ok(())
    }

    /// Shut the container and every garden kernel down.
    pub fn shutdown(&self) -> Result<()> {
        let mut table = self.table.write();
        table.state.shut_down(SUBJECT)?;
        for garden in table.gardens.values() {
            retire(&garden.kernel)?;
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.table.read().state == LifecycleState::Active
    }

    pub fn state(&self) -> LifecycleState {
        self.table.read().state
    }

    fn spawn_kernel(&self) -> Result<Arc<UnifiedKernel>> {
        let kernel = UnifiedKernel::new(self.config.kernel.clone())?;
        kernel.initialize()?;
        Ok(Arc::new(kernel))
    }

    pub fn root(&self) -> Result<GardenId> {
        let table = self.table.read();
        table.state.ensure_active(SUBJECT)?;
        table.root.ok_or(NanoBrainError::NotActive(SUBJECT))
    }

    /// Garden that `create_garden` attaches new gardens to.
    pub fn context(&self) -> Result<GardenId> {
        let table = self.table.read();
        table.state.ensure_active(SUBJECT)?;
        table.context.ok_or(NanoBrainError::NotActive(SUBJECT))
    }

    pub fn enter(&self, id: GardenId) -> Result<()> {
        let mut table = self.table.write();
        table.state.ensure_active(SUBJECT)?;
        if !table.gardens.contains_key(&id) {
            return Err(NanoBrainError::UnknownGarden(id));
        }
        table.context = Some(id);
        Ok(())
    }

    /// Create a garden under the current context (the root by default).
    pub fn create_garden(&self, name: &str) -> Result<GardenId> {
        let parent = self.context()?;
        self.create_child_garden(parent, name)
    }

    pub fn create_child_garden(&self, parent: GardenId, name: &str) -> Result<GardenId> {
        let kernel = self.spawn_kernel()?;
        let mut table = self.table.write();
        table.state.ensure_active(SUBJECT)?;
        let parent_depth = table
            .gardens
            .get(&parent)
            .map(|g| g.depth)
            .ok_or(NanoBrainError::UnknownGarden(parent))?;
        let depth = parent_depth + 1;
        if depth > self.config.max_depth {
            return Err(NanoBrainError::DepthExceeded {
                depth,
                max_depth: self.config.max_depth,
            });
        }
        let id = insert_garden(&mut table, name, Some(parent), depth, kernel);
        if let Some(p) = table.gardens.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Remove a garden and its whole subtree, shutting their kernels down.
    /// Returns the removed ids, ascending.
    pub fn remove_garden(&self, id: GardenId) -> Result<Vec<GardenId>> {
        let mut table = self.table.write();
        table.state.ensure_active(SUBJECT)?;
        let parent = match table.gardens.get(&id) {
            None => return Err(NanoBrainError::UnknownGarden(id)),
            Some(g) => g.parent.ok_or(NanoBrainError::ProtectedGarden(id))?,
        };

        let mut doomed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(g) = table.gardens.get(&next) {
                stack.extend(g.children.iter().copied());
                doomed.push(next);
            }
        }
        doomed.sort();

        for gid in &doomed {
            if let Some(g) = table.gardens.get(gid) {
                retire(&g.kernel)?;
            }
        }
        for gid in &doomed {
            table.gardens.remove(gid);
        }
        if let Some(p) = table.gardens.get_mut(&parent) {
            p.children.retain(|c| *c != id);
        }
        if table.context.is_some_and(|c| doomed.contains(&c)) {
            table.context = table.root;
        }
        Ok(doomed)
    }

    pub fn garden_ids(&self) -> Result<Vec<GardenId>> {
        let table = self.table.read();
        table.state.ensure_active(SUBJECT)?;
        Ok(table.gardens.keys().copied().collect())
    }

    pub fn gardens_at_depth(&self, depth: usize) -> Result<Vec<GardenId>> {
        let table = self.table.read();
        table.state.ensure_active(SUBJECT)?;
        Ok(table
            .gardens
            .iter()
            .filter(|(_, g)| g.depth == depth)
            .map(|(id, _)| *id)
            .collect())
    }

    pub fn get_garden(&self, id: GardenId) -> Result<GardenInfo> {
        let table = self.table.read();
        table.state.ensure_active(SUBJECT)?;
        let g = table
            .gardens
            .get(&id)
            .ok_or(NanoBrainError::UnknownGarden(id))?;
        Ok(GardenInfo {
            id,
            name: g.name.clone(),
            parent: g.parent,
            depth: g.depth,
            children: g.children.clone(),
            petal_count: g.petals.len(),
        })
    }

    /// The kernel owned by a garden, for populating its AtomSpace.
    pub fn kernel(&self, id: GardenId) -> Result<Arc<UnifiedKernel>> {
        let table = self.table.read();
        table.state.ensure_active(SUBJECT)?;
        table
            .gardens
            .get(&id)
            .map(|g| Arc::clone(&g.kernel))
            .ok_or(NanoBrainError::UnknownGarden(id))
    }

    /// Transform `signal` and attach the result to a garden as a petal.
    pub fn add_petal(&self, id: GardenId, signal: &[f64]) -> Result<TCTransformResult> {
        let result = self.transform.transform(signal)?;
        let mut table = self.table.write();
        table.state.ensure_active(SUBJECT)?;
        let garden = table
            .gardens
            .get_mut(&id)
            .ok_or(NanoBrainError::UnknownGarden(id))?;
        garden.petals.push(result.clone());
        Ok(result)
    }

    /// Advance every active garden kernel by `n` cycles, ascending by id.
    pub fn run_cycles(&self, n: usize) -> Result<GogMetrics> {
        let kernels: Vec<Arc<UnifiedKernel>> = {
            let table = self.table.read();
            table.state.ensure_active(SUBJECT)?;
            table.gardens.values().map(|g| Arc::clone(&g.kernel)).collect()
        };
        for kernel in kernels.iter().filter(|k| k.is_active()) {
            kernel.run_cycles(n)?;
        }
        self.get_metrics()
    }

    /// Fold the garden tree into summary metrics.
    pub fn get_metrics(&self) -> Result<GogMetrics> {
        let table = self.table.read();
        table.state.ensure_active(SUBJECT)?;
        let kernels = kernel_metrics(&table);

        let mut fold = Fold::default();
        if let Some(root) = table.root {
            fold.visit(&table, root, &kernels);
        }
        Ok(GogMetrics {
            total_gardens: fold.gardens,
            total_petals: fold.coherences.len(),
            average_coherence: fold.average(),
            max_depth_reached: fold.max_depth,
            coherent_gardens: fold.coherent,
            resonant_pairs: resonant_in(&table, self.config.resonance_threshold).len(),
        })
    }

    /// Mean petal coherence over the subtree rooted at `id`; 0 without petals.
    pub fn garden_coherence(&self, id: GardenId) -> Result<f64> {
        let table = self.table.read();
        table.state.ensure_active(SUBJECT)?;
        if !table.gardens.contains_key(&id) {
            return Err(NanoBrainError::UnknownGarden(id));
        }
        let kernels = kernel_metrics(&table);
        let mut fold = Fold::default();
        fold.visit(&table, id, &kernels);
        Ok(fold.average())
    }

    /// Every pair of transform petals, across all gardens, whose dominant
    /// primes overlap by at least `threshold`. Pairs are ordered by petal.
    pub fn resonant_pairs(&self, threshold: f64) -> Result<Vec<ResonantPair>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(NanoBrainError::InvalidConfig(format!(
                "resonance threshold must be in [0, 1], got {threshold}"
            )));
        }
        let table = self.table.read();
        table.state.ensure_active(SUBJECT)?;
        Ok(resonant_in(&table, threshold))
    }
}

/// Shut a garden kernel down; one the caller already shut down is fine.
fn retire(kernel: &UnifiedKernel) -> Result<()> {
    match kernel.shutdown() {
        Ok(()) | Err(NanoBrainError::AlreadyShutdown(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Current metrics of every live garden kernel.
///
/// Kernel locks are taken in ascending garden id order and held together,
/// so the result is one consistent cut across all kernels. Kernels that
/// were shut down are left out.
fn kernel_metrics(table: &GardenTable) -> BTreeMap<GardenId, KernelMetrics> {
    let guards: Vec<_> = table
        .gardens
        .iter()
        .map(|(id, g)| (*id, &g.kernel, g.kernel.read_core()))
        .collect();
    guards
        .iter()
        .filter_map(|(id, kernel, core)| kernel.metrics_locked(core).ok().map(|m| (*id, m)))
        .collect()
}

fn resonant_in(table: &GardenTable, threshold: f64) -> Vec<ResonantPair> {
    let petals: Vec<(PetalId, &[u32])> = table
        .gardens
        .iter()
        .flat_map(|(gid, g)| {
            g.petals.iter().enumerate().map(move |(index, p)| {
                let id = PetalId {
                    garden: *gid,
                    index,
                };
                (id, p.dominant_primes.as_slice())
            })
        })
        .collect();

    let mut pairs = Vec::new();
    for (i, (first, a)) in petals.iter().enumerate() {
        for (second, b) in &petals[i + 1..] {
            let consistency = prime_consistency(a, b);
            if consistency >= threshold {
                pairs.push(ResonantPair {
                    first: *first,
                    second: *second,
                    consistency,
                });
            }
        }
    }
    pairs
}

fn insert_garden(
    table: &mut GardenTable,
    name: &str,
    parent: Option<GardenId>,
    depth: usize,
    kernel: Arc<UnifiedKernel>,
) -> GardenId {
    let id = GardenId(table.next_id);
    table.next_id += 1;
    table.gardens.insert(
        id,
        Garden {
            name: name.to_string(),
            parent,
            depth,
            children: Vec::new(),
            kernel,
            petals: Vec::new(),
        },
    );
    id
}

#[derive(Default)]
struct Fold {
    gardens: usize,
    coherent: usize,
    max_depth: usize,
    coherences: Vec<f64>,
}

impl Fold {
    /// Depth-first: a garden's own petals, then its children in creation order.
    fn visit(&mut self, table: &GardenTable, id: GardenId, kernels: &BTreeMap<GardenId, KernelMetrics>) {
        let Some(garden) = table.gardens.get(&id) else {
            return;
        };
        self.gardens += 1;
        self.max_depth = self.max_depth.max(garden.depth);
        if let Some(m) = kernels.get(&id) {
            self.coherences.push(m.quantum_coherence);
            if m.coherent {
                self.coherent += 1;
            }
        }
        self.coherences
            .extend(garden.petals.iter().map(|p| p.overall_coherence));
        for child in &garden.children {
            self.visit(table, *child, kernels);
        }
    }

    fn average(&self) -> f64 {
        if self.coherences.is_empty() {
            0.0
        } else {
            self.coherences.iter().sum::<f64>() / self.coherences.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppm::compute_ppm_coherence;

    fn active_gog(max_depth: usize) -> GardenOfGardens {
        let gog = GardenOfGardens::new(GOGConfig {
            max_depth,
            ..GOGConfig::default()
        })
        .unwrap();
        gog.initialize().unwrap();
        gog
    }

    #[test]
    fn test_lifecycle() {
        let gog = GardenOfGardens::new(GOGConfig::default()).unwrap();
        assert!(!gog.is_active());
        assert!(gog.create_garden("early").is_err());
        gog.initialize().unwrap();
        assert!(gog.is_active());
        let kernel = gog.kernel(gog.root().unwrap()).unwrap();
        gog.shutdown().unwrap();
        assert!(!gog.is_active());
        assert!(!kernel.is_active());
        assert_eq!(gog.initialize(), Err(NanoBrainError::AlreadyShutdown("garden of gardens")));
    }

    #[test]
    fn test_create_garden_counts() {
        let gog = active_gog(3);
        let id = gog.create_garden("test_garden").unwrap();
        assert_eq!(id.to_string(), "gog_1");
        let metrics = gog.get_metrics().unwrap();
        assert!(metrics.total_gardens >= 1);
        assert_eq!(metrics.total_gardens, 2);
        assert_eq!(metrics.total_petals, 2);
        assert_eq!(metrics.max_depth_reached, 1);
        assert_eq!(gog.get_garden(id).unwrap().depth, 1);
    }

    #[test]
    fn test_depth_bound() {
        let gog = active_gog(2);
        let a = gog.create_garden("a").unwrap();
        gog.enter(a).unwrap();
        let b = gog.create_garden("b").unwrap();
        assert_eq!(gog.get_garden(b).unwrap().depth, 2);
        gog.enter(b).unwrap();
        assert_eq!(
            gog.create_garden("c"),
            Err(NanoBrainError::DepthExceeded { depth: 3, max_depth: 2 })
        );
        assert_eq!(gog.garden_ids().unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_parent() {
        let gog = active_gog(3);
        let ghost = GardenId::from_raw(99);
        assert_eq!(
            gog.create_child_garden(ghost, "x"),
            Err(NanoBrainError::UnknownGarden(ghost))
        );
        assert!(gog.enter(ghost).is_err());
    }

    #[test]
    fn test_average_over_petals() {
        let gog = active_gog(3);
        let root = gog.root().unwrap();
        let leaf = gog.create_garden("leaf").unwrap();
        let petal = gog.add_petal(leaf, &[0.1, 0.2, 0.3, 0.4, 0.5]).unwrap();
        assert!(gog.add_petal(leaf, &[]).is_err());

        // Two empty kernels score 0; the transform petal brings its own coherence.
        let metrics = gog.get_metrics().unwrap();
        assert_eq!(metrics.total_petals, 3);
        let expected = petal.overall_coherence / 3.0;
        assert!((metrics.average_coherence - expected).abs() < 1e-12);
        assert_eq!(petal.overall_coherence, compute_ppm_coherence(&petal.dominant_primes));
        assert_eq!(gog.get_garden(leaf).unwrap().petal_count, 1);
        assert_eq!(gog.get_garden(root).unwrap().children, vec![leaf]);
    }

    #[test]
    fn test_kernel_petals_track_garden_kernels() {
        let gog = active_gog(3);
        let leaf = gog.create_garden("leaf").unwrap();
        let kernel = gog.kernel(leaf).unwrap();
        let cat = kernel.create_atom("ConceptNode", "Cat", 0.9, 0.8).unwrap();
        let animal = kernel.create_atom("ConceptNode", "Animal", 0.9, 0.8).unwrap();
        kernel.create_link("InheritanceLink", &[cat, animal], 0.9, 0.8).unwrap();

        let metrics = gog.run_cycles(3).unwrap();
        let leaf_q = kernel.get_metrics().unwrap().quantum_coherence;
        assert!(leaf_q > 0.0);
        assert!((metrics.average_coherence - leaf_q / 2.0).abs() < 1e-12);
        assert_eq!(kernel.cycle_count(), 3);
    }

    #[test]
    fn test_remove_subtree() {
        let gog = active_gog(3);
        let a = gog.create_garden("a").unwrap();
        let b = gog.create_child_garden(a, "b").unwrap();
        let c = gog.create_child_garden(b, "c").unwrap();
        let sibling = gog.create_garden("sibling").unwrap();
        gog.enter(c).unwrap();

        let kernel_c = gog.kernel(c).unwrap();
        assert_eq!(gog.remove_garden(a).unwrap(), vec![a, b, c]);
        assert!(!kernel_c.is_active());
        assert_eq!(gog.context().unwrap(), gog.root().unwrap());
        assert_eq!(gog.get_garden(gog.root().unwrap()).unwrap().children, vec![sibling]);
        assert_eq!(gog.get_metrics().unwrap().total_gardens, 2);

        let root = gog.root().unwrap();
        assert_eq!(gog.remove_garden(root), Err(NanoBrainError::ProtectedGarden(root)));
    }

    #[test]
    fn test_gardens_at_depth() {
        let gog = active_gog(3);
        let a = gog.create_garden("a").unwrap();
        let b = gog.create_garden("b").unwrap();
        let deep = gog.create_child_garden(a, "deep").unwrap();
        assert_eq!(gog.gardens_at_depth(1).unwrap(), vec![a, b]);
        assert_eq!(gog.gardens_at_depth(2).unwrap(), vec![deep]);
        assert_eq!(gog.gardens_at_depth(0).unwrap(), vec![gog.root().unwrap()]);
    }

    #[test]
    fn test_shut_down_kernel_drops_its_petal() {
        let gog = active_gog(3);
        let leaf = gog.create_garden("leaf").unwrap();
        gog.kernel(leaf).unwrap().shutdown().unwrap();
        let metrics = gog.get_metrics().unwrap();
        assert_eq!(metrics.total_gardens, 2);
        assert_eq!(metrics.total_petals, 1);
        assert!(gog.run_cycles(1).is_ok());
    }

    #[test]
    fn test_garden_coherence_is_per_subtree() {
        let gog = active_gog(3);
        let root = gog.root().unwrap();
        let left = gog.create_garden("left").unwrap();
        let right = gog.create_garden("right").unwrap();
        let petal = gog.add_petal(left, &[0.1, 0.2, 0.3, 0.4, 0.5]).unwrap();

        // The left subtree holds its empty kernel (0) and one transform petal.
        let left_c = gog.garden_coherence(left).unwrap();
        assert!((left_c - petal.overall_coherence / 2.0).abs() < 1e-12);
        assert_eq!(gog.garden_coherence(right).unwrap(), 0.0);
        assert_eq!(
            gog.garden_coherence(root).unwrap(),
            gog.get_metrics().unwrap().average_coherence
        );

        let ghost = GardenId::from_raw(42);
        assert_eq!(gog.garden_coherence(ghost), Err(NanoBrainError::UnknownGarden(ghost)));
    }

    #[test]
    fn test_resonant_pairs() {
        let gog = active_gog(3);
        let a = gog.create_garden("a").unwrap();
        let b = gog.create_garden("b").unwrap();
        gog.add_petal(a, &[0.5, 0.5, 0.5]).unwrap();
        gog.add_petal(b, &[0.5, 0.5]).unwrap();
        gog.add_petal(b, &[0.0]).unwrap();

        let pairs = gog.resonant_pairs(0.8).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first, PetalId { garden: a, index: 0 });
        assert_eq!(pairs[0].second, PetalId { garden: b, index: 0 });
        assert_eq!(pairs[0].consistency, 1.0);
        assert_eq!(gog.get_metrics().unwrap().resonant_pairs, 1);

        // Every distinct pair qualifies at zero.
        assert_eq!(gog.resonant_pairs(0.0).unwrap().len(), 3);
        assert!(matches!(
            gog.resonant_pairs(f64::NAN),
            Err(NanoBrainError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_teardown_tolerates_kernels_already_shut_down() {
        let gog = active_gog(3);
        let a = gog.create_garden("a").unwrap();
        let b = gog.create_garden("b").unwrap();
        gog.kernel(a).unwrap().shutdown().unwrap();
        gog.kernel(b).unwrap().shutdown().unwrap();
        assert_eq!(gog.remove_garden(a).unwrap(), vec![a]);
        gog.shutdown().unwrap();
        assert!(!gog.is_active());
    }

    #[test]
    fn test_concurrent_aggregation() {
        let gog = Arc::new(active_gog(3));
        for i in 0..4 {
            let id = gog.create_garden(&format!("g{i}")).unwrap();
            let k = gog.kernel(id).unwrap();
            k.create_atom("ConceptNode", "x", 0.5, 0.5).unwrap();
        }
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let gog = Arc::clone(&gog);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        gog.run_cycles(1).unwrap();
                        gog.get_metrics().unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(gog.get_metrics().unwrap().total_gardens, 5);
    }
}
