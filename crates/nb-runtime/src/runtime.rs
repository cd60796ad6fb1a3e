use std::sync::Arc;

use nb_core::{AttentionStats, GOGConfig, GardenOfGardens, KernelMetrics, UnifiedConfig, UnifiedKernel};
use serde::Serialize;

use crate::error::Result;

/// One atom in a report's attentional focus.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FocusAtom {
    pub id: String,
    pub atom_type: String,
    pub name: String,
    pub sti: f64,
}

/// Outcome of a run: final metrics, attention statistics and the focus.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub metrics: KernelMetrics,
    pub attention: AttentionStats,
    pub focus: Vec<FocusAtom>,
}

/// Construct and activate a kernel.
pub fn build_kernel(config: &UnifiedConfig) -> Result<Arc<UnifiedKernel>> {
    let kernel = UnifiedKernel::new(config.clone())?;
    kernel.initialize()?;
    tracing::info!(
        "kernel active (dimensions={}, meta_cognition={})",
        config.time_crystal_dimensions,
        config.enable_meta_cognition
    );
    Ok(Arc::new(kernel))
}

/// Run `cycles` cycles and report on the `focus` highest-attention atoms.
/// With `debug_output` set, each cycle's metrics are logged at debug level.
pub fn run_kernel(kernel: &UnifiedKernel, cycles: usize, focus: usize) -> Result<CycleReport> {
    let metrics = if kernel.config().debug_output {
        let mut last = kernel.get_metrics()?;
        for _ in 0..cycles {
            last = kernel.process_cycle()?;
            tracing::debug!(
                "cycle {}: atoms={} links={} qc={:.4} ce={:.4} entropy={:.4}",
                last.cycles,
                last.total_atoms,
                last.total_links,
                last.quantum_coherence,
                last.consciousness_emergence,
                last.attention_entropy
            );
        }
        last
    } else {
        kernel.run_cycles(cycles)?
    };
    tracing::info!("ran {cycles} cycles, total {}", metrics.cycles);

    let mut top = Vec::new();
    for (id, sti) in kernel.top_attention(focus)? {
        let atom = kernel.get_atom(id)?;
        top.push(FocusAtom {
            id: id.to_string(),
            atom_type: kernel.type_name(atom.atom_type),
            name: atom.name,
            sti,
        });
    }

    Ok(CycleReport {
        metrics,
        attention: kernel.attention_stats()?,
        focus: top,
    })
}

/// Construct and activate a garden of gardens.
pub fn build_gog(config: &GOGConfig) -> Result<GardenOfGardens> {
    let gog = GardenOfGardens::new(config.clone())?;
    gog.initialize()?;
    tracing::info!("garden of gardens active (max_depth={})", config.max_depth);
    Ok(gog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_report() {
        let kernel = build_kernel(&UnifiedConfig::default()).unwrap();
        kernel.seed_fundamentals().unwrap();
        let report = run_kernel(&kernel, 3, 5).unwrap();
        assert_eq!(report.metrics.cycles, 3);
        assert_eq!(report.focus.len(), 5);
        assert!(report.focus.windows(2).all(|w| w[0].sti >= w[1].sti));
        assert!(report.attention.total_attention > 0.0);
    }

    #[test]
    fn test_debug_path_matches_batch_path() {
        let quiet = build_kernel(&UnifiedConfig::default()).unwrap();
        let chatty = build_kernel(&UnifiedConfig {
            debug_output: true,
            ..UnifiedConfig::default()
        })
        .unwrap();
        quiet.seed_fundamentals().unwrap();
        chatty.seed_fundamentals().unwrap();
        let a = run_kernel(&quiet, 4, 3).unwrap();
        let b = run_kernel(&chatty, 4, 3).unwrap();
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.focus, b.focus);
    }

    #[test]
    fn test_build_gog() {
        let gog = build_gog(&GOGConfig::default()).unwrap();
        assert!(gog.is_active());
        assert_eq!(gog.get_metrics().unwrap().total_gardens, 1);
    }
}
