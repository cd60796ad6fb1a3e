//! Seed files: a JSON description of atoms, links and initial stimuli used
//! to populate a fresh kernel. Links and stimuli refer to atoms by name.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use nb_core::{Handle, NanoBrainError, TruthValue, TypeKind, TypeRegistry, UnifiedKernel};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

fn default_strength() -> f64 {
    1.0
}

fn default_confidence() -> f64 {
    0.9
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedAtom {
    #[serde(rename = "type", default = "default_node_type")]
    pub atom_type: String,
    pub name: String,
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_node_type() -> String {
    "ConceptNode".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedLink {
    #[serde(rename = "type")]
    pub link_type: String,
    /// Atom names, in argument order.
    pub outgoing: Vec<String>,
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedStimulus {
    pub name: String,
    pub amount: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub atoms: Vec<SeedAtom>,
    pub links: Vec<SeedLink>,
    pub stimuli: Vec<SeedStimulus>,
}

/// What a seed application created.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub atoms: usize,
    pub links: usize,
    pub stimuli: usize,
}

fn expect_kind(type_name: &str, actual: TypeKind, expected: TypeKind) -> Result<()> {
    if actual != expected {
        return Err(NanoBrainError::TypeKindMismatch {
            type_name: type_name.to_string(),
            expected: expected.as_str(),
        }
        .into());
    }
    Ok(())
}

impl SeedFile {
    pub fn from_json_str(content: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|source| RuntimeError::JsonParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| RuntimeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let seed = Self::from_json_str(&content, path)?;
        tracing::info!(
            "loaded seed {} ({} atoms, {} links)",
            path.display(),
            seed.atoms.len(),
            seed.links.len()
        );
        Ok(seed)
    }

    /// Check everything `apply` could reject, against the built-in type table.
    pub fn validate(&self) -> Result<()> {
        let types = TypeRegistry::new();
        self.check(|name| types.kind_of_name(name))
    }

    /// Names, truth values, type kinds and stimulus amounts. Runs before the
    /// first mutation so a rejected seed leaves the kernel untouched.
    fn check(&self, kind_of: impl Fn(&str) -> TypeKind) -> Result<()> {
        let mut seen = HashSet::new();
        for atom in &self.atoms {
            if !seen.insert(atom.name.as_str()) {
                return Err(RuntimeError::Seed(format!("duplicate atom name {:?}", atom.name)));
            }
            TruthValue::new(atom.strength, atom.confidence)?;
            expect_kind(&atom.atom_type, kind_of(atom.atom_type.as_str()), TypeKind::Node)?;
        }
        for link in &self.links {
            TruthValue::new(link.strength, link.confidence)?;
            expect_kind(&link.link_type, kind_of(link.link_type.as_str()), TypeKind::Link)?;
        }
        let unknown = self
            .links
            .iter()
            .flat_map(|l| l.outgoing.iter())
            .chain(self.stimuli.iter().map(|s| &s.name))
            .find(|name| !seen.contains(name.as_str()));
        if let Some(name) = unknown {
            return Err(RuntimeError::Seed(format!("reference to unknown atom {name:?}")));
        }
        if let Some(s) = self.stimuli.iter().find(|s| !s.amount.is_finite()) {
            return Err(NanoBrainError::InvalidSignal(format!(
                "stimulus for {:?} must be finite, got {}",
                s.name, s.amount
            ))
            .into());
        }
        Ok(())
    }

    /// Create every atom, then every link, then apply stimuli.
    pub fn apply(&self, kernel: &UnifiedKernel) -> Result<SeedReport> {
        self.check(|name| kernel.type_kind(name))?;
        let mut by_name: HashMap<&str, Handle> = HashMap::new();
        for atom in &self.atoms {
            let id = kernel.create_atom(&atom.atom_type, &atom.name, atom.strength, atom.confidence)?;
            by_name.insert(atom.name.as_str(), id);
        }

        let mut links = 0;
        for link in &self.links {
            let outgoing: Vec<Handle> = link
                .outgoing
                .iter()
                .filter_map(|n| by_name.get(n.as_str()).copied())
                .collect();
            if outgoing.is_empty() {
                tracing::warn!("skipping {} with no outgoing atoms", link.link_type);
                continue;
            }
            kernel.create_link(&link.link_type, &outgoing, link.strength, link.confidence)?;
            links += 1;
        }

        for stimulus in &self.stimuli {
            if let Some(id) = by_name.get(stimulus.name.as_str()) {
                kernel.stimulate(*id, stimulus.amount)?;
            }
        }

        let report = SeedReport {
            atoms: by_name.len(),
            links,
            stimuli: self.stimuli.len(),
        };
        tracing::info!(
            "seeded kernel: {} atoms, {} links, {} stimuli",
            report.atoms,
            report.links,
            report.stimuli
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nb_core::UnifiedConfig;

    const PETS: &str = r#"{
        "atoms": [
            {"type": "ConceptNode", "name": "Cat", "strength": 0.9, "confidence": 0.8},
            {"name": "Animal"},
            {"type": "PredicateNode", "name": "purrs"}
        ],
        "links": [
            {"type": "InheritanceLink", "outgoing": ["Cat", "Animal"], "strength": 0.95},
            {"type": "EvaluationLink", "outgoing": ["purrs", "Cat"]},
            {"type": "SetLink", "outgoing": []}
        ],
        "stimuli": [{"name": "Cat", "amount": 400.0}]
    }"#;

    fn kernel() -> UnifiedKernel {
        let kernel = UnifiedKernel::new(UnifiedConfig::default()).unwrap();
        kernel.initialize().unwrap();
        kernel
    }

    #[test]
    fn test_apply_seed() {
        let seed = SeedFile::from_json_str(PETS, Path::new("pets.json")).unwrap();
        let kernel = kernel();
        let report = seed.apply(&kernel).unwrap();
        assert_eq!(report, SeedReport { atoms: 3, links: 2, stimuli: 1 });

        let cat = kernel.find_atoms("Cat").unwrap()[0];
        assert_eq!(kernel.top_attention(1).unwrap()[0].0, cat);
        let animal = kernel.get_atom(kernel.find_atoms("Animal").unwrap()[0]).unwrap();
        assert_eq!(animal.truth.strength(), 1.0);
        assert_eq!(kernel.type_name(animal.atom_type), "ConceptNode");
    }

    #[test]
    fn test_unknown_reference_touches_nothing() {
        let seed = SeedFile {
            atoms: vec![SeedAtom {
                atom_type: "ConceptNode".into(),
                name: "Cat".into(),
                strength: 1.0,
                confidence: 1.0,
            }],
            links: vec![SeedLink {
                link_type: "ListLink".into(),
                outgoing: vec!["Cat".into(), "Dog".into()],
                strength: 1.0,
                confidence: 1.0,
            }],
            stimuli: vec![],
        };
        let kernel = kernel();
        assert!(matches!(seed.apply(&kernel), Err(RuntimeError::Seed(_))));
        assert_eq!(kernel.get_metrics().unwrap().total_atoms, 0);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let seed = SeedFile::from_json_str(
            r#"{"atoms": [{"name": "A"}, {"name": "A"}]}"#,
            Path::new("dup.json"),
        )
        .unwrap();
        assert!(seed.validate().is_err());
    }

    #[test]
    fn test_rejected_seed_creates_nothing() {
        let cases = [
            r#"{"atoms": [{"name": "A"}, {"name": "B", "strength": 1.5}]}"#,
            r#"{"atoms": [{"name": "A"}, {"type": "ListLink", "name": "B"}]}"#,
            r#"{"atoms": [{"name": "A"}, {"name": "B"}],
                "links": [{"type": "ConceptNode", "outgoing": ["A", "B"]}]}"#,
            r#"{"atoms": [{"name": "A"}, {"name": "B"}],
                "links": [{"type": "ListLink", "outgoing": ["A", "B"], "confidence": -0.1}]}"#,
        ];
        for json in cases {
            let seed = SeedFile::from_json_str(json, Path::new("bad.json")).unwrap();
            assert!(seed.validate().is_err(), "{json}");
            let kernel = kernel();
            assert!(seed.apply(&kernel).is_err(), "{json}");
            assert_eq!(kernel.get_metrics().unwrap().total_atoms, 0, "{json}");
        }
    }

    #[test]
    fn test_non_finite_stimulus_rejected_up_front() {
        let mut seed = SeedFile::from_json_str(PETS, Path::new("pets.json")).unwrap();
        seed.stimuli[0].amount = f64::INFINITY;
        let kernel = kernel();
        assert!(matches!(
            seed.apply(&kernel),
            Err(RuntimeError::Engine(NanoBrainError::InvalidSignal(_)))
        ));
        assert_eq!(kernel.get_metrics().unwrap().total_atoms, 0);
    }

    #[test]
    fn test_apply_honours_kernel_registered_types() {
        let kernel = kernel();
        kernel.register_type("Bond", TypeKind::Link).unwrap();
        let seed = SeedFile::from_json_str(
            r#"{"atoms": [{"name": "A"}, {"name": "B"}],
                "links": [{"type": "Bond", "outgoing": ["A", "B"]}]}"#,
            Path::new("bond.json"),
        )
        .unwrap();
        assert!(seed.validate().is_err());
        assert_eq!(seed.apply(&kernel).unwrap().links, 1);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            SeedFile::from_json_str("{", Path::new("x.json")),
            Err(RuntimeError::JsonParse { .. })
        ));
    }
}
