//! Immutable catalogue of benchmarkable algorithms.
//!
//! The table is fixed at compile time and handed to the configuration layer
//! at startup; nothing reads or mutates it through global state. Initial
//! scales are domain tuning constants: they mark the smallest problem size
//! at which the algorithm produces a measurable runtime on one worker.

use std::collections::BTreeMap;

use gmark_core::{IdType, JobSpec};

/// Which id representations an algorithm can run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeGroup {
    /// Every representation in the closed set.
    All,
    /// Integer representations only (the algorithm relies on dense ids).
    IntegerOnly,
}

impl TypeGroup {
    /// True when the algorithm supports the given representation.
    pub fn supports(self, id_type: IdType) -> bool {
        match self {
            TypeGroup::All => true,
            TypeGroup::IntegerOnly => !matches!(id_type, IdType::Text),
        }
    }
}

/// One registered algorithm variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmEntry {
    /// Unique job label (directed/undirected variants get distinct names).
    pub name: &'static str,
    /// Algorithm selector passed to the backend.
    pub algorithm: &'static str,
    /// Base scale at which the scale search starts on one worker.
    pub initial_scale: u32,
    /// Representations the algorithm supports.
    pub types: TypeGroup,
    /// Extra backend arguments; an empty value denotes a boolean flag.
    pub parameters: &'static [(&'static str, &'static str)],
}

/// The built-in algorithm catalogue.
pub const BUILTIN: &[AlgorithmEntry] = &[
    AlgorithmEntry {
        name: "AdamicAdar",
        algorithm: "AdamicAdar",
        initial_scale: 10,
        types: TypeGroup::All,
        parameters: &[("simplify", "undirected"), ("mirror-results", "")],
    },
    AlgorithmEntry {
        name: "ConnectedComponents",
        algorithm: "ConnectedComponents",
        initial_scale: 16,
        types: TypeGroup::IntegerOnly,
        parameters: &[("simplify", "undirected")],
    },
    AlgorithmEntry {
        name: "ClusteringCoefficientDirected",
        algorithm: "ClusteringCoefficient",
        initial_scale: 14,
        types: TypeGroup::All,
        parameters: &[("simplify", "directed"), ("order", "directed")],
    },
    AlgorithmEntry {
        name: "ClusteringCoefficientUndirected",
        algorithm: "ClusteringCoefficient",
        initial_scale: 14,
        types: TypeGroup::All,
        parameters: &[("simplify", "undirected"), ("order", "undirected")],
    },
    AlgorithmEntry {
        name: "EdgeList",
        algorithm: "EdgeList",
        initial_scale: 20,
        types: TypeGroup::IntegerOnly,
        parameters: &[],
    },
    AlgorithmEntry {
        name: "GraphMetricsDirected",
        algorithm: "GraphMetrics",
        initial_scale: 16,
        types: TypeGroup::All,
        parameters: &[("simplify", "directed"), ("order", "directed")],
    },
    AlgorithmEntry {
        name: "GraphMetricsUndirected",
        algorithm: "GraphMetrics",
        initial_scale: 16,
        types: TypeGroup::All,
        parameters: &[("simplify", "undirected"), ("order", "undirected")],
    },
    AlgorithmEntry {
        name: "HITS",
        algorithm: "HITS",
        initial_scale: 16,
        types: TypeGroup::All,
        parameters: &[("simplify", "directed")],
    },
    AlgorithmEntry {
        name: "JaccardIndex",
        algorithm: "JaccardIndex",
        initial_scale: 12,
        types: TypeGroup::All,
        parameters: &[("simplify", "undirected"), ("mirror-results", "")],
    },
    AlgorithmEntry {
        name: "PageRank",
        algorithm: "PageRank",
        initial_scale: 16,
        types: TypeGroup::All,
        parameters: &[("simplify", "directed")],
    },
    AlgorithmEntry {
        name: "TriangleListingDirected",
        algorithm: "TriangleListing",
        initial_scale: 14,
        types: TypeGroup::All,
        parameters: &[
            ("simplify", "directed"),
            ("order", "directed"),
            ("permute-results", ""),
        ],
    },
    AlgorithmEntry {
        name: "TriangleListingUndirected",
        algorithm: "TriangleListing",
        initial_scale: 14,
        types: TypeGroup::All,
        parameters: &[
            ("simplify", "undirected"),
            ("order", "undirected"),
            ("permute-results", ""),
        ],
    },
];

/// Looks up a catalogue entry by job label.
pub fn find(name: &str) -> Option<&'static AlgorithmEntry> {
    BUILTIN.iter().find(|entry| entry.name == name)
}

/// Starting scale for a job: the catalogue base plus `log2(parallelism)`
/// (more workers shift the whole search window up), clamped to the id
/// type's terminal bound for bounded representations.
pub fn initial_scale(entry: &AlgorithmEntry, id_type: IdType, parallelism: u32) -> u32 {
    let scale = entry.initial_scale + parallelism.max(1).ilog2();
    match id_type.terminal_bound() {
        Some(bound) => scale.min(bound),
        None => scale,
    }
}

/// Builds the backend-facing spec for a catalogue entry and representation.
pub fn spec_for(entry: &AlgorithmEntry, id_type: IdType) -> JobSpec {
    let parameters: BTreeMap<String, String> = entry
        .parameters
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    JobSpec {
        name: entry.name.to_string(),
        algorithm: entry.algorithm.to_string(),
        id_type,
        parameters,
    }
}
