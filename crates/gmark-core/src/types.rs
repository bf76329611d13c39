use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, GmarkError};

/// Vertex-id representation used by the synthetic graph generator.
///
/// The set is closed: `Byte` and `Short` are bounded (a graph at scale `s`
/// has `2^s` vertices, so the id type caps the largest representable scale),
/// the remaining types place no bound on the scale search.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum IdType {
    /// 8-bit vertex identifiers, the narrowest representation.
    Byte,
    /// 16-bit vertex identifiers.
    Short,
    /// 32-bit vertex identifiers.
    Integer,
    /// 64-bit vertex identifiers.
    Long,
    /// Textual vertex identifiers.
    Text,
}

impl IdType {
    /// Enumerates the closed set of representations.
    pub fn all() -> [IdType; 5] {
        [
            IdType::Byte,
            IdType::Short,
            IdType::Integer,
            IdType::Long,
            IdType::Text,
        ]
    }

    /// Largest baseline scale the representation can hold, if bounded.
    ///
    /// The bounds sit one below the bit width so that a single probe above
    /// the final baseline still produces representable identifiers.
    pub fn terminal_bound(self) -> Option<u32> {
        match self {
            IdType::Byte => Some(7),
            IdType::Short => Some(15),
            IdType::Integer | IdType::Long | IdType::Text => None,
        }
    }

    /// Stable name used in selectors, records, and backend arguments.
    pub fn as_str(self) -> &'static str {
        match self {
            IdType::Byte => "byte",
            IdType::Short => "short",
            IdType::Integer => "integer",
            IdType::Long => "long",
            IdType::Text => "text",
        }
    }
}

impl Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdType {
    type Err = GmarkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "byte" => Ok(IdType::Byte),
            "short" => Ok(IdType::Short),
            "integer" => Ok(IdType::Integer),
            "long" => Ok(IdType::Long),
            "text" => Ok(IdType::Text),
            other => Err(GmarkError::Config(
                ErrorInfo::new("unknown-id-type", "unrecognised vertex id type")
                    .with_context("type", other)
                    .with_hint("expected one of: byte, short, integer, long, text, all"),
            )),
        }
    }
}

/// Backend-facing identity of one benchmark job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Unique job label (distinguishes directed/undirected variants).
    pub name: String,
    /// Algorithm selector understood by the backend.
    pub algorithm: String,
    /// Vertex-id representation for the generated graph.
    pub id_type: IdType,
    /// Extra backend arguments (`simplify`, `order`, …) in stable order.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Successful result of a single backend invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Wall-clock runtime of the submitted computation.
    pub runtime: Duration,
    /// Named metrics reported by the backend (counters, hashes, …).
    pub metrics: BTreeMap<String, String>,
}

/// One self-contained record per completed (non-cancelled) invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Job label of the invocation.
    pub algorithm: String,
    /// Vertex-id representation the job ran with.
    pub id_type: IdType,
    /// Scale exponent that was executed.
    pub scale: u32,
    /// Generator seed used for this sample.
    pub seed: u64,
    /// Runtime in milliseconds.
    pub runtime_ms: u64,
    /// Metrics reported by the backend for this invocation.
    #[serde(default)]
    pub metrics: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_type_names_round_trip() {
        for id_type in IdType::all() {
            let parsed: IdType = id_type.as_str().parse().expect("parse");
            assert_eq!(parsed, id_type);
        }
        assert!("double".parse::<IdType>().is_err());
    }

    #[test]
    fn only_narrow_types_are_bounded() {
        assert_eq!(IdType::Byte.terminal_bound(), Some(7));
        assert_eq!(IdType::Short.terminal_bound(), Some(15));
        assert_eq!(IdType::Long.terminal_bound(), None);
        assert_eq!(IdType::Text.terminal_bound(), None);
    }

    #[test]
    fn output_record_serializes_flat() {
        let record = OutputRecord {
            algorithm: "PageRank".to_string(),
            id_type: IdType::Long,
            scale: 16,
            seed: 7,
            runtime_ms: 1250,
            metrics: BTreeMap::from([("vertexCount".to_string(), "65536".to_string())]),
        };
        let json = serde_json::to_string(&record).expect("json");
        assert!(json.contains("\"id_type\":\"long\""));
        assert!(json.contains("\"runtime_ms\":1250"));
        let back: OutputRecord = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, record);
    }
}
