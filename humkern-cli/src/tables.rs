//! YAML/JSON annotation tables: the per-piece modulation and tempo-fix lists,
//! the cadence/sequence span tables, and the labeled-span import format.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use humkern::position::Timepoint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ResultExt;
use crate::CliResult;

/// `piece id → [[timepoint, label], …]`, the shape of `modulations.yaml` and
/// `tempo-fixes.yaml`.
pub type PieceLabels = BTreeMap<String, Vec<(String, String)>>;

/// `piece id → [[start, end, [tags…]], …]`, the shape of `cadences.yaml` and
/// `sequences.yaml`.
pub type PieceSpans = BTreeMap<String, Vec<(String, String, Vec<String>)>>;

pub fn load_piece_labels(path: &Path) -> CliResult<PieceLabels> {
    let text = fs::read_to_string(path)?;
    serde_yaml::from_str(&text)
        .handle_error(&format!("Could not parse {}", path.display()))
}

/// Parses a `[timepoint, label]` list into annotator entries.
pub fn parse_entries(labels: &[(String, String)]) -> CliResult<Vec<(Timepoint, String)>> {
    labels
        .iter()
        .map(|(timepoint, label)| {
            let timepoint = timepoint
                .parse::<Timepoint>()
                .handle_error(&format!("Invalid timepoint {timepoint:?}"))?;
            Ok((timepoint, label.clone()))
        })
        .collect()
}

/// Replaces the given pieces' entries in a YAML table file, leaving all other
/// pieces untouched. Keys come out sorted; a missing file starts empty.
pub fn merge_piece_table<T>(path: &Path, updates: &BTreeMap<String, T>) -> CliResult<()>
where
    T: Serialize + DeserializeOwned,
{
    let mut table: BTreeMap<String, serde_yaml::Value> = if path.exists() {
        let text = fs::read_to_string(path)?;
        serde_yaml::from_str(&text)
            .handle_error(&format!("Could not parse {}", path.display()))?
    } else {
        BTreeMap::new()
    };
    for (piece, value) in updates {
        let value = serde_yaml::to_value(value)
            .handle_error(&format!("Could not serialize entry for {piece}"))?;
        table.insert(piece.clone(), value);
    }
    let rendered =
        serde_yaml::to_string(&table).handle_error("Could not render YAML table")?;
    fs::write(path, rendered)?;
    Ok(())
}

/// A labeled-span export: annotations keyed by line number of the score file
/// they were made against.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFile {
    pub piece_id: String,
    #[serde(default)]
    pub modulations: Vec<SpanLabel>,
    #[serde(default)]
    pub cadences: Vec<SpanLabel>,
    #[serde(default)]
    pub sequences: Vec<SpanLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanLabel {
    pub start_line: u32,
    #[serde(default)]
    pub end_line: Option<u32>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ImportFile {
    pub fn read(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .handle_error(&format!("Could not parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_timepoint_entries() {
        let labels = vec![
            ("1".to_owned(), "C".to_owned()),
            ("28/3".to_owned(), "a".to_owned()),
        ];
        let entries = parse_entries(&labels).unwrap();
        assert_eq!(entries[0].0, Timepoint::new(1, 1.0));
        assert_eq!(entries[1].0, Timepoint::new(28, 3.0));
        assert!(parse_entries(&[("x".to_owned(), "C".to_owned())]).is_err());
    }

    #[test]
    fn import_file_accepts_partial_exports() {
        let json = r#"{
            "pieceId": "op01n01a",
            "modulations": [{ "startLine": 12, "key": " D " }],
            "cadences": [{ "startLine": 12, "endLine": 20, "tags": ["PAC", " V "] }]
        }"#;
        let import: ImportFile = serde_json::from_str(json).unwrap();
        assert_eq!(import.piece_id, "op01n01a");
        assert_eq!(import.modulations[0].key.as_deref(), Some(" D "));
        assert_eq!(import.cadences[0].end_line, Some(20));
        assert!(import.sequences.is_empty());
    }

    #[test]
    fn merge_replaces_only_listed_pieces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modulations.yaml");
        let mut initial: PieceLabels = BTreeMap::new();
        initial.insert(
            "op01n01a".to_owned(),
            vec![("1/1".to_owned(), "C".to_owned())],
        );
        initial.insert(
            "op01n02b".to_owned(),
            vec![("1/1".to_owned(), "G".to_owned())],
        );
        merge_piece_table(&path, &initial).unwrap();

        let mut update: PieceLabels = BTreeMap::new();
        update.insert(
            "op01n02b".to_owned(),
            vec![("5/2".to_owned(), "e".to_owned())],
        );
        merge_piece_table(&path, &update).unwrap();

        let merged = load_piece_labels(&path).unwrap();
        assert_eq!(
            merged["op01n01a"],
            vec![("1/1".to_owned(), "C".to_owned())]
        );
        assert_eq!(merged["op01n02b"], vec![("5/2".to_owned(), "e".to_owned())]);
    }
}
