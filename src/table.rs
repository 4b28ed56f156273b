//! Position-keyed label tables built from external annotation sources.

use std::collections::HashMap;

use crate::position::canonical_beat;

/// Maps `(measure, beat offset)` to a label, e.g. a DCML chord symbol.
///
/// The beat key is the spelled-out quarter-note offset as it appears in
/// `**cdata-beat` cells; [`canonical_beat`] keeps both sides of the lookup in
/// agreement. Insertion order is irrelevant; the last write to a key wins.
#[derive(Debug, Default)]
pub struct LabelTable {
    entries: HashMap<(u32, String), String>,
}

impl LabelTable {
    pub fn new() -> Self {
        LabelTable::default()
    }

    pub fn insert(&mut self, measure: u32, beat_offset: f64, label: impl Into<String>) {
        self.entries.insert((measure, canonical_beat(beat_offset)), label.into());
    }

    /// Looks up the label for a measure and a raw beat cell.
    pub fn get(&self, measure: u32, beat_cell: &str) -> Option<&str> {
        let key = match beat_cell.parse::<f64>() {
            Ok(value) => canonical_beat(value),
            Err(_) => return None,
        };
        self.entries.get(&(measure, key)).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Builds a table from a DCML reviewed-labels TSV download.
    ///
    /// Requires the `mn` (measure number), `mn_onset` (onset as a fraction of a
    /// whole note, e.g. `1/2`), and `label` columns. The onset fraction is
    /// converted to a zero-based quarter-note offset, matching the output of
    /// `meter -zfr`.
    pub fn from_reviewed_tsv(text: &str) -> Result<Self, TableError> {
        let mut lines = text.trim().lines();
        let header = lines.next().ok_or(TableError::MissingHeader)?;
        let columns: Vec<&str> = header.split('\t').collect();
        let column = |name: &'static str| {
            columns
                .iter()
                .position(|cell| *cell == name)
                .ok_or(TableError::MissingColumn(name))
        };
        let mn = column("mn")?;
        let mn_onset = column("mn_onset")?;
        let label = column("label")?;

        let mut table = LabelTable::new();
        for (index, line) in lines.enumerate() {
            let line_number = index + 2;
            let cells: Vec<&str> = line.split('\t').collect();
            let cell = |column: usize| {
                cells
                    .get(column)
                    .copied()
                    .ok_or(TableError::MalformedRow { line_number })
            };
            let measure: u32 = cell(mn)?
                .parse()
                .map_err(|_| TableError::MalformedRow { line_number })?;
            let offset = parse_onset(cell(mn_onset)?).ok_or(TableError::MalformedRow { line_number })?;
            table.insert(measure, offset, cell(label)?);
        }
        Ok(table)
    }
}

/// Quarter-note offset of an `mn_onset` fraction: `n/d` of a whole note is
/// `n * 4 / d` quarters; a bare `0` marks the start of the measure.
fn parse_onset(onset: &str) -> Option<f64> {
    match onset.split_once('/') {
        Some((numer, denom)) => {
            let numer: f64 = numer.parse().ok()?;
            let denom: f64 = denom.parse().ok()?;
            if denom == 0.0 {
                return None;
            }
            Some(numer * 4.0 / denom)
        }
        None => {
            let value: f64 = onset.parse().ok()?;
            Some(value * 4.0)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableError {
    MissingHeader,
    MissingColumn(&'static str),
    MalformedRow { line_number: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TSV: &str = "mc\tmn\tmn_onset\tlabel\n\
        1\t1\t0\tI\n\
        1\t1\t1/4\tV\n\
        2\t2\t1/2\tI6\n\
        2\t2\t1/2\tV65";

    #[test]
    fn build_from_tsv() {
        let table = LabelTable::from_reviewed_tsv(TSV).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1, "0"), Some("I"));
        assert_eq!(table.get(1, "1"), Some("V"));
        // Last write wins on a key collision.
        assert_eq!(table.get(2, "2"), Some("V65"));
        assert_eq!(table.get(3, "0"), None);
    }

    #[test]
    fn beat_cells_are_matched_numerically() {
        let mut table = LabelTable::new();
        table.insert(4, 2.5, "viio7");
        assert_eq!(table.get(4, "2.5"), Some("viio7"));
        assert_eq!(table.get(4, "2.50"), Some("viio7"));
        assert_eq!(table.get(4, ".:."), None);
    }

    #[test]
    fn reject_incomplete_sources() {
        assert_eq!(
            LabelTable::from_reviewed_tsv("mn\tmn_onset\nonly\ttwo").unwrap_err(),
            TableError::MissingColumn("label")
        );
        assert_eq!(
            LabelTable::from_reviewed_tsv("mn\tmn_onset\tlabel\nx\t0\tI").unwrap_err(),
            TableError::MalformedRow { line_number: 2 }
        );
    }
}
