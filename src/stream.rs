//! Model of a [Humdrum](https://www.humdrum.org/) kern score as a stream of tab-separated rows.
//!
//! A score is a sequence of rows; each row is a sequence of cells, one per spine
//! (parallel data track). The row's first cell determines its [`RowKind`]. Global
//! comments are the one exception to the tabular shape: they span the whole line
//! regardless of the spine count, so column edits leave them alone.

use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

/// Classification of a single row, derived from its leading cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    /// `!!` or `!!!` comment/reference record applying to the whole stream.
    GlobalComment,
    /// `**…` exclusive interpretation declaring the type of every spine.
    Exclusive,
    /// `*-` spine terminator.
    Terminator,
    /// `*…` tandem interpretation (key signature, meter, tempo, …).
    StateChange,
    /// `!…` per-spine comment.
    LocalComment,
    /// `=…` barline, usually carrying a measure number.
    Barline,
    /// Note, rest, or null (`.`) data.
    Event,
}

/// One row of a score stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    cells: Vec<String>,
}

impl Row {
    pub fn new(cells: Vec<String>) -> Self {
        Row { cells }
    }

    pub fn from_line(line: &str) -> Self {
        Row {
            cells: line.split('\t').map(str::to_owned).collect(),
        }
    }

    pub fn kind(&self) -> RowKind {
        let first = self.cell(0);
        if first.starts_with("!!") {
            RowKind::GlobalComment
        } else if first.starts_with("**") {
            RowKind::Exclusive
        } else if first.starts_with("*-") {
            RowKind::Terminator
        } else if first.starts_with('*') {
            RowKind::StateChange
        } else if first.starts_with('!') {
            RowKind::LocalComment
        } else if first.starts_with('=') {
            RowKind::Barline
        } else {
            RowKind::Event
        }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// The cell at `index`, or `""` when the row is shorter than that.
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn insert_cell(&mut self, index: usize, value: impl Into<String>) {
        self.cells.insert(index.min(self.cells.len()), value.into());
    }

    pub fn remove_cell(&mut self, index: usize) {
        if index < self.cells.len() {
            self.cells.remove(index);
        }
    }

    pub fn to_line(&self) -> String {
        self.cells.join("\t")
    }

    /// Whether every cell equals the given null token (`*`, `!`, or `.`).
    pub fn is_null(&self, null_token: &str) -> bool {
        self.cells.iter().all(|cell| cell == null_token)
    }
}

/// Structural defect making a stream unusable for annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamError {
    /// No `**…` row was found, so spine roles cannot be determined.
    NoExclusiveInterpretation,
    EmptyStream,
}

/// An in-memory kern score, held fully materialized (movements are small).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreStream {
    rows: Vec<Row>,
}

impl ScoreStream {
    pub fn parse(text: &str) -> Result<Self, StreamError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(StreamError::EmptyStream);
        }
        let stream = ScoreStream {
            rows: trimmed.lines().map(Row::from_line).collect(),
        };
        if stream.exclusive_row().is_none() {
            return Err(StreamError::NoExclusiveInterpretation);
        }
        Ok(stream)
    }

    pub(crate) fn from_rows(rows: Vec<Row>) -> Self {
        ScoreStream { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn exclusive_row(&self) -> Option<&Row> {
        self.rows.iter().find(|row| row.kind() == RowKind::Exclusive)
    }

    /// Number of declared spines.
    pub fn spine_count(&self) -> usize {
        self.exclusive_row().map(|row| row.cells().len()).unwrap_or(0)
    }

    /// Indices of all spines whose declaration starts with `prefix`.
    ///
    /// Spines are always located by name, never by fixed index, since external
    /// filters are free to place their auxiliary spines anywhere.
    pub fn spines_with_prefix(&self, prefix: &str) -> Vec<usize> {
        match self.exclusive_row() {
            Some(row) => row
                .cells()
                .iter()
                .enumerate()
                .filter(|(_, name)| name.starts_with(prefix))
                .map(|(index, _)| index)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Per-spine mask for the given prefix, e.g. which columns are `**kern`.
    pub fn spine_mask(&self, prefix: &str) -> Vec<bool> {
        match self.exclusive_row() {
            Some(row) => row.cells().iter().map(|name| name.starts_with(prefix)).collect(),
            None => Vec::new(),
        }
    }

    /// Whether the stream closes all of its spines with a terminator row.
    pub fn is_terminated(&self) -> bool {
        self.rows
            .iter()
            .rev()
            .find(|row| row.kind() != RowKind::GlobalComment)
            .map(|row| row.cells().iter().all(|cell| cell == "*-"))
            .unwrap_or(false)
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Display for ScoreStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, row) in self.rows.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&row.to_line())?;
        }
        Ok(())
    }
}
