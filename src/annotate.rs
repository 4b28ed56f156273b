//! The configurable score-splicing pass.
//!
//! All annotation flavors share one scanning skeleton: walk the rows once,
//! keep a [`Scan`] accumulator of the running measure/meter/tempo/beat state,
//! and let the selected [`Mode`] decide how each row is edited, what gets
//! inserted around it, and when an existing row is replaced instead of
//! duplicated. Cleanup (stripping auxiliary spines, removing null rows) uses
//! the same entry point with its own modes.

use crate::position::{barline_measure, PositionError, Timepoint};
use crate::stream::{Row, RowKind, ScoreStream};
use crate::table::LabelTable;
use crate::tempo::TempoTable;

/// Declaration of the inserted label spine.
pub const LABEL_SPINE: &str = "**harm";
/// Declaration prefix of the auxiliary beat spines emitted by `meter`.
pub const BEAT_SPINE_PREFIX: &str = "**cdata-beat";
/// Declaration prefix of pitch/rhythm spines.
pub const KERN_SPINE_PREFIX: &str = "**kern";

/// Escape marker forcing retention of a comment row that would otherwise be
/// dropped as a redundant tempo comment. The marker itself is stripped.
const KEEP_MARKER: &str = "KEEP";

/// Which splicing transformation to run.
pub enum Mode<'a> {
    /// Insert a label spine right after the first `**kern` spine, looking
    /// labels up by measure and beat offset. Re-running replaces the existing
    /// label spine instead of adding a second one.
    InsertLabels(&'a LabelTable),
    /// Insert `*X:` key interpretations at the given timepoints.
    InsertKeyChanges(&'a [(Timepoint, String)]),
    /// Insert `*MM` metronome interpretations resolved from the rule table,
    /// dropping stale metronome rows and redundant tempo comments.
    InsertTempoMarks(&'a TempoTable),
    /// Insert corrected `!!!OMD:` designations at the given timepoints.
    InsertTempoDesignations(&'a [(Timepoint, String)]),
    /// Remove every spine whose declaration starts with the given prefix.
    StripSpines(&'a str),
    /// Collapse repeated interpretation rows, and with [`Cleanup::Full`] drop
    /// every other kind of null row as well.
    DeleteRedundantState(Cleanup),
}

/// How aggressively [`Mode::DeleteRedundantState`] prunes rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cleanup {
    /// Null `*` rows and consecutive duplicate interpretation rows only.
    /// In-place rewrites use this so spacer lines in the source file survive.
    Interpretations,
    /// Additionally drop null data rows, null local comments, and empty
    /// global comments, as wanted when deriving a fresh annotated copy.
    Full,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// Not every spine was closed with `*-`; the stream is treated as
    /// implicitly terminated at its end.
    UnterminatedSpines,
    /// No label was found for an event at this position.
    LabelMiss { measure: u32, beat_cell: String },
    /// The designation is known but has no rule for the current meter.
    TempoRuleMiss {
        name: Option<String>,
        meter: Option<String>,
        measure: u32,
    },
}

#[derive(Debug)]
pub enum AnnotateError {
    Position(PositionError),
    /// The stream declares no `**kern` spine to anchor insertions on.
    NoKernSpine,
    /// The opening designation of the movement is absent from the rule table.
    UnknownTempoName { name: String, meter: Option<String> },
}

impl From<PositionError> for AnnotateError {
    fn from(v: PositionError) -> Self {
        AnnotateError::Position(v)
    }
}

/// Result of one annotation pass.
pub struct Annotated {
    pub stream: ScoreStream,
    pub warnings: Vec<Warning>,
}

/// Runs one splicing pass over a well-formed stream.
pub fn annotate(stream: &ScoreStream, mode: &Mode) -> Result<Annotated, AnnotateError> {
    let mut warnings = Vec::new();
    if !stream.is_terminated() {
        warnings.push(Warning::UnterminatedSpines);
    }
    let stream = match mode {
        Mode::InsertLabels(table) => insert_labels(stream, table, &mut warnings)?,
        Mode::InsertKeyChanges(entries) => insert_key_changes(stream, entries)?,
        Mode::InsertTempoMarks(table) => insert_tempo_marks(stream, table, &mut warnings)?,
        Mode::InsertTempoDesignations(entries) => insert_tempo_designations(stream, entries)?,
        Mode::StripSpines(prefix) => strip_spines(stream, prefix),
        Mode::DeleteRedundantState(cleanup) => delete_redundant_state(stream, *cleanup),
    };
    Ok(Annotated { stream, warnings })
}

/// Running scan state, updated once per row before the mode logic runs.
#[derive(Default)]
struct Scan {
    measure: u32,
    meter: Option<String>,
    tempo_name: Option<String>,
    /// One-based beat, reset to 1 on every barline.
    beat: f64,
    /// Most recent raw `**cdata-beat` cell.
    beat_cell: Option<String>,
}

impl Scan {
    fn observe(&mut self, row: &Row, beat_spines: &[usize]) -> Result<(), PositionError> {
        match row.kind() {
            RowKind::Barline => {
                if let Some(measure) = barline_measure(row.cell(0))? {
                    self.measure = measure;
                }
                self.beat = 1.0;
            }
            RowKind::GlobalComment => {
                if let Some(rest) = row.cell(0).strip_prefix("!!!OMD:") {
                    let name = rest.trim();
                    if name.is_empty() {
                        return Err(PositionError::MalformedReferenceRecord(
                            row.cell(0).to_owned(),
                        ));
                    }
                    self.tempo_name = Some(name.to_owned());
                }
            }
            RowKind::StateChange => {
                if let Some(meter) = meter_token(row.cell(0)) {
                    self.meter = Some(meter);
                }
            }
            RowKind::Event => {
                for &index in beat_spines {
                    let cell = row.cell(index);
                    if let Ok(value) = cell.parse::<f64>() {
                        self.beat = value;
                        self.beat_cell = Some(cell.to_owned());
                        break;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// `*M3/4` → `3/4`; rejects `*MM…` and non-meter interpretations.
fn meter_token(cell: &str) -> Option<String> {
    let rest = cell.strip_prefix("*M")?;
    let (numer, denom) = rest.split_once('/')?;
    let denom: String = denom.chars().take_while(char::is_ascii_digit).collect();
    if numer.is_empty() || denom.is_empty() || !numer.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{numer}/{denom}"))
}

fn is_metronome_row(row: &Row) -> bool {
    row.cells().iter().any(|cell| {
        cell.strip_prefix("*MM")
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
    })
}

/// Rows that anchor a metronome insertion: meter changes, designation records,
/// mensuration signs, and (stale) metronome rows themselves.
fn is_metronome_anchor(row: &Row) -> bool {
    let first = row.cell(0);
    meter_token(first).is_some()
        || first.starts_with("!!!OMD")
        || first.starts_with("*met")
        || is_metronome_row(row)
}

fn interpretation_row(mask: &[bool], value: &str) -> Row {
    Row::new(
        mask.iter()
            .map(|&kern| if kern { value.to_owned() } else { "*".to_owned() })
            .collect(),
    )
}

fn insert_labels(
    stream: &ScoreStream,
    table: &LabelTable,
    warnings: &mut Vec<Warning>,
) -> Result<ScoreStream, AnnotateError> {
    // Explicit-replace idempotence: a previously inserted label spine is
    // removed before the fresh one goes in.
    let stripped;
    let stream = if stream.spines_with_prefix(LABEL_SPINE).is_empty() {
        stream
    } else {
        stripped = strip_spines(stream, LABEL_SPINE);
        &stripped
    };

    let kern_spines = stream.spines_with_prefix(KERN_SPINE_PREFIX);
    let beat_spines = stream.spines_with_prefix(BEAT_SPINE_PREFIX);
    let first_kern = *kern_spines.first().ok_or(AnnotateError::NoKernSpine)?;

    let mut scan = Scan::default();
    let mut above_added = false;
    let mut rows = Vec::with_capacity(stream.rows().len());
    for row in stream.rows() {
        scan.observe(row, &beat_spines)?;
        let inserted = match row.kind() {
            RowKind::GlobalComment => None,
            RowKind::Exclusive => Some(LABEL_SPINE.to_owned()),
            RowKind::Terminator => Some("*-".to_owned()),
            RowKind::StateChange => Some(if above_added {
                "*".to_owned()
            } else {
                above_added = true;
                "*above".to_owned()
            }),
            RowKind::LocalComment => Some("!".to_owned()),
            RowKind::Barline => Some(row.cell(0).to_owned()),
            RowKind::Event => {
                let label = scan
                    .beat_cell
                    .as_deref()
                    .and_then(|cell| table.get(scan.measure, cell));
                match label {
                    Some(label) => Some(label.to_owned()),
                    None => {
                        if let (false, Some(cell)) = (table.is_empty(), scan.beat_cell.as_deref()) {
                            warnings.push(Warning::LabelMiss {
                                measure: scan.measure,
                                beat_cell: cell.to_owned(),
                            });
                        }
                        Some(".".to_owned())
                    }
                }
            }
        };
        let mut row = row.clone();
        if let Some(value) = inserted {
            row.insert_cell(first_kern + 1, value);
        }
        rows.push(row);
    }
    Ok(ScoreStream::from_rows(rows))
}

fn insert_tempo_marks(
    stream: &ScoreStream,
    table: &TempoTable,
    warnings: &mut Vec<Warning>,
) -> Result<ScoreStream, AnnotateError> {
    let kern_mask = stream.spine_mask(KERN_SPINE_PREFIX);
    if !kern_mask.contains(&true) {
        return Err(AnnotateError::NoKernSpine);
    }
    let tempo_names = table.lowercase_names();

    let rows = stream.rows();
    let mut scan = Scan::default();
    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    let mut index = 0;
    while index < rows.len() {
        let row = &rows[index];
        scan.observe(row, &[])?;

        // Metronome rows of the source are stale; they are re-derived below.
        if is_metronome_row(row) {
            index += 1;
            continue;
        }

        if row.kind() == RowKind::LocalComment {
            let line = row.to_line();
            if line.contains(KEEP_MARKER) {
                out.push(Row::from_line(&line.replacen(KEEP_MARKER, "", 1)));
                index += 1;
                continue;
            }
            // Tempo comments duplicate the header designation only around the
            // movement opening; later ones are genuine mid-movement markings.
            if scan.measure <= 1 && is_tempo_comment(&line, &tempo_names) {
                index += 1;
                continue;
            }
        }

        out.push(row.clone());

        if is_metronome_anchor(row) {
            let resolved = match (scan.tempo_name.as_deref(), scan.meter.as_deref()) {
                (Some(name), Some(meter)) => table.metronome(name, meter),
                _ => None,
            };
            if let Some(value) = resolved {
                let metronome_row = interpretation_row(&kern_mask, &format!("*MM{value}"));
                match rows.get(index + 1) {
                    Some(next) if is_metronome_row(next) => {
                        // Replace the stale row instead of accumulating.
                        out.push(metronome_row);
                        index += 2;
                        continue;
                    }
                    Some(next) if is_metronome_anchor(next) => {}
                    _ => out.push(metronome_row),
                }
            } else if scan.measure > 1 {
                warnings.push(Warning::TempoRuleMiss {
                    name: scan.tempo_name.clone(),
                    meter: scan.meter.clone(),
                    measure: scan.measure,
                });
            } else if let Some(name) = scan.tempo_name.as_deref() {
                if !table.knows_name(name) {
                    return Err(AnnotateError::UnknownTempoName {
                        name: name.to_owned(),
                        meter: scan.meter.clone(),
                    });
                }
            }
        }
        index += 1;
    }
    Ok(ScoreStream::from_rows(out))
}

fn is_tempo_comment(line: &str, tempo_names: &[String]) -> bool {
    let lower = line.to_lowercase();
    tempo_names.iter().any(|name| lower.contains(name.as_str())) || is_metronome_comment(&lower)
}

/// Matches editorial metronome comments of the shape `…t=<text>=<number>…`.
fn is_metronome_comment(lower: &str) -> bool {
    if let Some(position) = lower.find("t=") {
        let rest = &lower[position + 2..];
        if let Some(equals) = rest.find('=') {
            return rest[equals + 1..].starts_with(|c: char| c.is_ascii_digit());
        }
    }
    false
}

fn insert_tempo_designations(
    stream: &ScoreStream,
    entries: &[(Timepoint, String)],
) -> Result<ScoreStream, AnnotateError> {
    let kern_spines = stream.spines_with_prefix(KERN_SPINE_PREFIX);
    let beat_spines = stream.spines_with_prefix(BEAT_SPINE_PREFIX);
    let last_kern = *kern_spines.last().ok_or(AnnotateError::NoKernSpine)?;
    let spine_count = stream.spine_count();

    let mut scan = Scan::default();
    let mut used = vec![false; entries.len()];
    let mut out: Vec<Row> = Vec::with_capacity(stream.rows().len());
    for row in stream.rows() {
        scan.observe(row, &beat_spines)?;
        if row.kind() != RowKind::Barline {
            let matched = entries.iter().enumerate().find(|(index, (timepoint, _))| {
                !used[*index] && timepoint.measure == scan.measure && timepoint.beat == scan.beat
            });
            if let Some((index, (timepoint, name))) = matched {
                used[index] = true;
                let record = format!("!!!OMD: {name}");
                // A designation spliced in by an earlier run sits right above
                // the matched row (possibly behind its layout comment); leave
                // it alone instead of stacking a second copy.
                let already_spliced = out
                    .iter()
                    .rev()
                    .find(|previous| previous.kind() != RowKind::LocalComment)
                    .is_some_and(|previous| previous.cell(0) == record);
                if !already_spliced {
                    out.push(Row::new(vec![record]));
                    if timepoint.beat != 1.0 {
                        // Rendering workaround: designations off the downbeat
                        // are only displayed when mirrored as a layout text
                        // comment on the top kern spine. The KEEP marker
                        // protects the comment from the tempo-comment sweep.
                        let cells = (0..spine_count)
                            .map(|column| {
                                if column == last_kern {
                                    format!("!{KEEP_MARKER}LO:TX:a:B:t={name}")
                                } else {
                                    "!".to_owned()
                                }
                            })
                            .collect();
                        out.push(Row::new(cells));
                    }
                }
            }
        }
        out.push(row.clone());
    }
    Ok(ScoreStream::from_rows(out))
}

fn insert_key_changes(
    stream: &ScoreStream,
    entries: &[(Timepoint, String)],
) -> Result<ScoreStream, AnnotateError> {
    let kern_mask = stream.spine_mask(KERN_SPINE_PREFIX);
    if !kern_mask.contains(&true) {
        return Err(AnnotateError::NoKernSpine);
    }
    let beat_spines = stream.spines_with_prefix(BEAT_SPINE_PREFIX);

    // The opening key lands next to the key signature; everything else lands
    // at its measure/beat. Every entry fires at most once.
    let initial = entries
        .iter()
        .position(|(timepoint, _)| {
            timepoint.measure == 0 || (timepoint.measure == 1 && timepoint.beat == 1.0)
        });
    let mut used = vec![false; entries.len()];
    if let Some(index) = initial {
        used[index] = true;
    }
    let mut initial_pending = initial;

    let rows = stream.rows();
    let mut scan = Scan::default();
    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    let mut index = 0;
    while index < rows.len() {
        let row = &rows[index];
        scan.observe(row, &beat_spines)?;

        if let Some(entry) = initial_pending {
            if row.cells().iter().any(|cell| cell.contains("*k[")) {
                let key = &entries[entry].1;
                out.push(row.clone());
                initial_pending = None;
                match rows.get(index + 1) {
                    Some(next) if is_key_row(next) => {
                        // Replace the stale opening key in place.
                        let cells = next
                            .cells()
                            .iter()
                            .enumerate()
                            .map(|(column, cell)| {
                                if kern_mask.get(column).copied().unwrap_or(false) {
                                    format!("*{key}:")
                                } else if cell.starts_with('*') {
                                    "*".to_owned()
                                } else {
                                    cell.clone()
                                }
                            })
                            .collect();
                        out.push(Row::new(cells));
                        index += 2;
                        continue;
                    }
                    _ => out.push(interpretation_row(&kern_mask, &format!("*{key}:"))),
                }
                index += 1;
                continue;
            }
        }

        if scan.measure > 0 {
            let row_beat = beat_spines
                .iter()
                .find_map(|&spine| row.cell(spine).parse::<f64>().ok());
            if let Some(beat) = row_beat {
                let matched = entries.iter().enumerate().find(|(entry, (timepoint, _))| {
                    !used[*entry] && timepoint.measure == scan.measure && timepoint.beat == beat
                });
                if let Some((entry, (_, key))) = matched {
                    used[entry] = true;
                    out.push(interpretation_row(&kern_mask, &format!("*{key}:")));
                }
            }
        }

        out.push(row.clone());
        index += 1;
    }
    Ok(ScoreStream::from_rows(out))
}

/// `*C:`, `*a:`, `*f#:` — a key interpretation in the leading spine.
fn is_key_row(row: &Row) -> bool {
    let rest = match row.cell(0).strip_prefix('*') {
        Some(rest) => rest,
        None => return false,
    };
    let word_length = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '#' || *c == '-')
        .count();
    word_length > 0 && rest[word_length..].starts_with(':')
}

/// Removes every spine whose declaration starts with `prefix`, uniformly
/// across all rows. Global comments are untouched.
pub fn strip_spines(stream: &ScoreStream, prefix: &str) -> ScoreStream {
    let spines = stream.spines_with_prefix(prefix);
    let rows = stream
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            if row.kind() != RowKind::GlobalComment {
                for &index in spines.iter().rev() {
                    row.remove_cell(index);
                }
            }
            row
        })
        .collect();
    ScoreStream::from_rows(rows)
}

/// Collapses consecutive identical interpretation rows and drops null `*`
/// rows; [`Cleanup::Full`] also drops null data rows, null local comments,
/// and empty global comments. Stands in for the `ridxx` cleanup stage of the
/// external toolchain.
pub fn delete_redundant_state(stream: &ScoreStream, cleanup: Cleanup) -> ScoreStream {
    let full = cleanup == Cleanup::Full;
    let mut out: Vec<Row> = Vec::with_capacity(stream.rows().len());
    for row in stream.rows() {
        let redundant = match row.kind() {
            RowKind::StateChange => {
                row.is_null("*") || out.last().is_some_and(|previous| previous == row)
            }
            RowKind::LocalComment => full && row.is_null("!"),
            RowKind::Event => full && row.is_null("."),
            RowKind::GlobalComment => {
                let first = row.cell(0);
                full && (first == "!!" || first == "!!!")
            }
            _ => false,
        };
        if !redundant {
            out.push(row.clone());
        }
    }
    ScoreStream::from_rows(out)
}
