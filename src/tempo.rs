//! Rule table mapping a movement designation plus meter to a metronome value.

/// Default rules for the Corelli trio sonatas, keyed by `(OMD, meter)`.
const CORELLI_RULES: &[(&str, &str, u32)] = &[
    ("Adagio", "3/2", 104),
    ("Adagio e piano", "3/2", 104),
    ("Adagio", "3/4", 72),
    ("Adagio e piano", "3/4", 72),
    ("Adagio", "3/8", 40),
    ("Adagio", "4/4", 36),
    ("Adagio", "2/2", 36),
    ("Grave", "3/2", 132),
    ("Grave", "4/4", 34),
    ("Largo", "3/2", 108),
    ("Largo", "3/4", 72),
    ("Largo", "4/4", 56),
    ("Largo e puntato", "4/4", 72),
    ("Presto", "2/2", 168),
    ("Presto", "4/4", 160),
    ("Vivace", "3/4", 192),
    ("Vivace", "4/4", 152),
    ("Allegro", "12/8", 192),
    ("Allegro", "2/2", 220),
    ("Allegro", "3/4", 176),
    ("Allegro", "3/8", 152),
    ("Allegro", "4/4", 104),
    ("Allegro", "6/4", 210),
    ("Allegro", "6/8", 152),
];

/// Lookup table for `*MM` insertion.
///
/// Designations are compared case-insensitively after trimming; meters must
/// match exactly.
pub struct TempoTable {
    rules: Vec<TempoRule>,
}

struct TempoRule {
    name: String,
    meter: String,
    metronome: u32,
}

impl TempoTable {
    pub fn empty() -> Self {
        TempoTable { rules: Vec::new() }
    }

    /// The built-in table for the Corelli corpus.
    pub fn corelli() -> Self {
        let mut table = TempoTable::empty();
        for &(name, meter, metronome) in CORELLI_RULES {
            table.push(name, meter, metronome);
        }
        table
    }

    pub fn push(&mut self, name: impl Into<String>, meter: impl Into<String>, metronome: u32) {
        self.rules.push(TempoRule {
            name: name.into(),
            meter: meter.into(),
            metronome,
        });
    }

    /// The metronome value for a designation/meter pair, if one is known.
    pub fn metronome(&self, name: &str, meter: &str) -> Option<u32> {
        let name = name.trim();
        self.rules
            .iter()
            .find(|rule| rule.name.eq_ignore_ascii_case(name) && rule.meter == meter)
            .map(|rule| rule.metronome)
    }

    /// Whether any rule exists for the designation, regardless of meter.
    pub fn knows_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.rules.iter().any(|rule| rule.name.eq_ignore_ascii_case(name))
    }

    /// All distinct designation names in lowercase, for tempo-comment matching.
    pub fn lowercase_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rules.iter().map(|rule| rule.name.to_lowercase()).collect();
        names.sort();
        names.dedup();
        names
    }
}

impl Default for TempoTable {
    fn default() -> Self {
        TempoTable::corelli()
    }
}
