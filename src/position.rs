//! Points in musical time and the textual forms they take in scores and tables.

use std::str::FromStr;

/// A point in musical time: measure number plus one-based beat.
///
/// The textual form is either a bare measure number (`"28"`, beat defaults to 1)
/// or `"measure/beat"` with a decimal beat (`"48/2.5"`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timepoint {
    pub measure: u32,
    pub beat: f64,
}

impl Timepoint {
    pub fn new(measure: u32, beat: f64) -> Self {
        Timepoint { measure, beat }
    }
}

impl FromStr for Timepoint {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let malformed = || PositionError::MalformedTimepoint(trimmed.to_owned());
        match trimmed.split_once('/') {
            Some((measure, beat)) => {
                let measure = measure.parse().map_err(|_| malformed())?;
                let beat = beat.parse().map_err(|_| malformed())?;
                Ok(Timepoint { measure, beat })
            }
            None => {
                let measure = trimmed.parse().map_err(|_| malformed())?;
                Ok(Timepoint { measure, beat: 1.0 })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PositionError {
    MalformedTimepoint(String),
    MalformedMeasureNumber(String),
    MalformedReferenceRecord(String),
}

/// Measure number carried by a barline token.
///
/// `=12`, `==12`, and `=12-` all yield 12; unnumbered barlines (`=`, `==`, `=:|`)
/// yield `None` and leave the running measure untouched. A numeric suffix that
/// cannot be read as a measure number is an error.
pub fn barline_measure(token: &str) -> Result<Option<u32>, PositionError> {
    let after_equals = token.trim_start_matches('=');
    let digits: String = after_equals.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Ok(None);
    }
    digits
        .parse()
        .map(Some)
        .map_err(|_| PositionError::MalformedMeasureNumber(token.to_owned()))
}

/// Formats a beat value the way `**cdata-beat` cells spell it: no trailing
/// zeros, no decimal point on whole numbers. Table keys and scanned cells must
/// agree on this spelling for lookups to match.
pub fn canonical_beat(beat: f64) -> String {
    if beat.fract() == 0.0 {
        format!("{}", beat as i64)
    } else {
        format!("{beat}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_timepoints() {
        assert_eq!("28".parse::<Timepoint>().unwrap(), Timepoint::new(28, 1.0));
        assert_eq!("28/3".parse::<Timepoint>().unwrap(), Timepoint::new(28, 3.0));
        assert_eq!("48/2.5".parse::<Timepoint>().unwrap(), Timepoint::new(48, 2.5));
        assert_eq!(" 1/1 ".parse::<Timepoint>().unwrap(), Timepoint::new(1, 1.0));
    }

    #[test]
    fn reject_malformed_timepoints() {
        for bad in ["", "x", "3/x", "/2", "3/"] {
            assert_eq!(
                bad.parse::<Timepoint>().unwrap_err(),
                PositionError::MalformedTimepoint(bad.trim().to_owned())
            );
        }
    }

    #[test]
    fn barline_measures() {
        assert_eq!(barline_measure("=12").unwrap(), Some(12));
        assert_eq!(barline_measure("==5").unwrap(), Some(5));
        assert_eq!(barline_measure("=12-").unwrap(), Some(12));
        assert_eq!(barline_measure("=").unwrap(), None);
        assert_eq!(barline_measure("=:|!").unwrap(), None);
        assert!(barline_measure("=99999999999999999999").is_err());
    }

    #[test]
    fn beat_spelling() {
        assert_eq!(canonical_beat(0.0), "0");
        assert_eq!(canonical_beat(2.0), "2");
        assert_eq!(canonical_beat(2.5), "2.5");
    }
}
