//! Musical key representation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the 24 major/minor keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MusicalKey {
    // Major keys
    CMajor,
    DbMajor,
    DMajor,
    EbMajor,
    EMajor,
    FMajor,
    GbMajor,
    GMajor,
    AbMajor,
    AMajor,
    BbMajor,
    BMajor,

    // Minor keys
    CMinor,
    CsMinor,
    DMinor,
    EbMinor,
    EMinor,
    FMinor,
    FsMinor,
    GMinor,
    AbMinor,
    AMinor,
    BbMinor,
    BMinor,
}

const MAJOR: [MusicalKey; 12] = [
    MusicalKey::CMajor,
    MusicalKey::DbMajor,
    MusicalKey::DMajor,
    MusicalKey::EbMajor,
    MusicalKey::EMajor,
    MusicalKey::FMajor,
    MusicalKey::GbMajor,
    MusicalKey::GMajor,
    MusicalKey::AbMajor,
    MusicalKey::AMajor,
    MusicalKey::BbMajor,
    MusicalKey::BMajor,
];

const MINOR: [MusicalKey; 12] = [
    MusicalKey::CMinor,
    MusicalKey::CsMinor,
    MusicalKey::DMinor,
    MusicalKey::EbMinor,
    MusicalKey::EMinor,
    MusicalKey::FMinor,
    MusicalKey::FsMinor,
    MusicalKey::GMinor,
    MusicalKey::AbMinor,
    MusicalKey::AMinor,
    MusicalKey::BbMinor,
    MusicalKey::BMinor,
];

const MAJOR_LABELS: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

const MINOR_LABELS: [&str; 12] = [
    "Cm", "C#m", "Dm", "Ebm", "Em", "Fm", "F#m", "Gm", "Abm", "Am", "Bbm", "Bm",
];

// Camelot wheel position indexed by pitch class (C = 0)
const CAMELOT_MAJOR: [u8; 12] = [8, 3, 10, 5, 12, 7, 2, 9, 4, 11, 6, 1];
const CAMELOT_MINOR: [u8; 12] = [5, 12, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10];

impl MusicalKey {
    /// Build from a pitch class (0 = C) and mode
    pub fn from_pitch_class(pitch_class: u8, minor: bool) -> Option<Self> {
        let idx = pitch_class as usize;
        if idx >= 12 {
            return None;
        }
        Some(if minor { MINOR[idx] } else { MAJOR[idx] })
    }

    /// Map a stratum-dsp key
    pub fn from_stratum(key: &stratum_dsp::Key) -> Option<Self> {
        match key {
            stratum_dsp::Key::Major(idx) => Self::from_pitch_class(*idx as u8, false),
            stratum_dsp::Key::Minor(idx) => Self::from_pitch_class(*idx as u8, true),
        }
    }

    pub fn pitch_class(&self) -> u8 {
        let idx = *self as usize;
        (idx % 12) as u8
    }

    pub fn is_minor(&self) -> bool {
        (*self as usize) >= 12
    }

    /// Short label such as "C#m" or "Eb"
    pub fn label(&self) -> &'static str {
        let pc = self.pitch_class() as usize;
        if self.is_minor() {
            MINOR_LABELS[pc]
        } else {
            MAJOR_LABELS[pc]
        }
    }

    /// Get human-readable key name
    pub fn name(&self) -> &'static str {
        match self {
            MusicalKey::CMajor => "C Major",
            MusicalKey::DbMajor => "Db Major",
            MusicalKey::DMajor => "D Major",
            MusicalKey::EbMajor => "Eb Major",
            MusicalKey::EMajor => "E Major",
            MusicalKey::FMajor => "F Major",
            MusicalKey::GbMajor => "Gb Major",
            MusicalKey::GMajor => "G Major",
            MusicalKey::AbMajor => "Ab Major",
            MusicalKey::AMajor => "A Major",
            MusicalKey::BbMajor => "Bb Major",
            MusicalKey::BMajor => "B Major",

            MusicalKey::CMinor => "C Minor",
            MusicalKey::CsMinor => "C# Minor",
            MusicalKey::DMinor => "D Minor",
            MusicalKey::EbMinor => "Eb Minor",
            MusicalKey::EMinor => "E Minor",
            MusicalKey::FMinor => "F Minor",
            MusicalKey::FsMinor => "F# Minor",
            MusicalKey::GMinor => "G Minor",
            MusicalKey::AbMinor => "Ab Minor",
            MusicalKey::AMinor => "A Minor",
            MusicalKey::BbMinor => "Bb Minor",
            MusicalKey::BMinor => "B Minor",
        }
    }

    /// Camelot wheel code, e.g. "8A" for A minor
    pub fn camelot(&self) -> String {
        let pc = self.pitch_class() as usize;
        if self.is_minor() {
            format!("{}A", CAMELOT_MINOR[pc])
        } else {
            format!("{}B", CAMELOT_MAJOR[pc])
        }
    }

    /// Token used in file names: lowercase, '#' spelled as 's' ("csm", "eb")
    pub fn file_token(&self) -> String {
        self.label().to_lowercase().replace('#', "s")
    }
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MusicalKey {
    type Err = String;

    /// Accepts labels ("C#m"), names ("c# minor"), file tokens ("csm") and
    /// sharp/flat spellings of the same pitch.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();

        let (root, minor) = if let Some(r) = lower.strip_suffix(" minor") {
            (r.to_string(), true)
        } else if let Some(r) = lower.strip_suffix(" major") {
            (r.to_string(), false)
        } else if let Some(r) = lower.strip_suffix("min") {
            (r.to_string(), true)
        } else if let Some(r) = lower.strip_suffix("maj") {
            (r.to_string(), false)
        } else if let Some(r) = lower.strip_suffix('m') {
            (r.to_string(), true)
        } else {
            (lower.clone(), false)
        };

        let pitch_class = match root.trim() {
            "c" => 0,
            "c#" | "cs" | "db" => 1,
            "d" => 2,
            "d#" | "ds" | "eb" => 3,
            "e" => 4,
            "f" => 5,
            "f#" | "fs" | "gb" => 6,
            "g" => 7,
            "g#" | "gs" | "ab" => 8,
            "a" => 9,
            "a#" | "as" | "bb" => 10,
            "b" => 11,
            _ => return Err(format!("Unknown key: {}", s)),
        };

        MusicalKey::from_pitch_class(pitch_class, minor).ok_or_else(|| format!("Unknown key: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_class_roundtrip() {
        for pc in 0..12u8 {
            let major = MusicalKey::from_pitch_class(pc, false).unwrap();
            let minor = MusicalKey::from_pitch_class(pc, true).unwrap();
            assert_eq!(major.pitch_class(), pc);
            assert_eq!(minor.pitch_class(), pc);
            assert!(!major.is_minor());
            assert!(minor.is_minor());
        }
        assert!(MusicalKey::from_pitch_class(12, false).is_none());
    }

    #[test]
    fn test_labels_and_names() {
        assert_eq!(MusicalKey::CsMinor.label(), "C#m");
        assert_eq!(MusicalKey::CsMinor.name(), "C# Minor");
        assert_eq!(MusicalKey::EbMajor.label(), "Eb");
        assert_eq!(MusicalKey::AMinor.to_string(), "Am");
    }

    #[test]
    fn test_camelot() {
        assert_eq!(MusicalKey::AMinor.camelot(), "8A");
        assert_eq!(MusicalKey::CMajor.camelot(), "8B");
        assert_eq!(MusicalKey::FsMinor.camelot(), "11A");
        assert_eq!(MusicalKey::BMajor.camelot(), "1B");
    }

    #[test]
    fn test_parse_spellings() {
        assert_eq!("C#m".parse::<MusicalKey>().unwrap(), MusicalKey::CsMinor);
        assert_eq!("db minor".parse::<MusicalKey>().unwrap(), MusicalKey::CsMinor);
        assert_eq!("csm".parse::<MusicalKey>().unwrap(), MusicalKey::CsMinor);
        assert_eq!("Eb".parse::<MusicalKey>().unwrap(), MusicalKey::EbMajor);
        assert_eq!("g major".parse::<MusicalKey>().unwrap(), MusicalKey::GMajor);
        assert_eq!("amin".parse::<MusicalKey>().unwrap(), MusicalKey::AMinor);
        assert!("h".parse::<MusicalKey>().is_err());
    }

    #[test]
    fn test_file_token_parses_back() {
        for pc in 0..12u8 {
            for minor in [false, true] {
                let key = MusicalKey::from_pitch_class(pc, minor).unwrap();
                assert_eq!(key.file_token().parse::<MusicalKey>().unwrap(), key);
            }
        }
    }
}
