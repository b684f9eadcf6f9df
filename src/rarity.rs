use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::Record;

/// Rarity tier of a card, ordered from most to least common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    UltraRare,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::UltraRare,
    ];

    pub fn from_score(score: u32) -> Self {
        match score {
            6.. => Rarity::UltraRare,
            4..=5 => Rarity::Rare,
            2..=3 => Rarity::Uncommon,
            _ => Rarity::Common,
        }
    }

    /// Bleed colour for the tier as RGB.
    pub fn color(self) -> [u8; 3] {
        match self {
            Rarity::Common => [0x9e, 0x9e, 0x9e],
            Rarity::Uncommon => [0x2e, 0x7d, 0x32],
            Rarity::Rare => [0x15, 0x65, 0xc0],
            Rarity::UltraRare => [0xff, 0xb3, 0x00],
        }
    }

    pub fn hex(self) -> String {
        let [r, g, b] = self.color();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Key used to look up the card background template.
    pub fn template_key(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::UltraRare => "ultra_rare",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rarity::Common => write!(f, "common"),
            Rarity::Uncommon => write!(f, "uncommon"),
            Rarity::Rare => write!(f, "rare"),
            Rarity::UltraRare => write!(f, "ultra-rare"),
        }
    }
}

/// Field names the classifier reads its three signals from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarityFields {
    pub year: String,
    pub value: String,
    pub grading: String,
}

impl Default for RarityFields {
    fn default() -> Self {
        Self {
            year: "year".to_string(),
            value: "value".to_string(),
            grading: "grading".to_string(),
        }
    }
}

/// Per-signal breakdown of a record's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RarityScore {
    pub year: u32,
    pub value: u32,
    pub grading: u32,
}

impl RarityScore {
    pub fn total(&self) -> u32 {
        self.year + self.value + self.grading
    }

    pub fn rarity(&self) -> Rarity {
        Rarity::from_score(self.total())
    }
}

pub fn classify(record: &Record, fields: &RarityFields) -> Rarity {
    score(record, fields).rarity()
}

pub fn score(record: &Record, fields: &RarityFields) -> RarityScore {
    let field = |name: &str| record.get_loose(name).unwrap_or("");
    RarityScore {
        year: year_points(leading_int(field(&fields.year))),
        value: value_points(money(field(&fields.value))),
        grading: grading_points(field(&fields.grading)),
    }
}

fn year_points(year: i64) -> u32 {
    if year < 1900 {
        3
    } else if year < 1950 {
        2
    } else if year < 2000 {
        1
    } else {
        0
    }
}

fn value_points(value: f64) -> u32 {
    if value > 30.0 {
        3
    } else if value > 20.0 {
        2
    } else if value > 10.0 {
        1
    } else {
        0
    }
}

fn grading_points(raw: &str) -> u32 {
    let grade = raw.to_uppercase();
    if !(grade.contains("MS") || grade.contains("PF")) {
        return 0;
    }
    let has_any = |needles: &[&str]| needles.iter().any(|n| grade.contains(n));
    if has_any(&["70", "69"]) {
        3
    } else if has_any(&["68", "67"]) {
        2
    } else if has_any(&["66", "65"]) {
        1
    } else {
        0
    }
}

/// Leading integer after optional whitespace and sign; no digits is 0.
///
/// Digit runs too long for `i64` saturate instead of falling back to 0.
fn leading_int(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return 0;
    }
    digits.parse::<i64>().map_or(sign * i64::MAX, |v| sign * v)
}

/// Monetary amount: keep digits and dots, then read the longest leading decimal.
fn money(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut seen_dot = false;
    let end = cleaned
        .char_indices()
        .find(|&(_, c)| {
            if c == '.' {
                if seen_dot {
                    return true;
                }
                seen_dot = true;
            }
            false
        })
        .map(|(idx, _)| idx)
        .unwrap_or(cleaned.len());
    cleaned[..end].parse::<f64>().unwrap_or(0.0)
}
