//! Lot code vocabulary and formatting
//!
//! Lot number formats:
//! - Roasted coffee: `{level}/{YEARMONTHDAY}/{seq}` (e.g. `V/2025NOV05/1`)
//! - Drip coffee: `TG/{level}/{YEARMONTHDAY}/{seq}`
//! - Cold brew: `CB/{YEARMONTHDAY}/{seq}`
//! - Advent calendar: `AK/{YEARMONTHDAY}/{seq}`
//!
//! The date part uses a closed table of Hungarian month codes, not a
//! locale-driven abbreviation. Codes are 3 to 5 letters long (SZEPT), so
//! parsing matches the table rather than slicing fixed widths.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hungarian month codes, indexed by month - 1.
pub const MONTH_CODES: [&str; 12] = [
    "JAN", "FEB", "MÁR", "ÁPR", "MÁJ", "JÚN", "JÚL", "AUG", "SZEPT", "OKT", "NOV", "DEC",
];

/// Prefix for drip coffee production lots.
pub const DRIP_PREFIX: &str = "TG";
/// Prefix for cold brew production lots.
pub const COLD_BREW_PREFIX: &str = "CB";
/// Prefix for advent calendar production lots.
pub const ADVENT_PREFIX: &str = "AK";

/// Errors raised while parsing a lot code.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LotParseError {
    #[error("invalid roast level: {0}")]
    InvalidRoastLevel(String),

    #[error("invalid date part: {0}")]
    InvalidDatePart(String),

    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    #[error("unknown lot format: {0}")]
    UnknownFormat(String),
}

/// Roast level codes printed on packaging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoastLevel {
    #[serde(rename = "V")]
    Light,
    #[serde(rename = "K")]
    Medium,
    #[serde(rename = "S")]
    Dark,
}

impl RoastLevel {
    /// Single-letter code used in lot numbers and the database.
    pub fn code(&self) -> &'static str {
        match self {
            RoastLevel::Light => "V",
            RoastLevel::Medium => "K",
            RoastLevel::Dark => "S",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "V" => Some(RoastLevel::Light),
            "K" => Some(RoastLevel::Medium),
            "S" => Some(RoastLevel::Dark),
            _ => None,
        }
    }

    /// Human-readable name (Hungarian with English gloss).
    pub fn name(&self) -> &'static str {
        match self {
            RoastLevel::Light => "Világos (Light)",
            RoastLevel::Medium => "Közepes (Medium)",
            RoastLevel::Dark => "Sötét (Dark)",
        }
    }

    pub fn all() -> [RoastLevel; 3] {
        [RoastLevel::Light, RoastLevel::Medium, RoastLevel::Dark]
    }
}

/// Production (packaging) run kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionType {
    #[serde(rename = "whole_bean_16")]
    WholeBean16,
    #[serde(rename = "whole_bean_70")]
    WholeBean70,
    #[serde(rename = "whole_bean_250")]
    WholeBean250,
    #[serde(rename = "drip_11")]
    Drip11,
    #[serde(rename = "cold_brew")]
    ColdBrew,
    #[serde(rename = "market")]
    Market,
    #[serde(rename = "sampling")]
    Sampling,
    #[serde(rename = "advent")]
    Advent,
}

impl ProductionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionType::WholeBean16 => "whole_bean_16",
            ProductionType::WholeBean70 => "whole_bean_70",
            ProductionType::WholeBean250 => "whole_bean_250",
            ProductionType::Drip11 => "drip_11",
            ProductionType::ColdBrew => "cold_brew",
            ProductionType::Market => "market",
            ProductionType::Sampling => "sampling",
            ProductionType::Advent => "advent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "whole_bean_16" => Some(ProductionType::WholeBean16),
            "whole_bean_70" => Some(ProductionType::WholeBean70),
            "whole_bean_250" => Some(ProductionType::WholeBean250),
            "drip_11" => Some(ProductionType::Drip11),
            "cold_brew" => Some(ProductionType::ColdBrew),
            "market" => Some(ProductionType::Market),
            "sampling" => Some(ProductionType::Sampling),
            "advent" => Some(ProductionType::Advent),
            _ => None,
        }
    }

    /// Fixed package size in grams, or None for variable-weight kinds.
    pub fn package_size_g(&self) -> Option<i32> {
        match self {
            ProductionType::WholeBean16 => Some(16),
            ProductionType::WholeBean70 => Some(70),
            ProductionType::WholeBean250 => Some(250),
            ProductionType::Drip11 => Some(11),
            _ => None,
        }
    }

    /// Whole bean, market and sampling runs carry the source roast lot
    /// verbatim instead of an independently sequenced production lot.
    pub fn reuses_roast_lot(&self) -> bool {
        matches!(
            self,
            ProductionType::WholeBean16
                | ProductionType::WholeBean70
                | ProductionType::WholeBean250
                | ProductionType::Market
                | ProductionType::Sampling
        )
    }

    /// Sequence-counter category for kinds with their own lot series.
    /// Drip lots embed the roast level, so the level is required there.
    pub fn lot_category(&self, level: Option<RoastLevel>) -> Option<String> {
        match self {
            ProductionType::Drip11 => Some(format!("{}/{}", DRIP_PREFIX, level?.code())),
            ProductionType::ColdBrew => Some(COLD_BREW_PREFIX.to_string()),
            ProductionType::Advent => Some(ADVENT_PREFIX.to_string()),
            _ => None,
        }
    }
}

/// Month code for a 1-based month number.
pub fn month_code(month: u32) -> Option<&'static str> {
    MONTH_CODES.get(month.checked_sub(1)? as usize).copied()
}

/// Format the date part of a lot code, e.g. `2025NOV05`.
pub fn format_date_part(date: NaiveDate) -> String {
    // month() is always 1-12, so the table lookup cannot miss
    let code = MONTH_CODES[(date.month() - 1) as usize];
    format!("{}{}{:02}", date.year(), code, date.day())
}

/// Parse a `YEARMONTHDAY` date part back into a date.
pub fn parse_date_part(part: &str) -> Result<NaiveDate, LotParseError> {
    let invalid = || LotParseError::InvalidDatePart(part.to_string());

    let year: i32 = part.get(..4).ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    let rest = part.get(4..).ok_or_else(invalid)?;

    for (idx, code) in MONTH_CODES.iter().enumerate() {
        if let Some(day_part) = rest.strip_prefix(code) {
            let day: u32 = day_part.parse().map_err(|_| invalid())?;
            return NaiveDate::from_ymd_opt(year, idx as u32 + 1, day).ok_or_else(invalid);
        }
    }

    Err(invalid())
}

/// Build a lot code from a sequence category, date and day sequence.
///
/// The category already carries the full prefix (`V`, `TG/K`, `CB`, `AK`),
/// so this covers every independently sequenced lot series.
pub fn lot_from_category(category: &str, date: NaiveDate, sequence: u32) -> String {
    format!("{}/{}/{}", category, format_date_part(date), sequence)
}

/// Build a roast lot code, e.g. `V/2025NOV05/1`.
pub fn roast_lot(level: RoastLevel, date: NaiveDate, sequence: u32) -> String {
    lot_from_category(level.code(), date, sequence)
}

/// Build a drip production lot, e.g. `TG/V/2025NOV05/1`.
pub fn drip_lot(level: RoastLevel, date: NaiveDate, sequence: u32) -> String {
    format!("{}/{}/{}/{}", DRIP_PREFIX, level.code(), format_date_part(date), sequence)
}

/// Build a cold brew production lot, e.g. `CB/2025NOV05/1`.
pub fn cold_brew_lot(date: NaiveDate, sequence: u32) -> String {
    lot_from_category(COLD_BREW_PREFIX, date, sequence)
}

/// Build an advent calendar production lot, e.g. `AK/2025NOV05/1`.
pub fn advent_lot(date: NaiveDate, sequence: u32) -> String {
    lot_from_category(ADVENT_PREFIX, date, sequence)
}

/// A lot code broken into its components
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedLot {
    Roast {
        level: RoastLevel,
        date: NaiveDate,
        sequence: u32,
    },
    Drip {
        level: RoastLevel,
        date: NaiveDate,
        sequence: u32,
    },
    ColdBrew {
        date: NaiveDate,
        sequence: u32,
    },
    Advent {
        date: NaiveDate,
        sequence: u32,
    },
}

impl ParsedLot {
    pub fn date(&self) -> NaiveDate {
        match self {
            ParsedLot::Roast { date, .. }
            | ParsedLot::Drip { date, .. }
            | ParsedLot::ColdBrew { date, .. }
            | ParsedLot::Advent { date, .. } => *date,
        }
    }

    pub fn sequence(&self) -> u32 {
        match self {
            ParsedLot::Roast { sequence, .. }
            | ParsedLot::Drip { sequence, .. }
            | ParsedLot::ColdBrew { sequence, .. }
            | ParsedLot::Advent { sequence, .. } => *sequence,
        }
    }
}

fn parse_sequence(s: &str) -> Result<u32, LotParseError> {
    let seq: u32 = s
        .parse()
        .map_err(|_| LotParseError::InvalidSequence(s.to_string()))?;
    if seq == 0 {
        return Err(LotParseError::InvalidSequence(s.to_string()));
    }
    Ok(seq)
}

/// Parse a lot code of any kind into its components.
pub fn parse_lot(code: &str) -> Result<ParsedLot, LotParseError> {
    let parts: Vec<&str> = code.split('/').collect();

    match parts.as_slice() {
        [DRIP_PREFIX, level, date, seq] => Ok(ParsedLot::Drip {
            level: RoastLevel::from_code(level)
                .ok_or_else(|| LotParseError::InvalidRoastLevel(level.to_string()))?,
            date: parse_date_part(date)?,
            sequence: parse_sequence(seq)?,
        }),
        [COLD_BREW_PREFIX, date, seq] => Ok(ParsedLot::ColdBrew {
            date: parse_date_part(date)?,
            sequence: parse_sequence(seq)?,
        }),
        [ADVENT_PREFIX, date, seq] => Ok(ParsedLot::Advent {
            date: parse_date_part(date)?,
            sequence: parse_sequence(seq)?,
        }),
        [level, date, seq] => Ok(ParsedLot::Roast {
            level: RoastLevel::from_code(level)
                .ok_or_else(|| LotParseError::InvalidRoastLevel(level.to_string()))?,
            date: parse_date_part(date)?,
            sequence: parse_sequence(seq)?,
        }),
        _ => Err(LotParseError::UnknownFormat(code.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nov5() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 5).unwrap()
    }

    #[test]
    fn formats_the_documented_examples() {
        assert_eq!(roast_lot(RoastLevel::Light, nov5(), 1), "V/2025NOV05/1");
        assert_eq!(drip_lot(RoastLevel::Light, nov5(), 1), "TG/V/2025NOV05/1");
        assert_eq!(cold_brew_lot(nov5(), 1), "CB/2025NOV05/1");
        assert_eq!(advent_lot(nov5(), 1), "AK/2025NOV05/1");
    }

    #[test]
    fn date_part_round_trips_every_month() {
        for month in 1..=12 {
            let date = NaiveDate::from_ymd_opt(2025, month, 7).unwrap();
            let part = format_date_part(date);
            assert_eq!(parse_date_part(&part).unwrap(), date, "month {month}");
        }
    }

    #[test]
    fn szept_is_five_letters_and_still_parses() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 30).unwrap();
        assert_eq!(format_date_part(date), "2025SZEPT30");
        assert_eq!(parse_date_part("2025SZEPT30").unwrap(), date);
    }

    #[test]
    fn parse_lot_classifies_all_kinds() {
        assert_eq!(
            parse_lot("V/2025NOV05/1").unwrap(),
            ParsedLot::Roast {
                level: RoastLevel::Light,
                date: nov5(),
                sequence: 1
            }
        );
        assert_eq!(
            parse_lot("TG/K/2025NOV05/3").unwrap(),
            ParsedLot::Drip {
                level: RoastLevel::Medium,
                date: nov5(),
                sequence: 3
            }
        );
        assert!(matches!(parse_lot("CB/2025NOV05/1"), Ok(ParsedLot::ColdBrew { .. })));
        assert!(matches!(parse_lot("AK/2025NOV05/2"), Ok(ParsedLot::Advent { .. })));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_lot("X/2025NOV05/1").is_err());
        assert!(parse_lot("V/2025XYZ05/1").is_err());
        assert!(parse_lot("V/2025NOV05/0").is_err());
        assert!(parse_lot("no-slashes").is_err());
    }

    #[test]
    fn drip_category_embeds_the_level() {
        assert_eq!(
            ProductionType::Drip11.lot_category(Some(RoastLevel::Light)),
            Some("TG/V".to_string())
        );
        assert_eq!(ProductionType::Drip11.lot_category(None), None);
        assert_eq!(ProductionType::ColdBrew.lot_category(None), Some("CB".to_string()));
        assert_eq!(ProductionType::WholeBean250.lot_category(None), None);
    }
}
