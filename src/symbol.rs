//! Decoding of source-broker option tickers into a broker-agnostic descriptor,
//! plus the underlying -> exchange-segment mappings for the target broker.
//!
//! Two ticker grammars exist side by side:
//!   weekly  `NIFTY25N0425800PE`   = NIFTY  2025 Nov 04  25800 PUT
//!   monthly `BANKNIFTY25NOV59500CE` = BANKNIFTY 2025 Nov ?? 59500 CALL
//! The monthly form carries no day; the actual contract date has to be looked
//! up from the target broker's expiry list at resolution time.

use crate::error::MirrorError;

/// Single-letter month codes used by the weekly grammar.
const WEEKLY_MONTH_CODES: [(char, u32); 12] = [
    ('J', 1),
    ('F', 2),
    ('M', 3),
    ('A', 4),
    ('Y', 5),
    ('H', 6),
    ('G', 7),
    ('U', 8),
    ('S', 9),
    ('O', 10),
    ('N', 11),
    ('D', 12),
];

const MONTH_ABBREVS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Month short names as the XTS expiry format wants them ("04Nov2025").
const MONTH_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const INDEX_UNDERLYINGS: [&str; 4] = ["NIFTY", "BANKNIFTY", "FINNIFTY", "MIDCPNIFTY"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Suffix code as both brokers spell it.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Call => "CE",
            Self::Put => "PE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Index,
    Stock,
}

impl Series {
    pub fn xts_code(&self) -> &'static str {
        match self {
            Self::Index => "OPTIDX",
            Self::Stock => "OPTSTK",
        }
    }
}

/// Normalized, broker-agnostic view of one option contract. Produced once per
/// source ticker and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDescriptor {
    pub underlying: String,
    pub year: i32,
    pub month: u32,
    /// None for monthly tickers, where the day is unknown until the expiry
    /// list has been consulted.
    pub day: Option<u32>,
    pub option_type: OptionType,
    pub strike: u32,
    pub series: Series,
}

impl OptionDescriptor {
    pub fn expiry_is_ambiguous_month(&self) -> bool {
        self.day.is_none()
    }

    /// Expiry in the target broker's lookup format, e.g. "04Nov2025".
    /// Monthly descriptors get a placeholder day of 01; callers must resolve
    /// the real date first.
    pub fn expiry_token(&self) -> String {
        expiry_token(self.day.unwrap_or(1), self.month, self.year)
    }
}

pub fn expiry_token(day: u32, month: u32, year: i32) -> String {
    format!("{:02}{}{}", day, MONTH_SHORT[(month - 1) as usize], year)
}

/// Decodes a source-broker option ticker under the weekly or monthly grammar.
pub fn decode(ticker: &str) -> Result<OptionDescriptor, MirrorError> {
    let malformed = || MirrorError::MalformedSymbol(ticker.to_string());

    if !ticker.is_ascii() {
        return Err(malformed());
    }
    let underlying_len = ticker.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if underlying_len == 0 {
        return Err(malformed());
    }
    let underlying = &ticker[..underlying_len];
    let rest = &ticker[underlying_len..];

    // YY prefix is common to both grammars.
    if rest.len() < 5 {
        return Err(malformed());
    }
    let yy: i32 = rest[..2].parse().map_err(|_| malformed())?;
    let year = 2000 + yy;

    // The 3 chars after the year disambiguate: a month abbreviation means the
    // monthly grammar, anything else (month letter + day digits) is weekly.
    let probe = rest[2..5].to_ascii_uppercase();
    let (month, day, tail) = if let Some(m) = MONTH_ABBREVS.iter().position(|a| *a == probe) {
        (m as u32 + 1, None, &rest[5..])
    } else {
        let code = rest[2..3].chars().next().ok_or_else(malformed)?;
        let month = WEEKLY_MONTH_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, m)| *m)
            .ok_or_else(malformed)?;
        let day: u32 = rest[3..5].parse().map_err(|_| malformed())?;
        if day == 0 || day > 31 {
            return Err(malformed());
        }
        (month, Some(day), &rest[5..])
    };

    let option_type = if tail.ends_with("PE") {
        OptionType::Put
    } else if tail.ends_with("CE") {
        OptionType::Call
    } else {
        return Err(malformed());
    };
    let strike: u32 = tail[..tail.len() - 2].parse().map_err(|_| malformed())?;
    if strike == 0 {
        return Err(malformed());
    }

    let series = if INDEX_UNDERLYINGS.contains(&underlying) {
        Series::Index
    } else {
        Series::Stock
    };

    Ok(OptionDescriptor {
        underlying: underlying.to_string(),
        year,
        month,
        day,
        option_type,
        strike,
        series,
    })
}

// ===== Exchange segment mappings =====
//
// Total functions by design: anything that is not SENSEX trades on the primary
// exchange's F&O segment.

/// Numeric segment code for market-data queries. 12 = BSEFO, 2 = NSEFO.
pub fn data_segment(underlying: &str) -> i32 {
    if underlying.to_ascii_uppercase().contains("SENSEX") {
        12
    } else {
        2
    }
}

/// Symbolic segment code for order placement.
pub fn order_segment(underlying: &str) -> &'static str {
    if underlying.to_ascii_uppercase().contains("SENSEX") {
        "BSEFO"
    } else {
        "NSEFO"
    }
}
