//! Instrument catalogue and symbol-file parsing shared between client and server.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::MarketError;

/// Trait providing file parsing for instrument symbols.
pub trait SymbolParser {
    /// Parses instruments from a buffered reader.
    ///
    /// Symbols may be separated by commas, whitespace or new lines; blank lines are
    /// skipped. Returns an error on the first symbol that is not in the catalogue.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Instrument>, MarketError>;
}

impl SymbolParser for Instrument {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Self>, MarketError> {
        let mut instruments = Vec::new();

        for line_result in reader.lines() {
            let line = line_result.map_err(MarketError::Io)?;
            for token in line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
            {
                match token.parse::<Self>() {
                    Ok(instrument) => {
                        if !instruments.contains(&instrument) {
                            instruments.push(instrument);
                        }
                    }
                    Err(_) => return Err(MarketError::UnknownSymbol(token.to_string())),
                }
            }
        }
        Ok(instruments)
    }
}

/// Whether an instrument is a single equity or an index aggregate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstrumentKind {
    /// Listed equity.
    Equity,
    /// Index aggregate with a fixed base value and high/low band.
    Index {
        /// Starting value of the index.
        base: f64,
        /// Distance of the reported high/low from the current value.
        band: f64,
    },
}

/// Set of supported instrument symbols.
#[allow(missing_docs)]
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    ValueEnum,
    Display,
    EnumString,
    EnumIter,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
)]
#[clap(rename_all = "UPPER")]
#[strum(ascii_case_insensitive)]
pub enum Instrument {
    RELIANCE,
    TCS,
    HDFCBANK,
    INFY,
    HINDUNILVR,
    ICICIBANK,
    ITC,
    SBIN,
    BHARTIARTL,
    KOTAKBANK,
    NIFTY50,
    SENSEX,
    BANKNIFTY,
}

impl Instrument {
    /// Tracked equities in display order.
    pub const EQUITIES: [Instrument; 10] = [
        Instrument::RELIANCE,
        Instrument::TCS,
        Instrument::HDFCBANK,
        Instrument::INFY,
        Instrument::HINDUNILVR,
        Instrument::ICICIBANK,
        Instrument::ITC,
        Instrument::SBIN,
        Instrument::BHARTIARTL,
        Instrument::KOTAKBANK,
    ];

    /// Index aggregates, ordered primary, secondary, tertiary.
    pub const INDICES: [Instrument; 3] =
        [Instrument::NIFTY50, Instrument::SENSEX, Instrument::BANKNIFTY];

    /// Human-readable name shown next to the symbol.
    pub fn display_name(&self) -> &'static str {
        match self {
            Instrument::RELIANCE => "Reliance Industries Ltd",
            Instrument::TCS => "Tata Consultancy Services",
            Instrument::HDFCBANK => "HDFC Bank Ltd",
            Instrument::INFY => "Infosys Ltd",
            Instrument::HINDUNILVR => "Hindustan Unilever Ltd",
            Instrument::ICICIBANK => "ICICI Bank Ltd",
            Instrument::ITC => "ITC Ltd",
            Instrument::SBIN => "State Bank of India",
            Instrument::BHARTIARTL => "Bharti Airtel Ltd",
            Instrument::KOTAKBANK => "Kotak Mahindra Bank Ltd",
            Instrument::NIFTY50 => "NIFTY 50",
            Instrument::SENSEX => "BSE SENSEX",
            Instrument::BANKNIFTY => "NIFTY BANK",
        }
    }

    /// Equity or index, with the index parameters.
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Instrument::NIFTY50 => InstrumentKind::Index {
                base: 19_500.0,
                band: 50.0,
            },
            Instrument::SENSEX => InstrumentKind::Index {
                base: 65_000.0,
                band: 200.0,
            },
            Instrument::BANKNIFTY => InstrumentKind::Index {
                base: 44_000.0,
                band: 100.0,
            },
            _ => InstrumentKind::Equity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use strum::IntoEnumIterator;

    #[test]
    fn parses_mixed_separators_and_dedupes() {
        let input = "reliance, TCS\n\n  infy\tTCS\n";
        let parsed = Instrument::parse_from_file(Cursor::new(input)).unwrap();
        assert_eq!(
            parsed,
            vec![Instrument::RELIANCE, Instrument::TCS, Instrument::INFY]
        );
    }

    #[test]
    fn rejects_unknown_symbol() {
        let err = Instrument::parse_from_file(Cursor::new("TCS,AAPL")).unwrap_err();
        assert!(matches!(err, MarketError::UnknownSymbol(s) if s == "AAPL"));
    }

    #[test]
    fn catalogue_covers_every_variant() {
        let listed: Vec<Instrument> = Instrument::EQUITIES
            .iter()
            .chain(Instrument::INDICES.iter())
            .copied()
            .collect();
        assert_eq!(listed.len(), Instrument::iter().count());
        for instrument in Instrument::INDICES {
            assert!(matches!(instrument.kind(), InstrumentKind::Index { .. }));
        }
        assert_eq!(Instrument::SENSEX.to_string(), "SENSEX");
    }

    #[test]
    fn index_parameters_compare_by_value() {
        assert_eq!(Instrument::TCS.kind(), InstrumentKind::Equity);
        assert_eq!(
            Instrument::BANKNIFTY.kind(),
            InstrumentKind::Index {
                base: 44_000.0,
                band: 100.0,
            }
        );
        assert_ne!(Instrument::NIFTY50.kind(), Instrument::SENSEX.kind());
    }
}
