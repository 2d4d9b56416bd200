use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::engine::price::{Price, PriceError};
use crate::engine::types::{EngineError, OptionType};

/// Strikes inside option symbols carry three decimal places (mills).
pub const STRIKE_SCALE: i64 = 1000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("cannot parse option symbol {symbol:?}: {reason}")]
    Unparseable { symbol: String, reason: String },
}

/// The pieces of one option contract recovered from its symbol. The strike
/// is at [`STRIKE_SCALE`]; leg construction rescales it onto the tick grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSymbol {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub strike: Price,
}

/// Turns a raw option symbol into its parts. Pluggable so brokers with
/// non-standard grammars can supply their own.
pub trait SymbolParser: Send + Sync + fmt::Debug {
    fn parse(&self, symbol: &str) -> Result<ParsedSymbol, SymbolError>;
}

/// Parser for the OCC/OSI option symbol grammar used by US brokers:
/// `<root><yymmdd><C|P><strike x 1000, 8 digits>`, e.g.
/// `AAPL240119C00195000`. Space-padded roots are accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct OccParser;

impl SymbolParser for OccParser {
    fn parse(&self, symbol: &str) -> Result<ParsedSymbol, SymbolError> {
        let fail = |reason: &str| SymbolError::Unparseable {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = symbol.trim();
        if !trimmed.is_ascii() {
            return Err(fail("non-ASCII characters"));
        }
        // Minimum: 1-char root + 6-digit date + type char + 8-digit strike.
        if trimmed.len() < 16 {
            return Err(fail("too short for root, date, type and strike"));
        }

        let (head, strike_digits) = trimmed.split_at(trimmed.len() - 8);
        let (head, type_char) = head.split_at(head.len() - 1);
        let (root, date_digits) = head.split_at(head.len() - 6);

        let root = root.trim_end();
        if root.is_empty() || !root.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(fail("underlying root must be alphanumeric"));
        }

        if !date_digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(fail("expiration must be six digits (yymmdd)"));
        }
        let year = 2000
            + date_digits[0..2]
                .parse::<i32>()
                .map_err(|_| fail("bad expiration year"))?;
        let month = date_digits[2..4]
            .parse::<u32>()
            .map_err(|_| fail("bad expiration month"))?;
        let day = date_digits[4..6]
            .parse::<u32>()
            .map_err(|_| fail("bad expiration day"))?;
        let expiration = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| fail("expiration is not a calendar date"))?;

        let option_type = match type_char {
            "C" | "c" => OptionType::Call,
            "P" | "p" => OptionType::Put,
            _ => return Err(fail("option type must be C or P")),
        };

        if !strike_digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(fail("strike must be eight digits"));
        }
        let raw = strike_digits
            .parse::<i64>()
            .map_err(|_| fail("strike out of range"))?;
        let strike =
            Price::new(raw, STRIKE_SCALE).map_err(|err| fail(&err.to_string()))?;

        Ok(ParsedSymbol {
            underlying: root.to_string(),
            expiration,
            option_type,
            strike,
        })
    }
}

/// Inverse of [`OccParser`]: synthesize the symbol for a contract. Fails if
/// the strike cannot be expressed in mills or overflows the 8-digit field.
pub fn format_occ(
    underlying: &str,
    expiration: NaiveDate,
    option_type: OptionType,
    strike: Price,
) -> Result<String, EngineError> {
    let mills = strike.rescale(STRIKE_SCALE)?;
    if mills.is_negative() || mills.raw() > 99_999_999 {
        return Err(PriceError::OutOfRange {
            value: strike.to_f64(),
            scale: STRIKE_SCALE,
        }
        .into());
    }
    let type_char = match option_type {
        OptionType::Call => 'C',
        OptionType::Put => 'P',
    };
    Ok(format!(
        "{}{}{}{:08}",
        underlying.to_ascii_uppercase(),
        expiration.format("%y%m%d"),
        type_char,
        mills.raw()
    ))
}
