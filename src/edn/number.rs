//! Numeric literal classification and conversion.
//!
//! The lexer only decides which kind of number a run of characters is;
//! turning the text into a value happens here once the parser asks for it.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use thiserror::Error;

use crate::edn::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberClass {
    /// `42`, `-7`, `0x1F`, `2r1010`, `017`, `42N`
    Integer,
    /// `3/4`
    Ratio,
    /// `3.14`, `1e10`, `.5`
    Float,
    /// `3.14M`, `10M`
    Decimal,
}

#[derive(Error, Debug, PartialEq)]
pub enum NumberError {
    #[error("digits are not valid in radix {0}")]
    Digits(u32),

    #[error("radix {0} is out of range (2-36)")]
    Radix(u32),

    #[error("ratio has a zero denominator")]
    DivisionByZero,

    #[error("floating point literal overflows a 64-bit float")]
    Overflow,

    #[error("invalid decimal literal")]
    Decimal,

    #[error("decimal scale {0} is out of range (at most 10000 either way)")]
    DecimalScale(i64),
}

/// Largest decimal scale, positive or negative, a literal may produce.
pub const MAX_DECIMAL_SCALE: i64 = 10_000;

/// Decide what kind of number `text` is, or explain why it is not one.
pub fn classify(text: &str) -> Result<NumberClass, String> {
    let body = strip_sign(text).1;

    if let Some((numerator, denominator)) = body.split_once('/') {
        return if is_digits(numerator) && is_digits(denominator) {
            Ok(NumberClass::Ratio)
        } else {
            Err(format!("invalid ratio literal '{}'", text))
        };
    }

    if let Some(digits) = strip_bigint_suffix(body) {
        return if is_integer_form(digits) {
            Ok(NumberClass::Integer)
        } else {
            Err(format!("invalid integer literal '{}'", text))
        };
    }

    if let Some(digits) = body.strip_suffix('M') {
        return if is_digits(digits) || is_float_form(digits) {
            Ok(NumberClass::Decimal)
        } else {
            Err(format!("invalid decimal literal '{}'", text))
        };
    }

    if is_integer_form(body) {
        Ok(NumberClass::Integer)
    } else if is_float_form(body) {
        Ok(NumberClass::Float)
    } else if body.matches('.').count() > 1 {
        Err(format!("invalid number '{}': multiple decimal points", text))
    } else {
        Err(format!("invalid number '{}'", text))
    }
}

/// Convert a literal previously classified as `class`.
pub fn convert(class: NumberClass, text: &str) -> Result<Value, NumberError> {
    let (negative, body) = strip_sign(text);
    match class {
        NumberClass::Integer => {
            let body = strip_bigint_suffix(body).unwrap_or(body);
            let magnitude = parse_integer(body)?;
            Ok(Value::Integer(if negative { -magnitude } else { magnitude }))
        }
        NumberClass::Ratio => {
            let (numerator, denominator) = body.split_once('/').ok_or(NumberError::Digits(10))?;
            let numerator = parse_radix(numerator, 10)?;
            let denominator = parse_radix(denominator, 10)?;
            if denominator.is_zero() {
                return Err(NumberError::DivisionByZero);
            }
            let numerator = if negative { -numerator } else { numerator };
            let ratio = BigRational::new(numerator, denominator);
            if ratio.is_integer() {
                Ok(Value::Integer(ratio.to_integer()))
            } else {
                Ok(Value::Ratio(ratio))
            }
        }
        NumberClass::Float => {
            let value = f64::from_str(text).map_err(|_| NumberError::Digits(10))?;
            if value.is_infinite() {
                Err(NumberError::Overflow)
            } else {
                Ok(Value::Float(value))
            }
        }
        NumberClass::Decimal => {
            let body = body.strip_suffix('M').unwrap_or(body);
            let mut normalized = String::with_capacity(body.len() + 3);
            if negative {
                normalized.push('-');
            }
            if body.starts_with('.') {
                normalized.push('0');
            }
            normalized.push_str(body);
            if body.ends_with('.') {
                normalized.push('0');
            }
            let decimal = BigDecimal::from_str(&normalized).map_err(|_| NumberError::Decimal)?;
            let (_, scale) = decimal.as_bigint_and_exponent();
            if scale.unsigned_abs() > MAX_DECIMAL_SCALE.unsigned_abs() {
                return Err(NumberError::DecimalScale(scale));
            }
            Ok(Value::Decimal(decimal))
        }
    }
}

/// Digits before an `N` suffix. In radix literals `N` is a digit, not a suffix.
fn strip_bigint_suffix(body: &str) -> Option<&str> {
    if body.contains(['r', 'R']) {
        None
    } else {
        body.strip_suffix('N')
    }
}

fn parse_integer(body: &str) -> Result<BigInt, NumberError> {
    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        return parse_radix(hex, 16);
    }
    if let Some((radix, digits)) = body.split_once(['r', 'R']) {
        let radix = radix.parse::<u32>().map_err(|_| NumberError::Digits(10))?;
        return parse_radix(digits, radix);
    }
    // Leading zero means octal, as in the Clojure reader.
    if body.len() > 1 && body.starts_with('0') {
        return parse_radix(&body[1..], 8);
    }
    parse_radix(body, 10)
}

fn parse_radix(digits: &str, radix: u32) -> Result<BigInt, NumberError> {
    if !(2..=36).contains(&radix) {
        return Err(NumberError::Radix(radix));
    }
    BigInt::parse_bytes(digits.as_bytes(), radix).ok_or(NumberError::Digits(radix))
}

fn strip_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else {
        (false, text.strip_prefix('+').unwrap_or(text))
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_integer_form(s: &str) -> bool {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }
    if let Some((radix, digits)) = s.split_once(['r', 'R']) {
        return is_digits(radix)
            && radix.len() <= 2
            && !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_alphanumeric());
    }
    is_digits(s)
}

fn is_float_form(s: &str) -> bool {
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(at) => (&s[..at], Some(&s[at + 1..])),
        None => (s, None),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (mantissa, None),
    };
    let whole_ok = whole.is_empty() || is_digits(whole);
    let fraction_ok = fraction.map_or(true, |f| f.is_empty() || is_digits(f));
    let has_digit = !whole.is_empty() || fraction.map_or(false, |f| !f.is_empty());
    let exponent_ok = exponent.map_or(true, |e| is_digits(strip_sign(e).1));
    whole_ok
        && fraction_ok
        && has_digit
        && exponent_ok
        && (fraction.is_some() || exponent.is_some())
}
