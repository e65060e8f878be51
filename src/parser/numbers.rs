//! The numeric literal grammar of the text format and the lazy interpretation
//! of the resulting tokens.
//!
//! Literal tokens store their sign and normalized digit sequence only;
//! the width-dependent value is computed by the pure `to_*` methods once the
//! parser knows the target type. Out-of-range magnitudes surface as
//! [`LiteralError::OutOfRange`] at that point, never as lexer failures.
//!
//! See <https://webassembly.github.io/spec/core/text/values.html#integers>

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, one_of};
use nom::combinator::{map, opt, verify};
use nom::sequence::{preceded, tuple};
use nom::IResult;
use thiserror::Error;

/// An error interpreting a literal at a concrete width.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum LiteralError {
    /// The magnitude does not fit the target width.
    #[error("constant out of range")]
    OutOfRange,
    /// An explicit sign where the grammar requires an unsigned integer.
    #[error("unexpected sign on unsigned integer")]
    UnexpectedSign,
    /// A NaN payload of zero or wider than the target significand.
    #[error("NaN payload out of range")]
    InvalidPayload,
}

/// An explicit sign character on a literal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Sign {
    Positive,
    Negative,
}

/// Either numeric token kind, as produced by the [`number`] recognizer.
#[derive(Clone, Debug, PartialEq)]
pub enum NumberToken {
    Integer(IntegerToken),
    Float(FloatToken),
}

/// An integer literal: optional sign, normalized digits, and radix.
/// The token is sign-normalized but not width-checked;
/// interpretation happens via the `to_*` methods.
///
/// # Examples
/// ```rust
/// use wat_vm::parser::{number, NumberToken};
///
/// let (rest, token) = number("-0x8000_0000").unwrap();
/// let NumberToken::Integer(integer) = token else { panic!() };
///
/// assert!(rest.is_empty());
/// assert_eq!(integer.to_i32(), Ok(i32::MIN));
/// assert!(integer.to_u32().is_err());
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IntegerToken {
    sign: Option<Sign>,
    digits: String,
    hex: bool,
}

impl IntegerToken {
    /// Creates a new integer token from normalized (underscore-free) digits.
    pub fn new(sign: Option<Sign>, digits: String, hex: bool) -> Self {
        IntegerToken { sign, digits, hex }
    }

    /// Whether the literal carried an explicit sign.
    pub fn is_signed(&self) -> bool {
        self.sign.is_some()
    }

    /// The magnitude of the literal as an unsigned 64-bit value.
    fn magnitude(&self) -> Result<u64, LiteralError> {
        let radix = if self.hex { 16 } else { 10 };
        let mut value: u64 = 0;

        for digit in self.digits.chars() {
            let digit = digit.to_digit(radix).expect("recognizer admits only digits");
            value = value
                .checked_mul(u64::from(radix))
                .and_then(|v| v.checked_add(u64::from(digit)))
                .ok_or(LiteralError::OutOfRange)?;
        }

        Ok(value)
    }

    /// Interprets the literal as a `u32` (indices, limits, offsets, alignments).
    /// Explicit signs are not part of the unsigned grammar.
    pub fn to_u32(&self) -> Result<u32, LiteralError> {
        if self.sign.is_some() {
            return Err(LiteralError::UnexpectedSign);
        }

        u32::try_from(self.magnitude()?).map_err(|_| LiteralError::OutOfRange)
    }

    /// Interprets the literal as the payload of an `i32.const`:
    /// unsigned forms cover `0..=u32::MAX` and reinterpret as two's complement;
    /// signed forms cover `-2^31..=2^31-1`.
    pub fn to_i32(&self) -> Result<i32, LiteralError> {
        let magnitude = self.magnitude()?;

        match self.sign {
            None => u32::try_from(magnitude)
                .map(|value| value as i32)
                .map_err(|_| LiteralError::OutOfRange),
            Some(Sign::Positive) => {
                i32::try_from(magnitude).map_err(|_| LiteralError::OutOfRange)
            }
            Some(Sign::Negative) => {
                if magnitude > 1 << 31 {
                    Err(LiteralError::OutOfRange)
                } else {
                    Ok((magnitude as u32).wrapping_neg() as i32)
                }
            }
        }
    }

    /// Interprets the literal as the payload of an `i64.const`.
    pub fn to_i64(&self) -> Result<i64, LiteralError> {
        let magnitude = self.magnitude()?;

        match self.sign {
            None => Ok(magnitude as i64),
            Some(Sign::Positive) => {
                i64::try_from(magnitude).map_err(|_| LiteralError::OutOfRange)
            }
            Some(Sign::Negative) => {
                if magnitude > 1 << 63 {
                    Err(LiteralError::OutOfRange)
                } else {
                    Ok(magnitude.wrapping_neg() as i64)
                }
            }
        }
    }

    /// Reinterprets this integer literal as a float literal,
    /// for `fN.const` operands written without a fraction or exponent.
    pub fn to_float(&self) -> FloatToken {
        let body = if self.hex {
            FloatBody::Hex {
                mantissa: self.digits.clone(),
                fraction_digits: 0,
                exponent: String::new(),
            }
        } else {
            FloatBody::Decimal {
                text: self.digits.clone(),
            }
        };

        FloatToken {
            sign: self.sign,
            body,
        }
    }
}

/// The shape of a float literal after sign extraction and underscore stripping.
#[derive(Clone, Debug, Eq, PartialEq)]
enum FloatBody {
    /// `inf`
    Infinity,
    /// `nan` or `nan:0xH`, with the payload's hex digits when present.
    NaN { payload: Option<String> },
    /// A decimal form such as `1.5e3`, stored ready for decimal parsing.
    Decimal { text: String },
    /// A hexadecimal form: mantissa digits with the dot removed,
    /// the count of digits that were fractional, and the decimal exponent text.
    Hex {
        mantissa: String,
        fraction_digits: u32,
        exponent: String,
    },
}

/// A float literal; the value is interpreted lazily at a known width.
///
/// # Examples
/// ```rust
/// use wat_vm::parser::{number, NumberToken};
///
/// let (_, token) = number("0x1.8p1").unwrap();
/// let NumberToken::Float(float) = token else { panic!() };
///
/// assert_eq!(float.to_f64(), Ok(3.0));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FloatToken {
    sign: Option<Sign>,
    body: FloatBody,
}

impl FloatToken {
    fn infinity(sign: Option<Sign>) -> Self {
        FloatToken {
            sign,
            body: FloatBody::Infinity,
        }
    }

    fn nan(sign: Option<Sign>, payload: Option<String>) -> Self {
        FloatToken {
            sign,
            body: FloatBody::NaN { payload },
        }
    }

    fn is_negative(&self) -> bool {
        self.sign == Some(Sign::Negative)
    }

    /// Interprets the literal as an `f64`.
    /// A finite literal whose magnitude exceeds the format is out of range.
    pub fn to_f64(&self) -> Result<f64, LiteralError> {
        let value = match &self.body {
            FloatBody::Infinity => f64::INFINITY,
            FloatBody::NaN { payload } => {
                let fraction = match payload {
                    None => 1 << 51,
                    Some(digits) => {
                        let payload = u64::from_str_radix(digits, 16)
                            .map_err(|_| LiteralError::InvalidPayload)?;

                        if payload == 0 || payload >= 1 << 52 {
                            return Err(LiteralError::InvalidPayload);
                        }

                        payload
                    }
                };

                f64::from_bits(0x7FF0_0000_0000_0000 | fraction)
            }
            FloatBody::Decimal { text } => {
                let value: f64 = text.parse().expect("recognizer admits only decimal forms");

                if value.is_infinite() {
                    return Err(LiteralError::OutOfRange);
                }

                value
            }
            FloatBody::Hex {
                mantissa,
                fraction_digits,
                exponent,
            } => {
                let (mantissa, adjust) = hex_mantissa(mantissa, *fraction_digits, exponent)?;
                let value = scale_by_power_of_two(mantissa as f64, adjust);

                if value.is_infinite() {
                    return Err(LiteralError::OutOfRange);
                }

                value
            }
        };

        Ok(if self.is_negative() { -value } else { value })
    }

    /// Interprets the literal as an `f32`.
    pub fn to_f32(&self) -> Result<f32, LiteralError> {
        let value = match &self.body {
            FloatBody::Infinity => f32::INFINITY,
            FloatBody::NaN { payload } => {
                let fraction = match payload {
                    None => 1 << 22,
                    Some(digits) => {
                        let payload = u32::from_str_radix(digits, 16)
                            .map_err(|_| LiteralError::InvalidPayload)?;

                        if payload == 0 || payload >= 1 << 23 {
                            return Err(LiteralError::InvalidPayload);
                        }

                        payload
                    }
                };

                f32::from_bits(0x7F80_0000 | fraction)
            }
            FloatBody::Decimal { text } => {
                let value: f32 = text.parse().expect("recognizer admits only decimal forms");

                if value.is_infinite() {
                    return Err(LiteralError::OutOfRange);
                }

                value
            }
            FloatBody::Hex {
                mantissa,
                fraction_digits,
                exponent,
            } => {
                let (mantissa, adjust) = hex_mantissa(mantissa, *fraction_digits, exponent)?;
                let value = scale_by_power_of_two(mantissa as f64, adjust) as f32;

                if value.is_infinite() {
                    return Err(LiteralError::OutOfRange);
                }

                value
            }
        };

        Ok(if self.is_negative() { -value } else { value })
    }
}

/// Folds hex mantissa digits into an integer and the power-of-two adjustment
/// that places the dot and the written exponent.
/// Digits beyond 128 bits of mantissa only shift the adjustment.
fn hex_mantissa(
    digits: &str,
    fraction_digits: u32,
    exponent: &str,
) -> Result<(u128, i32), LiteralError> {
    const MANTISSA_DIGITS: usize = 28;

    let kept = digits.len().min(MANTISSA_DIGITS);
    let dropped = (digits.len() - kept) as i64;
    let mut mantissa: u128 = 0;

    for digit in digits[..kept].chars() {
        let digit = digit.to_digit(16).expect("recognizer admits only hex digits");
        mantissa = mantissa * 16 + u128::from(digit);
    }

    let exponent: i64 = if exponent.is_empty() {
        0
    } else {
        // A written exponent too large for i64 is already far past the format.
        exponent.parse().unwrap_or_else(|_| {
            if exponent.starts_with('-') {
                i64::MIN / 2
            } else {
                i64::MAX / 2
            }
        })
    };

    let adjust = exponent + 4 * dropped - 4 * i64::from(fraction_digits);
    let adjust = adjust.clamp(-4096, 4096) as i32;

    Ok((mantissa, adjust))
}

/// Multiplies by `2^adjust` in two exact power-of-two steps,
/// so intermediate factors stay representable.
fn scale_by_power_of_two(value: f64, adjust: i32) -> f64 {
    let half = adjust / 2;

    value * 2f64.powi(half) * 2f64.powi(adjust - half)
}

fn is_idchar_digit(c: char) -> bool {
    c.is_ascii_digit() || c == '_'
}

fn is_idchar_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit() || c == '_'
}

fn well_separated(text: &str) -> bool {
    !text.starts_with('_') && !text.ends_with('_') && !text.contains("__")
}

/// A run of decimal digits with optional single `_` separators.
fn digits(input: &str) -> IResult<&str, &str> {
    verify(take_while1(is_idchar_digit), |text: &str| {
        well_separated(text)
    })(input)
}

/// A run of hexadecimal digits with optional single `_` separators.
fn hex_digits(input: &str) -> IResult<&str, &str> {
    verify(take_while1(is_idchar_hex_digit), |text: &str| {
        well_separated(text)
    })(input)
}

fn strip(digits: &str) -> String {
    digits.chars().filter(|c| *c != '_').collect()
}

fn sign(input: &str) -> IResult<&str, Option<Sign>> {
    map(opt(one_of("+-")), |c| {
        c.map(|c| match c {
            '-' => Sign::Negative,
            _ => Sign::Positive,
        })
    })(input)
}

/// `nan:0xH` with a payload, or plain `nan`.
fn nan(input: &str) -> IResult<&str, FloatBody> {
    alt((
        map(preceded(tag("nan:0x"), hex_digits), |payload| {
            FloatBody::NaN {
                payload: Some(strip(payload)),
            }
        }),
        map(tag("nan"), |_| FloatBody::NaN { payload: None }),
    ))(input)
}

/// The body of a hexadecimal literal after its `0x` prefix:
/// integer, or float when a dot or `p` exponent is present.
fn hex_body(input: &str) -> IResult<&str, (String, Option<(u32, String)>)> {
    let (input, whole) = hex_digits(input)?;
    let (input, fraction) = opt(preceded(char('.'), opt(hex_digits)))(input)?;
    let (input, exponent) = opt(tuple((one_of("pP"), opt(one_of("+-")), digits)))(input)?;

    if fraction.is_none() && exponent.is_none() {
        return Ok((input, (strip(whole), None)));
    }

    let fraction = strip(fraction.flatten().unwrap_or_default());
    let mantissa = format!("{}{}", strip(whole), fraction);
    let exponent = match exponent {
        None => String::new(),
        Some((_, sign, digits)) => match sign {
            Some('-') => format!("-{}", strip(digits)),
            _ => strip(digits),
        },
    };

    Ok((input, (mantissa, Some((fraction.len() as u32, exponent)))))
}

/// The body of a decimal literal:
/// integer, or float when a dot or `e` exponent is present.
fn decimal_body(input: &str) -> IResult<&str, (String, bool)> {
    let (input, whole) = digits(input)?;
    let (input, fraction) = opt(preceded(char('.'), opt(digits)))(input)?;
    let (input, exponent) = opt(tuple((one_of("eE"), opt(one_of("+-")), digits)))(input)?;

    if fraction.is_none() && exponent.is_none() {
        return Ok((input, (strip(whole), false)));
    }

    let mut text = strip(whole);

    if let Some(Some(fraction)) = fraction {
        text.push('.');
        text.push_str(&strip(fraction));
    }

    if let Some((_, sign, digits)) = exponent {
        text.push('e');

        if let Some(sign) = sign {
            text.push(sign);
        }

        text.push_str(&strip(digits));
    }

    Ok((input, (text, true)))
}

/// Recognizes a numeric literal: an optional sign followed by `inf`, `nan`,
/// `nan:0xH`, a hexadecimal integer or float, or a decimal integer or float.
///
/// The literal is returned normalized (sign split off, underscores removed);
/// its value is interpreted later at a known width.
pub fn number(input: &str) -> IResult<&str, NumberToken> {
    let (rest, sign) = sign(input)?;

    if let Ok((rest, body)) = nan(rest) {
        return Ok((rest, NumberToken::Float(FloatToken { sign, body })));
    }

    if let Ok((rest, _)) = tag::<_, _, nom::error::Error<&str>>("inf")(rest) {
        return Ok((rest, NumberToken::Float(FloatToken::infinity(sign))));
    }

    if let Ok((rest, _)) = tag::<_, _, nom::error::Error<&str>>("0x")(rest) {
        let (rest, (mantissa, float)) = hex_body(rest)?;
        let token = match float {
            None => NumberToken::Integer(IntegerToken::new(sign, mantissa, true)),
            Some((fraction_digits, exponent)) => NumberToken::Float(FloatToken {
                sign,
                body: FloatBody::Hex {
                    mantissa,
                    fraction_digits,
                    exponent,
                },
            }),
        };

        return Ok((rest, token));
    }

    let (rest, (text, float)) = decimal_body(rest)?;
    let token = if float {
        NumberToken::Float(FloatToken {
            sign,
            body: FloatBody::Decimal { text },
        })
    } else {
        NumberToken::Integer(IntegerToken::new(sign, text, false))
    };

    Ok((rest, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn integer(input: &str) -> IntegerToken {
        match number(input) {
            Ok(("", NumberToken::Integer(token))) => token,
            other => panic!("expected an integer for {:?}, got {:?}", input, other),
        }
    }

    fn float(input: &str) -> FloatToken {
        match number(input) {
            Ok(("", NumberToken::Float(token))) => token,
            other => panic!("expected a float for {:?}, got {:?}", input, other),
        }
    }

    #[test]
    fn decimal_integers() {
        assert_eq!(integer("0").to_i32(), Ok(0));
        assert_eq!(integer("42").to_i32(), Ok(42));
        assert_eq!(integer("1_000").to_i32(), Ok(1000));
        assert_eq!(integer("+41").to_i32(), Ok(41));
        assert_eq!(integer("-41").to_i32(), Ok(-41));
    }

    #[test]
    fn hex_integers() {
        assert_eq!(integer("0xFF").to_i32(), Ok(255));
        assert_eq!(integer("0xdead_beef").to_u32(), Ok(0xDEAD_BEEF));
        assert_eq!(integer("-0x10").to_i64(), Ok(-16));
    }

    #[test]
    fn i32_boundaries() {
        assert_eq!(integer("2147483647").to_i32(), Ok(i32::MAX));
        assert_eq!(integer("-2147483648").to_i32(), Ok(i32::MIN));
        assert_eq!(integer("4294967295").to_i32(), Ok(-1));
        assert_eq!(integer("4294967296").to_i32(), Err(LiteralError::OutOfRange));
        assert_eq!(integer("+2147483648").to_i32(), Err(LiteralError::OutOfRange));
        assert_eq!(integer("-2147483649").to_i32(), Err(LiteralError::OutOfRange));
    }

    #[test]
    fn i64_boundaries() {
        assert_eq!(integer("9223372036854775807").to_i64(), Ok(i64::MAX));
        assert_eq!(integer("-9223372036854775808").to_i64(), Ok(i64::MIN));
        assert_eq!(integer("18446744073709551615").to_i64(), Ok(-1));
        assert_eq!(
            integer("18446744073709551616").to_i64(),
            Err(LiteralError::OutOfRange)
        );
    }

    #[test]
    fn unsigned_rejects_signs() {
        assert_eq!(integer("-1").to_u32(), Err(LiteralError::UnexpectedSign));
        assert_eq!(integer("+1").to_u32(), Err(LiteralError::UnexpectedSign));
        assert_eq!(integer("4294967296").to_u32(), Err(LiteralError::OutOfRange));
    }

    #[test]
    fn underscores_must_separate_digits() {
        assert!(number("_1").is_err());
        assert!(number("1_").is_err());
        assert!(number("1__2").is_err());
    }

    #[test]
    fn decimal_floats() {
        assert_eq!(float("1.5").to_f64(), Ok(1.5));
        assert_eq!(float("4.").to_f64(), Ok(4.0));
        assert_eq!(float("1e3").to_f64(), Ok(1000.0));
        assert_eq!(float("1.5E+2").to_f64(), Ok(150.0));
        assert_eq!(float("-0.0").to_f64().unwrap().to_bits(), (-0.0f64).to_bits());
    }

    #[test]
    fn hex_floats() {
        assert_eq!(float("0x1p0").to_f64(), Ok(1.0));
        assert_eq!(float("0x1.8p1").to_f64(), Ok(3.0));
        assert_eq!(float("0xA.p-1").to_f64(), Ok(5.0));
        assert_eq!(float("0x1p-1").to_f32(), Ok(0.5));
        assert_eq!(float("-0x1.4p2").to_f64(), Ok(-5.0));
    }

    #[test]
    fn infinities_and_nans() {
        assert_eq!(float("inf").to_f64(), Ok(f64::INFINITY));
        assert_eq!(float("-inf").to_f32(), Ok(f32::NEG_INFINITY));
        assert!(float("nan").to_f64().unwrap().is_nan());
        assert_eq!(
            float("nan:0x200000").to_f32().unwrap().to_bits(),
            0x7FA0_0000
        );
        assert_eq!(
            float("-nan").to_f32().unwrap().to_bits(),
            0xFFC0_0000
        );
        assert_eq!(float("nan:0x0").to_f32(), Err(LiteralError::InvalidPayload));
        assert_eq!(
            float("nan:0x800000").to_f32(),
            Err(LiteralError::InvalidPayload)
        );
    }

    #[test]
    fn float_overflow_is_out_of_range() {
        assert_eq!(float("1e400").to_f64(), Err(LiteralError::OutOfRange));
        assert_eq!(float("0x1p128").to_f32(), Err(LiteralError::OutOfRange));
        assert_eq!(float("0x1p128").to_f64(), Ok(2f64.powi(128)));
    }

    #[test]
    fn integer_literals_in_float_position() {
        assert_eq!(integer("3").to_float().to_f64(), Ok(3.0));
        assert_eq!(integer("0x10").to_float().to_f32(), Ok(16.0));
        assert_eq!(integer("-7").to_float().to_f64(), Ok(-7.0));
    }

    #[quickcheck]
    fn i32_round_trip(value: i32) -> bool {
        integer(&value.to_string()).to_i32() == Ok(value)
    }

    #[quickcheck]
    fn i64_round_trip(value: i64) -> bool {
        integer(&value.to_string()).to_i64() == Ok(value)
    }

    #[quickcheck]
    fn u32_round_trip(value: u32) -> bool {
        integer(&value.to_string()).to_u32() == Ok(value)
    }

    #[quickcheck]
    fn f64_round_trip(value: f64) -> bool {
        // Canonical rendering of a finite value parses back bit-identically.
        if !value.is_finite() {
            return true;
        }

        let rendered = format!("{:e}", value);
        let token = match number(&rendered) {
            Ok(("", NumberToken::Float(token))) => token,
            Ok(("", NumberToken::Integer(token))) => token.to_float(),
            _ => return false,
        };

        token.to_f64().map(f64::to_bits) == Ok(value.to_bits())
    }
}
