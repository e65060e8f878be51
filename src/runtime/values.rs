//! Runtime representation of values and the numeric operations over them.
//!
//! Wasm code manipulates values of the four basic value types: integers and
//! floating-point data of 32 or 64 bit width. There is no distinction between
//! signed and unsigned integer types; integers are reinterpreted by the
//! operations that require a signedness, which the interpreter expresses by
//! instantiating its generic helpers at `i32`/`u32`/`i64`/`u64`.
//!
//! Every trap the WebAssembly specification prescribes for the numeric
//! instructions originates here: divide-by-zero, signed-division overflow,
//! and the NaN/out-of-range split of the float-to-integer truncations.

use crate::model::ValueType;
use crate::runtime::Trap;
use num_traits::cast::ToPrimitive;
use std::fmt;

/// A runtime value.
///
/// # Examples
/// ```rust
/// use wat_vm::model::ValueType;
/// use wat_vm::runtime::Value;
///
/// assert_eq!(Value::from(42i32).kind(), ValueType::I32);
/// assert_eq!(Value::default_for(ValueType::F64), Value::F64(0.0));
/// assert_eq!(Value::I32(42).to_string(), "42");
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    /// A 32-bit signed or unsigned integer.
    I32(i32),
    /// A 64-bit signed or unsigned integer.
    I64(i64),
    /// A 32-bit IEEE 754-2019 floating point number.
    F32(f32),
    /// A 64-bit IEEE 754-2019 floating point number.
    F64(f64),
}

impl Value {
    /// The zero value of the given type, used for uninitialized locals.
    pub fn default_for(kind: ValueType) -> Self {
        match kind {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
        }
    }

    /// The value type of this value.
    pub fn kind(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// Converts to `T` when this value holds the matching type.
    pub fn try_into<T: FromValue>(self) -> Option<T> {
        T::from_value(self)
    }
}

/// Renders the value as a canonical text-format constant:
/// decimal for integers, exponent notation for finite floats,
/// `inf`/`nan`/`nan:0x…` for the specials.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(value) => write!(f, "{}", value),
            Value::I64(value) => write!(f, "{}", value),
            Value::F32(value) => write_float(f, f64::from(*value), float_parts_f32(*value)),
            Value::F64(value) => write_float(f, *value, float_parts_f64(*value)),
        }
    }
}

/// The sign and NaN payload of a float, when it is a NaN.
fn float_parts_f32(value: f32) -> Option<(bool, u64, u64)> {
    value.is_nan().then(|| {
        let bits = value.to_bits();

        (bits >> 31 == 1, u64::from(bits & 0x007F_FFFF), 1 << 22)
    })
}

fn float_parts_f64(value: f64) -> Option<(bool, u64, u64)> {
    value.is_nan().then(|| {
        let bits = value.to_bits();

        (bits >> 63 == 1, bits & 0x000F_FFFF_FFFF_FFFF, 1 << 51)
    })
}

fn write_float(
    f: &mut fmt::Formatter<'_>,
    value: f64,
    nan: Option<(bool, u64, u64)>,
) -> fmt::Result {
    match nan {
        Some((negative, payload, canonical)) => {
            let sign = if negative { "-" } else { "" };

            if payload == canonical {
                write!(f, "{}nan", sign)
            } else {
                write!(f, "{}nan:0x{:x}", sign, payload)
            }
        }
        None if value.is_infinite() => {
            write!(f, "{}", if value < 0.0 { "-inf" } else { "inf" })
        }
        None => write!(f, "{:e}", value),
    }
}

/// Creates a typed Rust value from a [`Value`] of the matching type.
/// Unsigned types reinterpret the bits of the signed representation.
pub trait FromValue: Sized {
    /// Returns `None` when the value holds a different type.
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_value_conversions {
    ($variant:ident, $type:ty) => {
        impl FromValue for $type {
            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(inner as $type),
                    _ => None,
                }
            }
        }

        impl From<$type> for Value {
            fn from(value: $type) -> Self {
                Value::$variant(value as _)
            }
        }
    };
}

impl_value_conversions!(I32, i32);
impl_value_conversions!(I32, u32);
impl_value_conversions!(I64, i64);
impl_value_conversions!(I64, u64);

impl FromValue for f32 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::F32(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::F32(value)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::F64(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::I32(i32::from(value))
    }
}

/// Convert one type to another by wrapping to the narrower width.
pub trait WrapInto<T> {
    fn wrap_into(self) -> T;
}

macro_rules! impl_wrap_into {
    ($from:ty, $into:ty) => {
        impl WrapInto<$into> for $from {
            fn wrap_into(self) -> $into {
                self as $into
            }
        }
    };
}

impl_wrap_into!(i32, i8);
impl_wrap_into!(i32, i16);
impl_wrap_into!(i64, i8);
impl_wrap_into!(i64, i16);
impl_wrap_into!(i64, i32);
impl_wrap_into!(f64, f32);

/// Convert one type to another by extension:
/// zero or sign extension for integers (selected by the source type's
/// signedness), rounding to nearest-even for integer-to-float conversions.
pub trait ExtendInto<T> {
    fn extend_into(self) -> T;
}

macro_rules! impl_extend_into {
    ($from:ty, $into:ty) => {
        impl ExtendInto<$into> for $from {
            fn extend_into(self) -> $into {
                self as $into
            }
        }
    };
}

impl_extend_into!(i8, i32);
impl_extend_into!(u8, i32);
impl_extend_into!(i16, i32);
impl_extend_into!(u16, i32);
impl_extend_into!(i8, i64);
impl_extend_into!(u8, i64);
impl_extend_into!(i16, i64);
impl_extend_into!(u16, i64);
impl_extend_into!(i32, i64);
impl_extend_into!(u32, i64);
impl_extend_into!(i32, f32);
impl_extend_into!(u32, f32);
impl_extend_into!(i32, f64);
impl_extend_into!(u32, f64);
impl_extend_into!(i64, f32);
impl_extend_into!(u64, f32);
impl_extend_into!(i64, f64);
impl_extend_into!(u64, f64);
impl_extend_into!(f32, f64);

/// Convert a float to an integer by truncation toward zero,
/// trapping on NaN (`invalid conversion to integer`) and on infinite or
/// out-of-range values (`integer overflow`).
pub trait TryTruncateInto<T> {
    fn try_truncate_into(self) -> Result<T, Trap>;
}

/// Convert a float to an integer by truncation toward zero,
/// clamping instead of trapping: NaN becomes zero and out-of-range values
/// saturate at the integer bounds.
pub trait SaturatingTruncateInto<T> {
    fn saturating_truncate_into(self) -> T;
}

macro_rules! impl_truncate_into {
    ($from:ty, $into:ty, $to:path) => {
        impl TryTruncateInto<$into> for $from {
            fn try_truncate_into(self) -> Result<$into, Trap> {
                if self.is_nan() {
                    return Err(Trap::InvalidConversionToInteger);
                }

                $to(&self).ok_or(Trap::IntegerOverflow)
            }
        }

        impl SaturatingTruncateInto<$into> for $from {
            fn saturating_truncate_into(self) -> $into {
                if self.is_nan() {
                    return 0;
                }

                $to(&self).unwrap_or(if self < 0.0 {
                    <$into>::MIN
                } else {
                    <$into>::MAX
                })
            }
        }
    };
}

impl_truncate_into!(f32, i32, ToPrimitive::to_i32);
impl_truncate_into!(f32, u32, ToPrimitive::to_u32);
impl_truncate_into!(f32, i64, ToPrimitive::to_i64);
impl_truncate_into!(f32, u64, ToPrimitive::to_u64);
impl_truncate_into!(f64, i32, ToPrimitive::to_i32);
impl_truncate_into!(f64, u32, ToPrimitive::to_u32);
impl_truncate_into!(f64, i64, ToPrimitive::to_i64);
impl_truncate_into!(f64, u64, ToPrimitive::to_u64);

/// Reinterprets the bits of a value of one type as another type.
pub trait TransmuteInto<T> {
    fn transmute_into(self) -> T;
}

impl TransmuteInto<i32> for f32 {
    fn transmute_into(self) -> i32 {
        self.to_bits() as i32
    }
}

impl TransmuteInto<f32> for i32 {
    fn transmute_into(self) -> f32 {
        f32::from_bits(self as u32)
    }
}

impl TransmuteInto<i64> for f64 {
    fn transmute_into(self) -> i64 {
        self.to_bits() as i64
    }
}

impl TransmuteInto<f64> for i64 {
    fn transmute_into(self) -> f64 {
        f64::from_bits(self as u64)
    }
}

/// Arithmetic operations shared by the integer and float types.
pub trait ArithmeticOps<T>: Copy {
    fn add(self, other: T) -> T;
    fn sub(self, other: T) -> T;
    fn mul(self, other: T) -> T;
    fn div(self, other: T) -> Result<T, Trap>;
}

/// Integer operations.
pub trait Integer<T>: ArithmeticOps<T> {
    fn leading_zeros(self) -> T;
    fn trailing_zeros(self) -> T;
    fn count_ones(self) -> T;
    fn rotl(self, other: T) -> T;
    fn rotr(self, other: T) -> T;
    fn rem(self, other: T) -> Result<T, Trap>;
}

/// Float operations.
pub trait Float<T>: ArithmeticOps<T> {
    fn abs(self) -> T;
    fn neg(self) -> T;
    fn floor(self) -> T;
    fn ceil(self) -> T;
    fn trunc(self) -> T;
    /// The nearest integer, ties rounding to even.
    fn nearest(self) -> T;
    fn sqrt(self) -> T;
    /// The lesser operand; NaN propagates and `-0.0` is less than `0.0`.
    fn min(self, other: T) -> T;
    /// The greater operand; NaN propagates and `0.0` is greater than `-0.0`.
    fn max(self, other: T) -> T;
    fn copysign(self, other: T) -> T;
}

macro_rules! impl_integer_arithmetic_ops {
    ($type:ty) => {
        impl ArithmeticOps<$type> for $type {
            fn add(self, other: $type) -> $type {
                self.wrapping_add(other)
            }

            fn sub(self, other: $type) -> $type {
                self.wrapping_sub(other)
            }

            fn mul(self, other: $type) -> $type {
                self.wrapping_mul(other)
            }

            fn div(self, other: $type) -> Result<$type, Trap> {
                if other == 0 {
                    return Err(Trap::IntegerDivideByZero);
                }

                let (result, overflow) = self.overflowing_div(other);

                if overflow {
                    Err(Trap::IntegerOverflow)
                } else {
                    Ok(result)
                }
            }
        }
    };
}

impl_integer_arithmetic_ops!(i32);
impl_integer_arithmetic_ops!(u32);
impl_integer_arithmetic_ops!(i64);
impl_integer_arithmetic_ops!(u64);

macro_rules! impl_integer {
    ($type:ty) => {
        impl Integer<$type> for $type {
            fn leading_zeros(self) -> $type {
                self.leading_zeros() as $type
            }

            fn trailing_zeros(self) -> $type {
                self.trailing_zeros() as $type
            }

            fn count_ones(self) -> $type {
                self.count_ones() as $type
            }

            fn rotl(self, other: $type) -> $type {
                self.rotate_left(other as u32)
            }

            fn rotr(self, other: $type) -> $type {
                self.rotate_right(other as u32)
            }

            fn rem(self, other: $type) -> Result<$type, Trap> {
                if other == 0 {
                    return Err(Trap::IntegerDivideByZero);
                }

                Ok(self.wrapping_rem(other))
            }
        }
    };
}

impl_integer!(i32);
impl_integer!(u32);
impl_integer!(i64);
impl_integer!(u64);

macro_rules! impl_float_arithmetic_ops {
    ($type:ty) => {
        impl ArithmeticOps<$type> for $type {
            fn add(self, other: $type) -> $type {
                self + other
            }

            fn sub(self, other: $type) -> $type {
                self - other
            }

            fn mul(self, other: $type) -> $type {
                self * other
            }

            fn div(self, other: $type) -> Result<$type, Trap> {
                Ok(self / other)
            }
        }
    };
}

impl_float_arithmetic_ops!(f32);
impl_float_arithmetic_ops!(f64);

macro_rules! impl_float {
    ($type:ty) => {
        // Floating point values are compared directly on purpose:
        // the 0.5-fraction and ±0.0 cases are exact.
        #[allow(clippy::float_cmp)]
        impl Float<$type> for $type {
            fn abs(self) -> $type {
                <$type>::abs(self)
            }

            fn neg(self) -> $type {
                -self
            }

            fn floor(self) -> $type {
                <$type>::floor(self)
            }

            fn ceil(self) -> $type {
                <$type>::ceil(self)
            }

            fn trunc(self) -> $type {
                <$type>::trunc(self)
            }

            fn nearest(self) -> $type {
                let round = self.round();

                if self.fract().abs() != 0.5 {
                    return round;
                }

                if round % 2.0 == 1.0 {
                    self.floor()
                } else if round % 2.0 == -1.0 {
                    self.ceil()
                } else {
                    round
                }
            }

            fn sqrt(self) -> $type {
                <$type>::sqrt(self)
            }

            fn min(self, other: $type) -> $type {
                if self.is_nan() {
                    self
                } else if other.is_nan() {
                    other
                } else if self == other {
                    // Break the ±0.0 tie toward the negative zero.
                    if self.is_sign_negative() {
                        self
                    } else {
                        other
                    }
                } else if self < other {
                    self
                } else {
                    other
                }
            }

            fn max(self, other: $type) -> $type {
                if self.is_nan() {
                    self
                } else if other.is_nan() {
                    other
                } else if self == other {
                    // Break the ±0.0 tie toward the positive zero.
                    if self.is_sign_positive() {
                        self
                    } else {
                        other
                    }
                } else if self > other {
                    self
                } else {
                    other
                }
            }

            fn copysign(self, other: $type) -> $type {
                <$type>::copysign(self, other)
            }
        }
    };
}

impl_float!(f32);
impl_float!(f64);

/// Conversion to and from the little-endian byte order of linear memory.
pub trait LittleEndian: Sized {
    /// Writes into a buffer of exactly `size_of::<Self>()` bytes.
    fn write_to(self, bytes: &mut [u8]);
    /// Reads from a buffer of exactly `size_of::<Self>()` bytes.
    fn read_from(bytes: &[u8]) -> Self;
}

macro_rules! impl_little_endian {
    ($type:ty) => {
        impl LittleEndian for $type {
            fn write_to(self, bytes: &mut [u8]) {
                bytes.copy_from_slice(&self.to_le_bytes());
            }

            fn read_from(bytes: &[u8]) -> Self {
                let mut buffer = [0u8; std::mem::size_of::<$type>()];
                buffer.copy_from_slice(bytes);

                Self::from_le_bytes(buffer)
            }
        }
    };
}

impl_little_endian!(i8);
impl_little_endian!(u8);
impl_little_endian!(i16);
impl_little_endian!(u16);
impl_little_endian!(i32);
impl_little_endian!(u32);
impl_little_endian!(i64);
impl_little_endian!(u64);

impl LittleEndian for f32 {
    fn write_to(self, bytes: &mut [u8]) {
        self.to_bits().write_to(bytes);
    }

    fn read_from(bytes: &[u8]) -> Self {
        f32::from_bits(u32::read_from(bytes))
    }
}

impl LittleEndian for f64 {
    fn write_to(self, bytes: &mut [u8]) {
        self.to_bits().write_to(bytes);
    }

    fn read_from(bytes: &[u8]) -> Self {
        f64::from_bits(u64::read_from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_values_reinterpret_the_bits() {
        assert_eq!(Value::from(u32::MAX), Value::I32(-1));
        assert_eq!(Value::I32(-1).try_into::<u32>(), Some(u32::MAX));
        assert_eq!(Value::I64(-1).try_into::<u64>(), Some(u64::MAX));
        assert_eq!(Value::I32(0).try_into::<i64>(), None);
    }

    #[test]
    fn signed_division_overflow_traps() {
        assert_eq!(i32::MIN.div(-1), Err(Trap::IntegerOverflow));
        assert_eq!(i64::MIN.div(-1), Err(Trap::IntegerOverflow));
        assert_eq!((-7i32).div(2), Ok(-3));
    }

    #[test]
    fn division_by_zero_traps() {
        assert_eq!(1i32.div(0), Err(Trap::IntegerDivideByZero));
        assert_eq!(1u64.div(0), Err(Trap::IntegerDivideByZero));
        assert_eq!(1i32.rem(0), Err(Trap::IntegerDivideByZero));
    }

    #[test]
    fn signed_remainder_of_overflowing_division_is_zero() {
        assert_eq!(i32::MIN.rem(-1), Ok(0));
        assert_eq!(i64::MIN.rem(-1), Ok(0));
    }

    #[test]
    fn rotations_are_modular() {
        assert_eq!(0x1234_5678u32.rotl(8), 0x3456_7812);
        assert_eq!(0x1234_5678u32.rotl(40), 0x3456_7812);
        assert_eq!(1u32.rotr(1), 0x8000_0000);
    }

    #[test]
    fn truncation_separates_nan_from_overflow() {
        assert_eq!(
            TryTruncateInto::<i32>::try_truncate_into(f32::NAN),
            Err(Trap::InvalidConversionToInteger)
        );
        assert_eq!(
            TryTruncateInto::<i32>::try_truncate_into(f32::INFINITY),
            Err(Trap::IntegerOverflow)
        );
        assert_eq!(
            TryTruncateInto::<i32>::try_truncate_into(3e9f64),
            Err(Trap::IntegerOverflow)
        );
        assert_eq!((-1.7f64).try_truncate_into(), Ok(-1i32));
        assert_eq!((-0.9f32).try_truncate_into(), Ok(0u32));
    }

    #[test]
    fn saturating_truncation_clamps() {
        assert_eq!(SaturatingTruncateInto::<i32>::saturating_truncate_into(f32::NAN), 0);
        assert_eq!(
            SaturatingTruncateInto::<i32>::saturating_truncate_into(f32::INFINITY),
            i32::MAX
        );
        assert_eq!(
            SaturatingTruncateInto::<i32>::saturating_truncate_into(f32::NEG_INFINITY),
            i32::MIN
        );
        assert_eq!(
            SaturatingTruncateInto::<u32>::saturating_truncate_into(-5.0f64),
            0
        );
        assert_eq!(
            SaturatingTruncateInto::<i64>::saturating_truncate_into(1e30f64),
            i64::MAX
        );
    }

    #[test]
    fn nearest_rounds_ties_to_even() {
        assert_eq!(2.5f64.nearest(), 2.0);
        assert_eq!(3.5f64.nearest(), 4.0);
        assert_eq!((-2.5f64).nearest(), -2.0);
        assert_eq!(0.4f32.nearest(), 0.0);
        assert_eq!((-0.6f32).nearest(), -1.0);
    }

    #[test]
    fn min_and_max_handle_nan_and_signed_zero() {
        assert!(Float::min(f32::NAN, 1.0).is_nan());
        assert!(Float::max(1.0f64, f64::NAN).is_nan());
        assert_eq!(Float::min(-0.0f32, 0.0).to_bits(), (-0.0f32).to_bits());
        assert_eq!(Float::max(-0.0f32, 0.0).to_bits(), 0.0f32.to_bits());
        assert_eq!(Float::min(1.0f64, 2.0), 1.0);
        assert_eq!(Float::max(1.0f64, 2.0), 2.0);
    }

    #[test]
    fn transmute_is_bit_exact() {
        assert_eq!(TransmuteInto::<i32>::transmute_into(1.0f32), 0x3F80_0000);
        assert_eq!(TransmuteInto::<f32>::transmute_into(0x3F80_0000i32), 1.0);

        let bits: i64 = f64::NAN.transmute_into();
        let back: f64 = bits.transmute_into();

        assert_eq!(back.to_bits(), f64::NAN.to_bits());
    }

    #[test]
    fn integer_to_float_extension_rounds_to_nearest() {
        // 2^60 + 1 is not representable in f32; rounding is to nearest-even.
        let value: i64 = (1 << 60) + 1;
        let extended: f32 = value.extend_into();

        assert_eq!(extended, 2f32.powi(60));
        assert_eq!(ExtendInto::<f64>::extend_into(u32::MAX), 4294967295.0);
    }

    #[test]
    fn display_renders_canonical_constants() {
        assert_eq!(Value::I32(-1).to_string(), "-1");
        assert_eq!(Value::I64(i64::MIN).to_string(), "-9223372036854775808");
        assert_eq!(Value::F32(f32::INFINITY).to_string(), "inf");
        assert_eq!(Value::F64(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(Value::F32(f32::NAN).to_string(), "nan");
        assert_eq!(Value::F32(f32::from_bits(0x7F80_0001)).to_string(), "nan:0x1");
        assert_eq!(Value::F64(1.5).to_string(), "1.5e0");
    }
}
