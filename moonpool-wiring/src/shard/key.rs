//! Raw routing key values and their hash codes.
//!
//! Hash codes follow the JVM's `hashCode` contracts for boxed primitives and
//! strings, so shard ids line up with peers that route the same keys.
//!
//! ```text
//! Bool   true → 1231, false → 1237
//! Byte / Short / Int / Char   the value itself
//! Long   (v ^ (v >>> 32)) as i32
//! Float  canonical bits as i32
//! Double canonical bits folded like Long
//! Str    s[0]·31^(n-1) + … + s[n-1] over UTF-16 units, wrapping
//! ```
//!
//! Entity ids render floating point keys the way `Double.toString` does:
//! plain decimal with at least one fractional digit for magnitudes in
//! `[1e-3, 1e7)`, otherwise computerized scientific notation (`1.0E10`,
//! `1.5E-5`), with the shortest digits that round-trip.

use std::any::Any;
use std::fmt;

/// A raw key value read from a message.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    /// Boolean key.
    Bool(bool),
    /// 8-bit integer key.
    Byte(i8),
    /// 16-bit integer key.
    Short(i16),
    /// Character key.
    Char(char),
    /// 32-bit integer key.
    Int(i32),
    /// 64-bit integer key.
    Long(i64),
    /// 32-bit float key.
    Float(f32),
    /// 64-bit float key.
    Double(f64),
    /// String key.
    Str(String),
}

impl KeyValue {
    /// Stable hash code of the value.
    pub fn hash_code(&self) -> i32 {
        match self {
            KeyValue::Bool(true) => 1231,
            KeyValue::Bool(false) => 1237,
            KeyValue::Byte(v) => i32::from(*v),
            KeyValue::Short(v) => i32::from(*v),
            KeyValue::Char(c) => *c as i32,
            KeyValue::Int(v) => *v,
            KeyValue::Long(v) => fold(*v as u64),
            KeyValue::Float(v) => {
                let bits = if v.is_nan() { 0x7fc0_0000 } else { v.to_bits() };
                bits as i32
            }
            KeyValue::Double(v) => {
                let bits = if v.is_nan() {
                    0x7ff8_0000_0000_0000
                } else {
                    v.to_bits()
                };
                fold(bits)
            }
            KeyValue::Str(s) => s
                .encode_utf16()
                .fold(0_i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit))),
        }
    }

    /// Recover a key value from a type-erased accessor result.
    ///
    /// Accepts a `KeyValue` itself or any of the primitive types and strings
    /// it wraps.
    pub fn from_any(value: Box<dyn Any + Send>) -> Result<KeyValue, Box<dyn Any + Send>> {
        let value = match value.downcast::<KeyValue>() {
            Ok(key) => return Ok(*key),
            Err(value) => value,
        };
        macro_rules! try_as {
            ($value:ident, $($ty:ty),*) => {
                $(
                    let $value = match $value.downcast::<$ty>() {
                        Ok(v) => return Ok(KeyValue::from(*v)),
                        Err(value) => value,
                    };
                )*
            };
        }
        try_as!(value, bool, i8, i16, char, i32, i64, f32, f64, String, &'static str);
        Err(value)
    }
}

fn fold(bits: u64) -> i32 {
    (bits ^ (bits >> 32)) as u32 as i32
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Bool(v) => write!(f, "{v}"),
            KeyValue::Byte(v) => write!(f, "{v}"),
            KeyValue::Short(v) => write!(f, "{v}"),
            KeyValue::Char(v) => write!(f, "{v}"),
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Long(v) => write!(f, "{v}"),
            KeyValue::Float(v) => write_decimal(f, *v),
            KeyValue::Double(v) => write_decimal(f, *v),
            KeyValue::Str(v) => f.write_str(v),
        }
    }
}

fn write_decimal<V>(f: &mut fmt::Formatter<'_>, v: V) -> fmt::Result
where
    V: Copy + Into<f64> + fmt::Debug + fmt::LowerExp,
{
    let wide: f64 = v.into();
    if wide.is_nan() {
        return f.write_str("NaN");
    }
    if wide.is_infinite() {
        return f.write_str(if wide > 0.0 { "Infinity" } else { "-Infinity" });
    }
    let magnitude = wide.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        // Debug stays plain in this range and keeps the ".0" on whole numbers.
        return write!(f, "{v:?}");
    }
    let scientific = format!("{v:e}");
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    if mantissa.contains('.') {
        write!(f, "{mantissa}E{exponent}")
    } else {
        write!(f, "{mantissa}.0E{exponent}")
    }
}

macro_rules! key_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for KeyValue {
                fn from(value: $ty) -> Self {
                    KeyValue::$variant(value)
                }
            }
        )*
    };
}

key_from!(
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    char => Char,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => Str,
);

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Str(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_codes_match_jvm() {
        assert_eq!(KeyValue::from(true).hash_code(), 1231);
        assert_eq!(KeyValue::from(false).hash_code(), 1237);
        assert_eq!(KeyValue::from(-7_i32).hash_code(), -7);
        assert_eq!(KeyValue::from('a').hash_code(), 97);
        assert_eq!(KeyValue::from(1_i64 << 32).hash_code(), 1);
        assert_eq!(KeyValue::from(-1_i64).hash_code(), 0);
        assert_eq!(KeyValue::from(1.0_f32).hash_code(), 0x3f80_0000);
        assert_eq!(KeyValue::from(1.0_f64).hash_code(), 0x3ff0_0000);
        assert_eq!(KeyValue::from("").hash_code(), 0);
        assert_eq!(KeyValue::from("a").hash_code(), 97);
        assert_eq!(KeyValue::from("hello").hash_code(), 99_162_322);
        assert_eq!(KeyValue::from("polygenelubricants").hash_code(), i32::MIN);
    }

    #[test]
    fn test_floating_point_renders_like_jvm() {
        let render = |v: KeyValue| v.to_string();
        assert_eq!(render(KeyValue::Double(1e10)), "1.0E10");
        assert_eq!(render(KeyValue::Double(1e7)), "1.0E7");
        assert_eq!(render(KeyValue::Double(-2.5e12)), "-2.5E12");
        assert_eq!(render(KeyValue::Double(1.5e-5)), "1.5E-5");
        assert_eq!(render(KeyValue::Double(1e-4)), "1.0E-4");
        assert_eq!(render(KeyValue::Double(0.001)), "0.001");
        assert_eq!(render(KeyValue::Double(0.5)), "0.5");
        assert_eq!(render(KeyValue::Double(1.0)), "1.0");
        assert_eq!(render(KeyValue::Double(123456.789)), "123456.789");
        assert_eq!(render(KeyValue::Double(-0.0)), "-0.0");
        assert_eq!(render(KeyValue::Float(1e8)), "1.0E8");
        assert_eq!(render(KeyValue::Float(0.1)), "0.1");
        assert_eq!(render(KeyValue::Double(f64::NAN)), "NaN");
        assert_eq!(render(KeyValue::Double(f64::NEG_INFINITY)), "-Infinity");
    }

    #[test]
    fn test_canonical_strings() {
        assert_eq!(KeyValue::from(42_i32).to_string(), "42");
        assert_eq!(KeyValue::from(1.0_f64).to_string(), "1.0");
        assert_eq!(KeyValue::from(2.5_f32).to_string(), "2.5");
        assert_eq!(KeyValue::from("alice").to_string(), "alice");
        assert_eq!(KeyValue::from(true).to_string(), "true");
    }

    #[test]
    fn test_from_any_accepts_primitives() {
        assert_eq!(
            KeyValue::from_any(Box::new(5_i64)).expect("i64 key"),
            KeyValue::Long(5)
        );
        assert_eq!(
            KeyValue::from_any(Box::new(String::from("k"))).expect("string key"),
            KeyValue::Str("k".to_string())
        );
        assert_eq!(
            KeyValue::from_any(Box::new(KeyValue::Int(3))).expect("key value"),
            KeyValue::Int(3)
        );
        assert!(KeyValue::from_any(Box::new(vec![1_u8])).is_err());
    }
}
