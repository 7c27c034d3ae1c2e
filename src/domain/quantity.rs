//! Kubernetes style resource quantities ("500m", "2Gi", "1.5e3").
//!
//! A quantity is kept exactly as `mantissa * 10^exp10 * 1024^exp1024` and
//! only rounded when converted to integer units.

use std::str::FromStr;

use crate::error::{Error, Result};

/// More significant digits than this cannot be held exactly.
const MAX_DIGITS: usize = 36;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantity {
    text: String,
    mantissa: i128,
    exp10: i32,
    exp1024: u32,
}

impl Quantity {
    /// Whole units, rounded up.
    pub fn value(&self) -> Result<i64> {
        self.scaled(0)
    }

    /// Thousandths of a unit, rounded up.
    pub fn milli_value(&self) -> Result<i64> {
        self.scaled(3)
    }

    fn scaled(&self, shift: i32) -> Result<i64> {
        let overflow = || Error::quantity(&self.text, "value out of range");
        if self.mantissa == 0 {
            return Ok(0);
        }

        let mut n = self.mantissa;
        for _ in 0..self.exp1024 {
            n = n.checked_mul(1024).ok_or_else(overflow)?;
        }

        let exp = self.exp10.checked_add(shift).ok_or_else(overflow)?;
        let n = if exp >= 0 {
            let factor = 10i128.checked_pow(exp.unsigned_abs()).ok_or_else(overflow)?;
            n.checked_mul(factor).ok_or_else(overflow)?
        } else {
            match 10i128.checked_pow(exp.unsigned_abs()) {
                Some(divisor) => div_round_up(n, divisor),
                // The divisor exceeds any i128, so only the rounding is left.
                None => n.signum(),
            }
        };

        i64::try_from(n).map_err(|_| overflow())
    }
}

/// Divide, rounding away from zero.
fn div_round_up(n: i128, divisor: i128) -> i128 {
    let q = n / divisor;
    if n % divisor == 0 {
        q
    } else {
        q + n.signum()
    }
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let bytes = input.as_bytes();
        let mut pos = 0;
        let negative = match bytes.first() {
            None => return Err(Error::quantity(input, "empty quantity")),
            Some(b'-') => {
                pos = 1;
                true
            }
            Some(b'+') => {
                pos = 1;
                false
            }
            Some(_) => false,
        };

        let mut digits = String::new();
        let mut fraction_len: i32 = 0;
        let mut seen_point = false;
        while let Some(&c) = bytes.get(pos) {
            match c {
                b'0'..=b'9' => {
                    digits.push(c as char);
                    if seen_point {
                        fraction_len += 1;
                    }
                }
                b'.' if !seen_point => seen_point = true,
                _ => break,
            }
            pos += 1;
        }
        if digits.is_empty() {
            return Err(Error::quantity(input, "missing numeric part"));
        }

        let suffix = &input[pos..];
        let (suffix_exp10, exp1024) = parse_suffix(suffix)
            .ok_or_else(|| Error::quantity(input, format!("unknown suffix '{suffix}'")))?;

        while fraction_len > 0 && digits.ends_with('0') {
            digits.pop();
            fraction_len -= 1;
        }
        let significant = digits.trim_start_matches('0');
        if significant.len() > MAX_DIGITS {
            return Err(Error::quantity(input, "too many significant digits"));
        }
        let mut mantissa: i128 = if significant.is_empty() {
            0
        } else {
            significant
                .parse()
                .map_err(|_| Error::quantity(input, "invalid numeric part"))?
        };
        if negative {
            mantissa = -mantissa;
        }

        let exp10 = suffix_exp10
            .checked_sub(fraction_len)
            .ok_or_else(|| Error::quantity(input, "exponent out of range"))?;

        Ok(Self {
            text: input.to_string(),
            mantissa,
            exp10,
            exp1024,
        })
    }
}

/// Map a suffix to its (power of ten, power of 1024).
fn parse_suffix(suffix: &str) -> Option<(i32, u32)> {
    let parsed = match suffix {
        "" => (0, 0),
        "Ki" => (0, 1),
        "Mi" => (0, 2),
        "Gi" => (0, 3),
        "Ti" => (0, 4),
        "Pi" => (0, 5),
        "Ei" => (0, 6),
        "n" => (-9, 0),
        "u" => (-6, 0),
        "m" => (-3, 0),
        "k" => (3, 0),
        "M" => (6, 0),
        "G" => (9, 0),
        "T" => (12, 0),
        "P" => (15, 0),
        "E" => (18, 0),
        _ => {
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))?;
            if !exponent
                .trim_start_matches(['+', '-'])
                .bytes()
                .all(|b| b.is_ascii_digit())
            {
                return None;
            }
            (exponent.parse().ok()?, 0)
        }
    };
    Some(parsed)
}

/// CPU quantity in milli-cores.
pub fn cpu_millis(raw: &str) -> Result<i64> {
    raw.parse::<Quantity>()?.milli_value()
}

/// Memory quantity in bytes.
pub fn memory_bytes(raw: &str) -> Result<i64> {
    raw.parse::<Quantity>()?.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_quantities_in_millis() {
        assert_eq!(cpu_millis("500m").unwrap(), 500);
        assert_eq!(cpu_millis("1").unwrap(), 1000);
        assert_eq!(cpu_millis("2.5").unwrap(), 2500);
        assert_eq!(cpu_millis("0.1m").unwrap(), 1, "rounds up");
        assert_eq!(cpu_millis("250000u").unwrap(), 250);
        assert_eq!(cpu_millis("0").unwrap(), 0);
    }

    #[test]
    fn memory_quantities_in_bytes() {
        assert_eq!(memory_bytes("1Gi").unwrap(), 1_073_741_824);
        assert_eq!(memory_bytes("2Gi").unwrap(), 2_147_483_648);
        assert_eq!(memory_bytes("128Mi").unwrap(), 134_217_728);
        assert_eq!(memory_bytes("1.5Ki").unwrap(), 1536);
        assert_eq!(memory_bytes("1k").unwrap(), 1000);
        assert_eq!(memory_bytes("3M").unwrap(), 3_000_000);
        assert_eq!(memory_bytes("1e3").unwrap(), 1000);
        assert_eq!(memory_bytes("1E+2").unwrap(), 100);
        assert_eq!(memory_bytes("4096").unwrap(), 4096);
        assert_eq!(memory_bytes("+12").unwrap(), 12);
        assert_eq!(memory_bytes("-1.5").unwrap(), -2);
        assert_eq!(memory_bytes("100m").unwrap(), 1);
    }

    #[test]
    fn trailing_fraction_zeros_do_not_count() {
        assert_eq!(
            memory_bytes("1.000000000000000000000000000000000000000000").unwrap(),
            1
        );
    }

    #[test]
    fn malformed_quantities() {
        for bad in ["", "Gi", "1.2.3", "12Q", "1K", "1 Gi", "abc", "1e", "1e3.5", "--1"] {
            let err = memory_bytes(bad).unwrap_err();
            assert!(
                matches!(err, Error::Quantity { .. }),
                "{bad:?} should be rejected, got {err}"
            );
        }
    }

    #[test]
    fn out_of_range_is_an_error() {
        assert!(memory_bytes("16Ei").is_err());
        assert!(cpu_millis("1e30").is_err());
        assert_eq!(memory_bytes("1e-40").unwrap(), 1);
    }
}
