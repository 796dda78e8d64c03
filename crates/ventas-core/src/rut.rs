//! # RUT Module
//!
//! Normalization and checksum validation for the Chilean RUT, the national
//! tax identifier that keys customer records.
//!
//! ## Anatomy of a RUT
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │   1 2 . 3 4 5 . 6 7 8 - 5                                           │
//! │   └──────┬────────┘   └┬┘                                           │
//! │        body        check digit (0-9 or K)                           │
//! │                                                                     │
//! │  Canonical form: "12345678-5"                                       │
//! │  (dots stripped, upper-cased, single dash before the last char)     │
//! │                                                                     │
//! │  Checksum: multiply body digits right-to-left by the cyclic         │
//! │  weights 2,3,4,5,6,7,2,3,... sum the products, then                 │
//! │  11 - (sum mod 11) → 11 maps to "0", 10 maps to "K".                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ventas_core::rut;
//!
//! assert_eq!(rut::normalize("12.345.678-5"), "12345678-5");
//! assert_eq!(rut::normalize("123456785"), "12345678-5");
//! assert!(rut::is_valid("12345678-5"));
//! assert!(!rut::is_valid("12345678-4"));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ValidationError;

/// Cyclic weight sequence applied to body digits, right to left.
const WEIGHTS: [u32; 6] = [2, 3, 4, 5, 6, 7];

/// Maximum number of digits in a RUT body.
const MAX_BODY_DIGITS: usize = 9;

// =============================================================================
// Normalization and Validation
// =============================================================================

/// Normalizes a raw RUT string to canonical form.
///
/// Strips whitespace and dot separators, upper-cases the check character,
/// and inserts the dash before the final character if it is absent.
/// Does NOT validate - a garbage input yields a garbage canonical string.
///
/// ## Example
/// ```rust
/// use ventas_core::rut::normalize;
///
/// assert_eq!(normalize(" 12.345.678-5 "), "12345678-5");
/// assert_eq!(normalize("123456785"), "12345678-5");
/// assert_eq!(normalize("12345670-k"), "12345670-K");
/// ```
pub fn normalize(raw: &str) -> String {
    let mut rut: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_uppercase();

    if !rut.contains('-') && rut.len() > 1 {
        rut.insert(rut.len() - 1, '-');
    }

    rut
}

/// Computes the check digit for a RUT body.
///
/// Returns `None` if the body is not 1-9 ASCII digits.
///
/// ## Example
/// ```rust
/// use ventas_core::rut::check_digit;
///
/// assert_eq!(check_digit("12345678"), Some('5'));
/// assert_eq!(check_digit("12345670"), Some('K'));
/// assert_eq!(check_digit("12345675"), Some('0'));
/// assert_eq!(check_digit("12a45678"), None);
/// ```
pub fn check_digit(body: &str) -> Option<char> {
    if body.is_empty() || body.len() > MAX_BODY_DIGITS {
        return None;
    }

    let mut sum: u32 = 0;
    for (i, ch) in body.chars().rev().enumerate() {
        let digit = ch.to_digit(10)?;
        sum += digit * WEIGHTS[i % WEIGHTS.len()];
    }

    Some(match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        n => char::from_digit(n, 10).unwrap_or('0'),
    })
}

/// Validates a RUT: canonical shape plus modulo-11 checksum.
///
/// The input is normalized first, so any of the accepted spellings of the
/// same identifier validate identically. Malformed input yields `false`,
/// never an error.
///
/// ## Example
/// ```rust
/// use ventas_core::rut::is_valid;
///
/// assert!(is_valid("12345678-5"));
/// assert!(is_valid("12.345.678-5"));
/// assert!(!is_valid("12345678-4")); // flipped check digit
/// assert!(!is_valid("not-a-rut"));
/// ```
pub fn is_valid(rut: &str) -> bool {
    let rut = normalize(rut);

    let Some((body, dv)) = rut.split_once('-') else {
        return false;
    };

    // Shape: 1-9 digits, dash, one digit or K
    if body.is_empty() || body.len() > MAX_BODY_DIGITS {
        return false;
    }
    if !body.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let mut dv_chars = dv.chars();
    let supplied = match (dv_chars.next(), dv_chars.next()) {
        (Some(c), None) if c.is_ascii_digit() || c == 'K' => c,
        _ => return false,
    };

    check_digit(body) == Some(supplied)
}

// =============================================================================
// Rut Newtype
// =============================================================================

/// A validated, canonical RUT.
///
/// Parse once at the boundary, then pass the proven value around - code
/// holding a `Rut` never needs to re-validate.
///
/// ## Example
/// ```rust
/// use ventas_core::rut::Rut;
///
/// let rut = Rut::parse("12.345.678-5").unwrap();
/// assert_eq!(rut.as_str(), "12345678-5");
/// assert!(Rut::parse("12345678-4").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Rut(String);

impl Rut {
    /// Parses and validates a raw RUT string.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let canonical = normalize(raw);
        if is_valid(&canonical) {
            Ok(Rut(canonical))
        } else {
            Err(ValidationError::InvalidFormat {
                field: "rut".to_string(),
                reason: "check digit does not match".to_string(),
            })
        }
    }

    /// Returns the canonical textual form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the value and returns the canonical string.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Rut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Rut {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rut::parse(s)
    }
}

impl AsRef<str> for Rut {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
