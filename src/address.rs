//! Address expressions
//!
//! A fault is located either by a single byte offset (`0x1f`, `42`) or by an
//! inclusive range of offsets (`0x10-0x1f`).

use crate::error::FaultError;
use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

fn integer_regex() -> &'static Regex {
    static INTEGER: OnceLock<Regex> = OnceLock::new();
    INTEGER.get_or_init(|| {
        Regex::new(r"^([+-])?(?:0[xX]([0-9a-fA-F]+)|0[oO]([0-7]+)|0[bB]([01]+)|([0-9]+))$")
            .expect("integer literal regex is valid")
    })
}

/// Parse an integer literal.
///
/// Accepts an optional sign followed by a decimal, `0x` hexadecimal, `0o` octal
/// or `0b` binary number. Returns `None` for anything else, including values
/// that do not fit an `i64`.
pub fn parse_int(token: &str) -> Option<i64> {
    let captures = integer_regex().captures(token)?;
    let (digits, radix) = [(2, 16), (3, 8), (4, 2), (5, 10)]
        .into_iter()
        .find_map(|(group, radix)| captures.get(group).map(|m| (m.as_str(), radix)))?;
    let value = i64::from_str_radix(digits, radix).ok()?;
    match captures.get(1).map(|m| m.as_str()) {
        Some("-") => value.checked_neg(),
        _ => Some(value),
    }
}

/// Non-empty, strictly increasing run of byte offsets
///
/// Built from one offset or an inclusive range. Offsets are contiguous, so the
/// set is stored as its bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressSet {
    first: u64,
    last: u64,
}

impl AddressSet {
    /// Address set holding exactly one offset.
    pub fn single(offset: u64) -> Self {
        Self {
            first: offset,
            last: offset,
        }
    }

    /// Address set holding `first..=last`.
    ///
    /// # Returns
    ///
    /// * `None` if `first > last`.
    pub fn range(first: u64, last: u64) -> Option<Self> {
        (first <= last).then_some(Self { first, last })
    }

    /// Lowest offset of the set
    pub fn first(&self) -> u64 {
        self.first
    }

    /// Highest offset of the set
    pub fn last(&self) -> u64 {
        self.last
    }

    /// Number of offsets in the set
    pub fn len(&self) -> u64 {
        self.last - self.first + 1
    }

    /// Address sets are never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `true` if the set was built from a single offset
    pub fn is_single(&self) -> bool {
        self.first == self.last
    }

    /// Iterate over all offsets in increasing order
    pub fn iter(&self) -> RangeInclusive<u64> {
        self.first..=self.last
    }
}

fn non_negative(value: i64) -> Result<u64, FaultError> {
    u64::try_from(value).map_err(|_| FaultError::OutOfBounds(value))
}

/// Parse an address token into an [`AddressSet`].
///
/// # Arguments
///
/// * `token` - Either an integer literal or a range `A-B` of two literals.
///
/// # Returns
///
/// * `Ok(AddressSet)` - The parsed offsets.
/// * `Err(FaultError::EmptyAddressRange)` - If `A > B`.
/// * `Err(FaultError::InvalidAddressFormat)` - If the token is malformed.
pub fn parse_address(token: &str) -> Result<AddressSet, FaultError> {
    if let Some(value) = parse_int(token) {
        return Ok(AddressSet::single(non_negative(value)?));
    }

    let borders: Vec<&str> = token.split('-').collect();
    let &[first, last] = borders.as_slice() else {
        return Err(FaultError::InvalidAddressFormat(token.to_string()));
    };
    let (Some(first), Some(last)) = (parse_int(first), parse_int(last)) else {
        return Err(FaultError::InvalidAddressFormat(token.to_string()));
    };
    let (first, last) = (non_negative(first)?, non_negative(last)?);
    AddressSet::range(first, last).ok_or_else(|| FaultError::EmptyAddressRange(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x2A"), Some(42));
        assert_eq!(parse_int("0o52"), Some(42));
        assert_eq!(parse_int("0b101010"), Some(42));
        assert_eq!(parse_int("-0x10"), Some(-16));
        assert_eq!(parse_int("+7"), Some(7));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int("0x"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("0xFFFFFFFFFFFFFFFFFF"), None);
    }

    #[test]
    fn single_address() {
        let set = parse_address("0x6").unwrap();
        assert!(set.is_single());
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![6]);
    }

    #[test]
    fn inclusive_range() {
        let set = parse_address("0x3-5").unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert!(parse_address("4-4").unwrap().is_single());
    }

    #[test]
    fn empty_range_is_distinct_from_malformed_token() {
        assert!(matches!(
            parse_address("10-3"),
            Err(FaultError::EmptyAddressRange(token)) if token == "10-3"
        ));
        assert!(matches!(
            parse_address("abc"),
            Err(FaultError::InvalidAddressFormat(token)) if token == "abc"
        ));
        assert!(matches!(
            parse_address("1-2-3"),
            Err(FaultError::InvalidAddressFormat(_))
        ));
        assert!(matches!(
            parse_address("1-x"),
            Err(FaultError::InvalidAddressFormat(_))
        ));
    }

    #[test]
    fn negative_offset_is_out_of_bounds() {
        assert!(matches!(
            parse_address("-3"),
            Err(FaultError::OutOfBounds(-3))
        ));
    }
}
