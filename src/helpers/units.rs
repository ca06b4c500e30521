use alloy::primitives::{U256, utils::parse_units};

use crate::deposit::MIN_DEPOSIT_AMOUNT;
use crate::error::{Error, Result};

const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Parses `<number> [wei|gwei|ether|eth]` into gwei. A bare number is wei.
pub fn parse_gwei(input: &str) -> Result<u64> {
    let input = input.trim();
    let invalid = |reason: &str| Error::InvalidAmount(format!("{} ({})", input, reason));

    let split = input
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);
    let number = number.trim();
    if number.is_empty() || number.starts_with('-') {
        return Err(invalid("expected a positive number"));
    }
    let unit = match unit.trim().to_lowercase().as_str() {
        "" | "wei" => "wei",
        "gwei" => "gwei",
        "eth" | "ether" => "ether",
        _ => return Err(invalid("unknown unit")),
    };

    let wei: U256 = parse_units(number, unit)
        .map_err(|e| invalid(&e.to_string()))?
        .get_absolute();
    let (gwei, rem) = wei.div_rem(U256::from(WEI_PER_GWEI));
    if !rem.is_zero() {
        return Err(invalid("not a whole number of gwei"));
    }
    u64::try_from(gwei).map_err(|_| invalid("too large"))
}

/// [`parse_gwei`], additionally requiring the deposit minimum.
pub fn parse_deposit_amount(input: &str) -> Result<u64> {
    let gwei = parse_gwei(input)?;
    if gwei < MIN_DEPOSIT_AMOUNT {
        return Err(Error::AmountTooSmall(gwei));
    }
    Ok(gwei)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units() {
        assert_eq!(parse_gwei("32 ether").unwrap(), 32_000_000_000);
        assert_eq!(parse_gwei("32Ether").unwrap(), 32_000_000_000);
        assert_eq!(parse_gwei("1.5 ETH").unwrap(), 1_500_000_000);
        assert_eq!(parse_gwei("32000000000 gwei").unwrap(), 32_000_000_000);
        assert_eq!(parse_gwei("1000000000000000000").unwrap(), 1_000_000_000);
        assert_eq!(parse_gwei("2000000000 wei").unwrap(), 2);
    }

    #[test]
    fn invalid_amounts() {
        for input in ["", "ether", "-1 ether", "32 bananas", "1 wei", "0.1 gwei", "abc"] {
            assert!(
                matches!(parse_gwei(input), Err(Error::InvalidAmount(_))),
                "{} should be rejected",
                input
            );
        }
        assert!(matches!(
            parse_gwei("100000000000 ether"),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn deposit_minimum() {
        assert_eq!(parse_deposit_amount("1 ether").unwrap(), MIN_DEPOSIT_AMOUNT);
        assert!(matches!(
            parse_deposit_amount("999999999 gwei"),
            Err(Error::AmountTooSmall(999_999_999))
        ));
    }
}
