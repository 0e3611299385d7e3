//! Constants and precision values for the pipeline

use crate::error::{invalid, Result};
use std::time::Duration;

/// ELA has 8 decimals (1 ELA = 100_000_000 sela)
pub const ELA_DECIMALS: u8 = 8;

/// Upper bound of a single ELA amount in sela (total supply cap)
pub const MAX_SELA: u64 = 33_000_000 * 100_000_000;

/// Chain code of the ELA main chain
pub const ELA_CHAIN_CODE: &str = "ELA";

/// ERC-4337 v0.6 entry point
pub const ENTRY_POINT_V06: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";

/// SimpleAccountFactory deployed alongside the v0.6 entry point
pub const SIMPLE_ACCOUNT_FACTORY_V06: &str = "0x9406Cc6185a346906296840746125a0E44976454";

/// Default receipt polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Default number of receipt polling attempts
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;

/// Default time to wait for the external signer
pub const DEFAULT_SIGNER_TIMEOUT: Duration = Duration::from_secs(300);

/// Signature accepted by SimpleAccount validation during gas estimation
pub const DUMMY_SIGNATURE: &str = "0xfffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c";

/// Parse a display-unit decimal string into base units.
///
/// Exact over integers: `"1.5"` with 8 decimals is `150_000_000`. Signs,
/// exponents and more fractional digits than `decimals` are rejected.
pub fn scale_to_decimals(value: &str, decimals: u8) -> Result<u64> {
    let value = value.trim();
    if decimals > 30 {
        return Err(invalid(format!("unsupported precision of {decimals} decimals")));
    }
    if value.is_empty() {
        return Err(invalid("amount is empty"));
    }

    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) || (whole.is_empty() && fraction.is_empty())
    {
        return Err(invalid(format!("amount {value:?} is not a plain decimal number")));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid(format!(
            "amount {value:?} has more than {decimals} decimal places"
        )));
    }

    let multiplier = 10u128.pow(decimals as u32);
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| invalid(format!("amount {value:?} is too large")))?
    };
    let padded = format!("{fraction:0<width$}", width = decimals as usize);
    let fraction: u128 = if padded.is_empty() {
        0
    } else {
        padded
            .parse()
            .map_err(|_| invalid(format!("amount {value:?} is too large")))?
    };

    let scaled = whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| invalid(format!("amount {value:?} is too large")))?;

    u64::try_from(scaled).map_err(|_| invalid(format!("amount {value:?} is too large")))
}

/// Scale an ELA amount (8 decimals) and check it against the supply cap
pub fn parse_ela(amount: &str) -> Result<u64> {
    let sela = scale_to_decimals(amount, ELA_DECIMALS)?;
    check_sela(sela)
}

/// Check a base-unit amount is positive and within the supply cap
pub fn check_sela(sela: u64) -> Result<u64> {
    if sela == 0 {
        return Err(invalid("amount must be positive"));
    }
    if sela > MAX_SELA {
        return Err(invalid(format!("amount {sela} exceeds the ELA supply")));
    }
    Ok(sela)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_ela() {
        // 1 ELA = 100_000_000 sela
        assert_eq!(scale_to_decimals("1", 8).unwrap(), 100_000_000);
        // 0.5 ELA = 50_000_000
        assert_eq!(scale_to_decimals("0.5", 8).unwrap(), 50_000_000);
        // smallest unit
        assert_eq!(scale_to_decimals("0.00000001", 8).unwrap(), 1);
        assert_eq!(scale_to_decimals(".25", 8).unwrap(), 25_000_000);
        assert_eq!(scale_to_decimals("3.", 8).unwrap(), 300_000_000);
    }

    #[test]
    fn test_scale_is_exact() {
        // 0.1 + 0.2 style float drift must not appear
        assert_eq!(scale_to_decimals("0.3", 8).unwrap(), 30_000_000);
        assert_eq!(scale_to_decimals("1234567.89", 8).unwrap(), 123_456_789_000_000);
    }

    #[test]
    fn test_scale_rejects_bad_input() {
        assert!(scale_to_decimals("", 8).is_err());
        assert!(scale_to_decimals(".", 8).is_err());
        assert!(scale_to_decimals("-1", 8).is_err());
        assert!(scale_to_decimals("1e8", 8).is_err());
        assert!(scale_to_decimals("0.000000001", 8).is_err());
        assert!(scale_to_decimals("1.2.3", 8).is_err());
    }

    #[test]
    fn test_parse_ela_bounds() {
        assert!(parse_ela("0").is_err());
        assert!(parse_ela("33000001").is_err());
        assert_eq!(parse_ela("33000000").unwrap(), MAX_SELA);
    }

    #[test]
    fn test_dummy_signature_is_65_bytes() {
        let sig = crate::encoding::decode_hex(DUMMY_SIGNATURE).unwrap();
        assert_eq!(sig.len(), 65);
        // r, s, v layout: v is the last byte
        assert_eq!(sig[64], 0x1c);
    }
}
