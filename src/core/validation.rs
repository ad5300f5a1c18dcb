//! Validation utilities for configuration and CLI values

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Validate positive integer value
pub fn validate_positive_int(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Parse a byte size such as `1048576`, `512KiB`, `256 MiB`, `1GB`.
///
/// Decimal (`KB`, `MB`, `GB`) and binary (`KiB`, `MiB`, `GiB`) suffixes are
/// accepted, case-insensitively. Zero is rejected since it would refuse every
/// artifact.
pub fn parse_byte_size(value: &str) -> Result<u64, String> {
    let trimmed = value.trim();
    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split_at);

    let number: u64 = digits
        .parse()
        .map_err(|_| format!("'{}' is not a valid byte size", value))?;

    let multiplier = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kib" => KIB,
        "kb" => 1000,
        "m" | "mib" => MIB,
        "mb" => 1000 * 1000,
        "g" | "gib" => GIB,
        "gb" => 1000 * 1000 * 1000,
        other => return Err(format!("Unknown byte size unit '{}' in '{}'", other, value)),
    };

    match number.checked_mul(multiplier) {
        Some(0) => Err("Byte size must be greater than 0".to_string()),
        Some(bytes) => Ok(bytes),
        None => Err(format!("Byte size '{}' is too large", value)),
    }
}

/// Validate that a distribution URL uses a scheme the fetcher understands
pub fn validate_source_url(url: &str) -> Result<(), String> {
    if url.trim().is_empty() {
        return Err("Source URL cannot be empty".to_string());
    }
    match url.split_once("://") {
        None => Ok(()), // plain local path
        Some(("http" | "https" | "file", _)) => Ok(()),
        Some((scheme, _)) => Err(format!(
            "Unsupported URL scheme '{}'. Only http://, https:// and file:// are supported",
            scheme
        )),
    }
}
