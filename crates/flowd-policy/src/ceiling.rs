//! Resource ceiling parsing: CPU (millicores) and memory (bytes).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid cpu ceiling {0:?}")]
    InvalidCpu(String),
    #[error("invalid memory ceiling {0:?}")]
    InvalidMemory(String),
    #[error("memory ceiling must not be negative: {0:?}")]
    NegativeMemory(String),
    #[error("unknown profile {0:?}")]
    UnknownProfile(String),
}

/// Parse a CPU ceiling into millicores.
///
/// `"500m"` → `500`; a bare integer or float (number of cores) rounds to
/// the nearest millicore: `"1.5"` → `1500`, `"2"` → `2000`.
pub fn parse_cpu_millicores(raw: &str) -> Result<u64, PolicyError> {
    let trimmed = raw.trim();
    if let Some(digits) = trimmed.strip_suffix('m') {
        return digits
            .parse::<u64>()
            .map_err(|_| PolicyError::InvalidCpu(raw.to_string()));
    }
    let cores: f64 = trimmed
        .parse()
        .map_err(|_| PolicyError::InvalidCpu(raw.to_string()))?;
    if cores < 0.0 || !cores.is_finite() {
        return Err(PolicyError::InvalidCpu(raw.to_string()));
    }
    Ok((cores * 1000.0).round() as u64)
}

/// Parse a memory ceiling into bytes.
///
/// Accepts binary-tiered suffixes (`Ki`/`KiB`, `Mi`/`MiB`, `Gi`/`GiB`) and
/// their non-`i` aliases (`K`, `M`, `G`), which are treated identically
/// (binary multiples), or a bare integer byte count. Negative values are
/// rejected.
pub fn parse_memory_bytes(raw: &str) -> Result<u64, PolicyError> {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('-') {
        // allow the suffix to still be validated for a clearer error, but
        // any negative magnitude is rejected outright.
        let _ = rest;
        return Err(PolicyError::NegativeMemory(raw.to_string()));
    }

    const TIERS: &[(&str, u64)] = &[
        ("GiB", 1024 * 1024 * 1024),
        ("Gi", 1024 * 1024 * 1024),
        ("MiB", 1024 * 1024),
        ("Mi", 1024 * 1024),
        ("KiB", 1024),
        ("Ki", 1024),
        ("G", 1024 * 1024 * 1024),
        ("M", 1024 * 1024),
        ("K", 1024),
    ];

    for (suffix, multiplier) in TIERS {
        if let Some(digits) = trimmed.strip_suffix(suffix) {
            let n: u64 = digits
                .trim()
                .parse()
                .map_err(|_| PolicyError::InvalidMemory(raw.to_string()))?;
            return Ok(n.saturating_mul(*multiplier));
        }
    }

    trimmed
        .parse::<u64>()
        .map_err(|_| PolicyError::InvalidMemory(raw.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct ResourceCeiling {
    pub cpu_millicores: Option<u64>,
    pub memory_bytes: Option<u64>,
}
