use num_bigint::BigUint;
use std::path::PathBuf;
use thiserror::Error;

/// Why a factoring request did not produce a complete prime factorization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactorError {
    #[error("input must be a positive integer")]
    InvalidInput,
    #[error("no primes available")]
    EmptyPrimeSet,
    #[error("no prime in the table divides {n}")]
    NoUsableCandidate { n: BigUint },
    #[error("failed to split {n} within {attempts} randomized attempts")]
    RetriesExhausted { n: BigUint, attempts: u32 },
    #[error("continued fraction denominator must be non-zero")]
    ZeroDenominator,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error reading config {path:?}: {err}")]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("Error parsing config: {err}")]
    Parse {
        #[source]
        err: serde_json::Error,
    },
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
