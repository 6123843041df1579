//! # cf-factor
//!
//! Heuristic integer factoring via continued fraction convergents.
//!
//! A product of primes C is expanded against the target N as the continued
//! fraction of C/N. The denominator of the full convergent is
//! N / gcd(C, N), which splits N whenever C captures some, but not all, of
//! its prime factors. Cofactors are split again until every factor is in the
//! prime table.
//!
//! ## Modules
//!
//! - **cf**: continued fraction chains and the Euclidean expansion
//! - **candidates**: deterministic, randomized and primorial candidate products
//! - **factor**: the splitting loop with bounded randomized retries, plus a
//!   trial-division reference
//! - **config**: run configuration (JSON file and `--key=value` flags)
//!
//! The method is an experiment, not a proven algorithm: results are checked
//! by multiplying the factors back together, never assumed.

pub mod candidates;
pub mod cf;
pub mod config;
pub mod error;
pub mod factor;

pub use candidates::CandidateMode;
pub use config::FactorConfig;
pub use error::{ConfigError, FactorError};
pub use factor::{factor_naive, factorize, factorize_with_config, Factorization};
