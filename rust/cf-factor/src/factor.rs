//! Splitting numbers with continued fraction convergents.
//!
//! Strategy for each pending number N:
//! 1. N == 1 contributes nothing; N in the prime table is a factor.
//! 2. Build a candidate product C of primes (see [`crate::candidates`]).
//! 3. Expand C/N as a continued fraction. Its denominator is
//!    q = N / gcd(C, N), and d = N / q = gcd(C, N).
//! 4. If 1 < q < N, both q and d are proper cofactors: resolve q, then d.
//! 5. Otherwise the split is degenerate and N is retried with a random
//!    subset of primes. If C swallowed all of N the inclusion probability
//!    1/skip_prob drops for the retry; if C missed N entirely it rises.
//!    Cofactors of a genuine split start over at the configured skip_prob.
//!
//! The recursion is unrolled into a work stack. Pushing d before q keeps the
//! output order depth-first with the quotient branch first.

use std::time::{Duration, Instant};

use factoring_core::{serde_decimal, Algorithm, PrimeSet};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;
use serde::Serialize;

use crate::candidates::{CandidateMode, CandidateSelector};
use crate::cf::expand;
use crate::config::FactorConfig;
use crate::error::FactorError;

/// A complete prime factorization and how it was reached.
#[derive(Debug, Clone, Serialize)]
pub struct Factorization {
    /// The number that was factored.
    #[serde(serialize_with = "serde_decimal::serialize")]
    pub n: BigUint,
    /// Prime factors with multiplicity, in discovery order.
    #[serde(serialize_with = "serde_decimal::serialize_vec")]
    pub factors: Vec<BigUint>,
    /// Which algorithm produced this result.
    pub algorithm: Algorithm,
    /// Non-degenerate splits performed.
    pub splits: usize,
    /// Randomized retries taken after degenerate splits.
    pub degenerate_retries: usize,
    /// Time taken.
    pub duration: Duration,
}

impl Factorization {
    pub fn product(&self) -> BigUint {
        factoring_core::product(&self.factors)
    }

    /// Factors in ascending order.
    pub fn sorted_factors(&self) -> Vec<BigUint> {
        let mut sorted = self.factors.clone();
        sorted.sort();
        sorted
    }
}

/// A number still waiting to be resolved, with the state of its search.
#[derive(Debug)]
struct Pending {
    n: BigUint,
    randomized: bool,
    skip_prob: u32,
    attempts: u32,
}

/// Factor `n` completely using the candidate strategy in `config`.
///
/// Errors are returned instead of partial factor lists: an empty prime
/// table, a cofactor no prime in the table divides, or a number whose
/// randomized retries ran past `config.max_retries`.
pub fn factorize<R: Rng + ?Sized>(
    n: &BigUint,
    primes: &PrimeSet,
    config: &FactorConfig,
    rng: &mut R,
) -> Result<Factorization, FactorError> {
    let start = Instant::now();
    let mut result = Factorization {
        n: n.clone(),
        factors: Vec::new(),
        algorithm: Algorithm::ContinuedFraction,
        splits: 0,
        degenerate_retries: 0,
        duration: Duration::ZERO,
    };

    if n.is_zero() {
        return Err(FactorError::InvalidInput);
    }
    if n.is_one() {
        result.duration = start.elapsed();
        return Ok(result);
    }
    if primes.is_empty() {
        return Err(FactorError::EmptyPrimeSet);
    }

    let selector = CandidateSelector::new(primes, config.mode, n);
    let base_randomized = config.mode == CandidateMode::Randomized;
    let initial_skip_prob = config.initial_skip_prob.max(1);

    let mut stack = vec![Pending {
        n: n.clone(),
        randomized: base_randomized,
        skip_prob: initial_skip_prob,
        attempts: 0,
    }];

    while let Some(item) = stack.pop() {
        if item.n.is_one() {
            continue;
        }
        if primes.contains(&item.n) {
            log::trace!("{} is prime", item.n);
            result.factors.push(item.n);
            continue;
        }

        let candidate = selector.select(&item.n, item.randomized, item.skip_prob, rng);
        if !item.randomized && candidate.is_one() {
            // no prime in the table lies below n
            return Err(FactorError::NoUsableCandidate { n: item.n });
        }

        let quotient = expand(&candidate, &item.n)?.denominator().clone();
        let (divisor, rem) = item.n.div_rem(&quotient);
        debug_assert!(rem.is_zero(), "convergent denominator must divide n");

        if quotient.is_one() || divisor.is_one() {
            if !item.randomized && divisor.is_one() {
                return Err(FactorError::NoUsableCandidate { n: item.n });
            }

            let attempts = item.attempts + 1;
            if attempts > config.max_retries {
                log::debug!("Giving up on {} after {} attempts", item.n, item.attempts);
                return Err(FactorError::RetriesExhausted {
                    n: item.n,
                    attempts: item.attempts,
                });
            }
            let skip_prob = retry_skip_prob(item.skip_prob, quotient.is_one());
            log::trace!(
                "Degenerate split of {} (skip_prob={} -> {}), retrying randomized",
                item.n,
                item.skip_prob,
                skip_prob
            );
            result.degenerate_retries += 1;
            stack.push(Pending {
                n: item.n,
                randomized: true,
                skip_prob,
                attempts,
            });
            continue;
        }

        log::debug!("Split {} = {} x {}", item.n, quotient, divisor);
        result.splits += 1;
        stack.push(Pending {
            n: divisor,
            randomized: base_randomized,
            skip_prob: initial_skip_prob,
            attempts: 0,
        });
        stack.push(Pending {
            n: quotient,
            randomized: base_randomized,
            skip_prob: initial_skip_prob,
            attempts: 0,
        });
    }

    result.duration = start.elapsed();
    log::debug!(
        "Factored {} into {} primes ({} splits, {} retries) in {:?}",
        n,
        result.factors.len(),
        result.splits,
        result.degenerate_retries,
        result.duration
    );
    Ok(result)
}

/// Skip probability for the next randomized attempt.
///
/// A candidate that swallowed all of n (quotient 1) kept too many primes, so
/// fewer are kept next time. One that missed n entirely kept too few, so the
/// inclusion probability 1/skip_prob goes back up, never past 1.
fn retry_skip_prob(skip_prob: u32, swallowed: bool) -> u32 {
    if swallowed {
        skip_prob.saturating_add(1)
    } else {
        skip_prob.saturating_sub(1).max(1)
    }
}

/// [`factorize`] with a random source drawn from `config` (seeded or entropy).
pub fn factorize_with_config(
    n: &BigUint,
    primes: &PrimeSet,
    config: &FactorConfig,
) -> Result<Factorization, FactorError> {
    let mut rng = config.rng(0);
    factorize(n, primes, config, &mut rng)
}

/// Trial division by the primes in the table, smallest first.
///
/// Used as a reference: slow for large tables, but it never guesses.
pub fn factor_naive(n: &BigUint, primes: &PrimeSet) -> Result<Factorization, FactorError> {
    let start = Instant::now();
    if n.is_zero() {
        return Err(FactorError::InvalidInput);
    }

    let mut factors = Vec::new();
    let mut remaining = n.clone();
    if !remaining.is_one() && primes.is_empty() {
        return Err(FactorError::EmptyPrimeSet);
    }

    for p in primes {
        if remaining.is_one() {
            break;
        }
        if primes.contains(&remaining) {
            factors.push(remaining.clone());
            remaining = BigUint::one();
            break;
        }
        loop {
            let (q, r) = remaining.div_rem(p);
            if !r.is_zero() {
                break;
            }
            factors.push(p.clone());
            remaining = q;
        }
    }

    if !remaining.is_one() {
        return Err(FactorError::NoUsableCandidate { n: remaining });
    }

    Ok(Factorization {
        n: n.clone(),
        factors,
        algorithm: Algorithm::TrialDivision,
        splits: 0,
        degenerate_retries: 0,
        duration: start.elapsed(),
    })
}
