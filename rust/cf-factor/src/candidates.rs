//! Candidate products fed to the continued fraction expansion.
//!
//! Every candidate is a product of primes from the table. Expanding
//! candidate/N leaves N/gcd(candidate, N) as the final denominator, so a
//! candidate sharing some but not all of N's prime factors splits N.

use std::fmt;
use std::str::FromStr;

use factoring_core::{PrimeSet, PrimorialTable};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How the first candidate for each number is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateMode {
    /// Product of every prime below N.
    Deterministic,
    /// Random subset of the primes below N, each kept with probability 1/skip_prob.
    Randomized,
    /// Smallest primorial 2*3*5*...*p that is >= N.
    Primorial,
}

impl fmt::Display for CandidateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateMode::Deterministic => write!(f, "deterministic"),
            CandidateMode::Randomized => write!(f, "randomized"),
            CandidateMode::Primorial => write!(f, "primorial"),
        }
    }
}

impl FromStr for CandidateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deterministic" | "det" => Ok(CandidateMode::Deterministic),
            "randomized" | "random" => Ok(CandidateMode::Randomized),
            "primorial" => Ok(CandidateMode::Primorial),
            other => Err(format!(
                "unknown candidate mode '{other}', expected deterministic|randomized|primorial"
            )),
        }
    }
}

/// Product of every prime strictly below `n`; 1 when there are none.
pub fn deterministic_product(n: &BigUint, primes: &PrimeSet) -> BigUint {
    primes.below(n).fold(BigUint::one(), |acc, p| acc * p)
}

/// Product of a random subset of the primes strictly below `n`.
///
/// Each prime is kept when a uniform draw from `[0, skip_prob)` is 0. A
/// `skip_prob` of 0 or 1 keeps every prime.
pub fn randomized_product<R: Rng + ?Sized>(
    n: &BigUint,
    primes: &PrimeSet,
    skip_prob: u32,
    rng: &mut R,
) -> BigUint {
    let range = skip_prob.max(1);
    primes
        .below(n)
        .filter(|_| rng.gen_range(0..range) == 0)
        .fold(BigUint::one(), |acc, p| acc * p)
}

/// Picks candidate products for one factoring request.
///
/// Owns the primorial table when running in [`CandidateMode::Primorial`],
/// built once up to the number being factored.
pub struct CandidateSelector<'a> {
    primes: &'a PrimeSet,
    mode: CandidateMode,
    primorials: Option<PrimorialTable>,
}

impl<'a> CandidateSelector<'a> {
    pub fn new(primes: &'a PrimeSet, mode: CandidateMode, limit: &BigUint) -> Self {
        let primorials = match mode {
            CandidateMode::Primorial => Some(PrimorialTable::build(primes, limit)),
            _ => None,
        };
        CandidateSelector {
            primes,
            mode,
            primorials,
        }
    }

    pub fn mode(&self) -> CandidateMode {
        self.mode
    }

    /// Candidate for `n`.
    ///
    /// `randomized` forces a random subset regardless of the base mode; that
    /// is how retries after a degenerate split get a different candidate.
    pub fn select<R: Rng + ?Sized>(
        &self,
        n: &BigUint,
        randomized: bool,
        skip_prob: u32,
        rng: &mut R,
    ) -> BigUint {
        if randomized {
            return randomized_product(n, self.primes, skip_prob, rng);
        }
        match (self.mode, &self.primorials) {
            (CandidateMode::Primorial, Some(table)) => match table.next_at_least(n) {
                // A primorial made only of primes that miss n is useless; the
                // full product still sees every prime below n.
                Some(p) if !p.gcd(n).is_one() => p.clone(),
                _ => deterministic_product(n, self.primes),
            },
            (CandidateMode::Randomized, _) => randomized_product(n, self.primes, skip_prob, rng),
            _ => deterministic_product(n, self.primes),
        }
    }
}
