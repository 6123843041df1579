//! Shared prime tables, primality checks and report types for factorization experiments.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Available factorization algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    TrialDivision,
    ContinuedFraction,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::TrialDivision => write!(f, "Trial Division"),
            Algorithm::ContinuedFraction => write!(f, "Continued Fraction Convergents"),
        }
    }
}

/// Ordered, duplicate-free table of primes shared read-only by the factorizers.
///
/// Elements are trusted to be prime; [`PrimeSet::verify`] exists for tables
/// read from untrusted files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimeSet {
    primes: BTreeSet<BigUint>,
}

impl PrimeSet {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// All primes strictly below `bound`, via the Sieve of Eratosthenes.
    pub fn sieve(bound: u64) -> Self {
        sieve_primes(bound).into_iter().map(BigUint::from).collect()
    }

    /// Read whitespace-separated decimal integers until end of input.
    ///
    /// Tokens that don't parse are skipped with a warning.
    pub fn load<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut primes = BTreeSet::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            for token in line.split_whitespace() {
                match token.parse::<BigUint>() {
                    Ok(p) => {
                        primes.insert(p);
                    }
                    Err(e) => {
                        log::warn!(
                            "Skipping malformed prime token '{}' on line {}: {}",
                            token,
                            line_no + 1,
                            e
                        );
                    }
                }
            }
        }
        log::debug!("Loaded {} primes", primes.len());
        Ok(PrimeSet { primes })
    }

    /// [`PrimeSet::load`] from a file on disk.
    pub fn load_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::load(BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    pub fn contains(&self, n: &BigUint) -> bool {
        self.primes.contains(n)
    }

    /// Ascending iteration over the whole table.
    pub fn iter(&self) -> impl Iterator<Item = &BigUint> + '_ {
        self.primes.iter()
    }

    /// Ascending iteration over the primes strictly less than `n`.
    pub fn below<'a>(&'a self, n: &BigUint) -> impl Iterator<Item = &'a BigUint> + 'a {
        self.primes.range(..n.clone())
    }

    /// The smallest prime that is `>= n`, if the table reaches that far.
    pub fn next_at_least(&self, n: &BigUint) -> Option<&BigUint> {
        self.primes.range(n.clone()..).next()
    }

    pub fn largest(&self) -> Option<&BigUint> {
        self.primes.iter().next_back()
    }

    /// Run Miller-Rabin over every element.
    ///
    /// Returns the first element that fails the test.
    pub fn verify(&self, rounds: u32) -> Result<(), BigUint> {
        match self.primes.iter().find(|p| !is_probably_prime(p, rounds)) {
            Some(bad) => Err(bad.clone()),
            None => Ok(()),
        }
    }
}

impl FromIterator<BigUint> for PrimeSet {
    fn from_iter<I: IntoIterator<Item = BigUint>>(iter: I) -> Self {
        PrimeSet {
            primes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PrimeSet {
    type Item = &'a BigUint;
    type IntoIter = std::collections::btree_set::Iter<'a, BigUint>;

    fn into_iter(self) -> Self::IntoIter {
        self.primes.iter()
    }
}

/// Running products of the smallest primes: 2, 2*3, 2*3*5, ...
///
/// Built up to (and including) the first product exceeding a limit.
#[derive(Debug, Clone, Default)]
pub struct PrimorialTable {
    products: BTreeSet<BigUint>,
}

impl PrimorialTable {
    pub fn build(primes: &PrimeSet, limit: &BigUint) -> Self {
        let mut products = BTreeSet::new();
        let mut total = BigUint::one();
        for p in primes {
            total *= p;
            products.insert(total.clone());
            if &total > limit {
                break;
            }
        }
        PrimorialTable { products }
    }

    /// The smallest primorial `>= n`.
    pub fn next_at_least(&self, n: &BigUint) -> Option<&BigUint> {
        self.products.range(n.clone()..).next()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Bases that make Miller-Rabin exact below 3.3 * 10^24, which covers any
/// table a sieve can produce.
const FIXED_WITNESSES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Miller-Rabin check used to vet prime tables.
///
/// Every n is first tested against [`FIXED_WITNESSES`]; `rounds` extra random
/// witnesses only matter for numbers beyond that range.
pub fn is_probably_prime(n: &BigUint, rounds: u32) -> bool {
    if *n < BigUint::from(2u32) {
        return false;
    }
    for w in FIXED_WITNESSES {
        if *n == BigUint::from(w) {
            return true;
        }
        if (n % w).is_zero() {
            return false;
        }
    }

    let test = StrongProbablePrime::new(n);
    if !FIXED_WITNESSES
        .iter()
        .all(|&w| test.passes(&BigUint::from(w)))
    {
        return false;
    }

    // witnesses drawn from [2, n - 2]
    let span = n - 3u32;
    let width = n.to_bytes_be().len() + 1;
    let mut rng = rand::thread_rng();
    (0..rounds).all(|_| {
        let mut bytes = vec![0u8; width];
        rng.fill(&mut bytes[..]);
        let a = BigUint::from_bytes_be(&bytes) % &span + 2u32;
        test.passes(&a)
    })
}

/// An odd n > 2 with n - 1 = 2^r * d, d odd.
struct StrongProbablePrime<'a> {
    n: &'a BigUint,
    n_minus_1: BigUint,
    d: BigUint,
    r: u64,
}

impl<'a> StrongProbablePrime<'a> {
    fn new(n: &'a BigUint) -> Self {
        let n_minus_1 = n - 1u32;
        let r = n_minus_1.trailing_zeros().unwrap_or(0);
        let d = &n_minus_1 >> r;
        StrongProbablePrime { n, n_minus_1, d, r }
    }

    /// True unless `a` proves n composite.
    fn passes(&self, a: &BigUint) -> bool {
        let mut x = a.modpow(&self.d, self.n);
        if x.is_one() || x == self.n_minus_1 {
            return true;
        }
        for _ in 1..self.r {
            x = &x * &x % self.n;
            if x == self.n_minus_1 {
                return true;
            }
        }
        false
    }
}

/// Product of a factor list; 1 for an empty list.
pub fn product(factors: &[BigUint]) -> BigUint {
    factors.iter().fold(BigUint::one(), |acc, f| acc * f)
}

/// Generate all primes strictly below `bound`.
fn sieve_primes(bound: u64) -> Vec<u64> {
    if bound < 3 {
        return Vec::new();
    }
    let size = bound as usize;
    let mut is_prime = vec![true; size];
    is_prime[0] = false;
    is_prime[1] = false;
    let mut i = 2usize;
    while i * i < size {
        if is_prime[i] {
            let mut j = i * i;
            while j < size {
                is_prime[j] = false;
                j += i;
            }
        }
        i += 1;
    }
    is_prime
        .iter()
        .enumerate()
        .filter(|(_, &p)| p)
        .map(|(i, _)| i as u64)
        .collect()
}

/// Serialize big integers as decimal strings so JSON consumers don't lose precision.
pub mod serde_decimal {
    use num_bigint::BigUint;
    use serde::ser::SerializeSeq;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(n: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&n.to_str_radix(10))
    }

    pub fn serialize_vec<S: Serializer>(
        values: &[BigUint],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&v.to_str_radix(10))?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn big(values: &[u64]) -> Vec<BigUint> {
        values.iter().map(|&v| BigUint::from(v)).collect()
    }

    #[test]
    fn test_sieve_below_30() {
        let primes = PrimeSet::sieve(30);
        let got: Vec<BigUint> = primes.iter().cloned().collect();
        assert_eq!(got, big(&[2, 3, 5, 7, 11, 13, 17, 19, 23, 29]));
    }

    #[test]
    fn test_sieve_bound_is_exclusive() {
        let primes = PrimeSet::sieve(29);
        assert!(!primes.contains(&BigUint::from(29u32)));
        assert_eq!(primes.largest(), Some(&BigUint::from(23u32)));
    }

    #[test]
    fn test_sieve_degenerate_bounds() {
        assert!(PrimeSet::sieve(0).is_empty());
        assert!(PrimeSet::sieve(1).is_empty());
        assert!(PrimeSet::sieve(2).is_empty());
        assert_eq!(PrimeSet::sieve(3).len(), 1);
    }

    #[test]
    fn test_sieve_matches_trial_division() {
        let primes = PrimeSet::sieve(500);
        for n in 0u64..500 {
            let by_trial = n >= 2 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0);
            assert_eq!(
                primes.contains(&BigUint::from(n)),
                by_trial,
                "sieve disagrees with trial division at {}",
                n
            );
        }
        assert_eq!(primes.len(), 95);
    }

    #[test]
    fn test_load_skips_malformed_tokens() {
        let input = "2 3 five\n7\n\n11 x13 13\n";
        let primes = PrimeSet::load(Cursor::new(input)).unwrap();
        let got: Vec<BigUint> = primes.iter().cloned().collect();
        assert_eq!(got, big(&[2, 3, 7, 11, 13]));
    }

    #[test]
    fn test_load_orders_and_dedups() {
        let primes = PrimeSet::load(Cursor::new("7 3 5 3 2")).unwrap();
        let got: Vec<BigUint> = primes.iter().cloned().collect();
        assert_eq!(got, big(&[2, 3, 5, 7]));
    }

    #[test]
    fn test_load_empty_source() {
        let primes = PrimeSet::load(Cursor::new("")).unwrap();
        assert!(primes.is_empty());
        assert_eq!(primes.largest(), None);
    }

    #[test]
    fn test_load_file_big_primes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // 2^61 - 1 and 2^89 - 1 are Mersenne primes
        writeln!(file, "2 3 5").unwrap();
        writeln!(file, "2305843009213693951").unwrap();
        writeln!(file, "618970019642690137449562111").unwrap();
        file.flush().unwrap();

        let primes = PrimeSet::load_file(file.path()).unwrap();
        assert_eq!(primes.len(), 5);
        let m89: BigUint = "618970019642690137449562111".parse().unwrap();
        assert_eq!(primes.largest(), Some(&m89));
        assert!(primes.verify(20).is_ok());
    }

    #[test]
    fn test_load_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-primes.txt");
        assert!(PrimeSet::load_file(&missing).is_err());
    }

    #[test]
    fn test_verify_reports_composite() {
        let primes: PrimeSet = big(&[2, 3, 15, 17]).into_iter().collect();
        assert_eq!(primes.verify(20), Err(BigUint::from(15u32)));
    }

    #[test]
    fn test_below_and_next_at_least() {
        let primes = PrimeSet::sieve(30);
        let below: Vec<BigUint> = primes.below(&BigUint::from(11u32)).cloned().collect();
        assert_eq!(below, big(&[2, 3, 5, 7]));
        assert_eq!(
            primes.next_at_least(&BigUint::from(11u32)),
            Some(&BigUint::from(11u32))
        );
        assert_eq!(
            primes.next_at_least(&BigUint::from(24u32)),
            Some(&BigUint::from(29u32))
        );
        assert_eq!(primes.next_at_least(&BigUint::from(30u32)), None);
    }

    #[test]
    fn test_primorial_table() {
        let primes = PrimeSet::sieve(100);
        let table = PrimorialTable::build(&primes, &BigUint::from(3392u32));
        // 2, 6, 30, 210, 2310, 30030 (first past the limit)
        assert_eq!(table.len(), 6);
        assert_eq!(
            table.next_at_least(&BigUint::from(3392u32)),
            Some(&BigUint::from(30030u32))
        );
        assert_eq!(
            table.next_at_least(&BigUint::from(106u32)),
            Some(&BigUint::from(210u32))
        );
        assert_eq!(table.next_at_least(&BigUint::from(30031u32)), None);
    }

    #[test]
    fn test_primorial_table_short_prime_set() {
        let primes: PrimeSet = big(&[2, 3]).into_iter().collect();
        let table = PrimorialTable::build(&primes, &BigUint::from(1000u32));
        assert_eq!(table.len(), 2);
        assert_eq!(table.next_at_least(&BigUint::from(7u32)), None);
    }

    #[test]
    fn test_is_probably_prime() {
        assert!(is_probably_prime(&BigUint::from(7u32), 20));
        assert!(is_probably_prime(&BigUint::from(104729u32), 20));
        assert!(!is_probably_prime(&BigUint::from(100u32), 20));
        assert!(!is_probably_prime(&BigUint::from(1u32), 20));
        // Carmichael number
        assert!(!is_probably_prime(&BigUint::from(561u32), 20));
    }

    #[test]
    fn test_fixed_witnesses_alone() {
        // strong pseudoprime to bases 2, 3, 5 and 7; base 11 exposes it
        assert!(!is_probably_prime(&BigUint::from(3_215_031_751u64), 0));
        assert!(is_probably_prime(&BigUint::from(104729u32), 0));
        assert!(is_probably_prime(&BigUint::from(37u32), 0));
        assert!(!is_probably_prime(&BigUint::from(41u32 * 43), 0));
        let m61 = BigUint::from(2_305_843_009_213_693_951u64);
        assert!(is_probably_prime(&m61, 0));
        assert!(!is_probably_prime(&(&m61 * 3u32), 0));
    }

    #[test]
    fn test_product() {
        assert_eq!(product(&[]), BigUint::one());
        assert_eq!(product(&big(&[2, 2, 2, 2, 2, 2, 53])), BigUint::from(3392u32));
    }

    #[test]
    fn test_algorithm_display() {
        assert_eq!(Algorithm::TrialDivision.to_string(), "Trial Division");
        assert_eq!(
            Algorithm::ContinuedFraction.to_string(),
            "Continued Fraction Convergents"
        );
    }
}
