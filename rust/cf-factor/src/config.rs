//! Run configuration: JSON file, then `--key=value` overrides.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::candidates::CandidateMode;
use crate::error::ConfigError;

/// Default sieve bound when no prime file is given.
pub const DEFAULT_PRIME_BOUND: u64 = 10_000;

/// Default cap on randomized retries per number.
pub const DEFAULT_MAX_RETRIES: u32 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorConfig {
    /// How the first candidate for each number is built.
    pub mode: CandidateMode,
    /// Randomized attempts allowed per number before giving up.
    pub max_retries: u32,
    /// Skip probability for the first attempt; 1 keeps every prime.
    pub initial_skip_prob: u32,
    /// Seed for reproducible runs. Unseeded runs draw from OS entropy.
    pub seed: Option<u64>,
    /// Sieve every prime below this when `primes_file` is unset.
    pub prime_bound: u64,
    /// Whitespace-separated prime table.
    pub primes_file: Option<PathBuf>,
    /// Miller-Rabin check every loaded prime.
    pub verify_primes: bool,
}

impl Default for FactorConfig {
    fn default() -> Self {
        FactorConfig {
            mode: CandidateMode::Deterministic,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_skip_prob: 1,
            seed: None,
            prime_bound: DEFAULT_PRIME_BOUND,
            primes_file: None,
            verify_primes: false,
        }
    }
}

impl FactorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: FactorConfig =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse { err })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            err,
        })?;
        let config = Self::from_json_str(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `--key=value` flags. Unknown flags are left for the caller.
    pub fn apply_args(&mut self, args: &[String]) -> Result<(), ConfigError> {
        if let Some(v) = flag_value(args, "--mode=") {
            self.mode = v.parse().map_err(|_| invalid("mode", v))?;
        }
        if let Some(v) = flag_value(args, "--max-retries=") {
            self.max_retries = v.parse().map_err(|_| invalid("max-retries", v))?;
        }
        if let Some(v) = flag_value(args, "--skip-prob=") {
            self.initial_skip_prob = v.parse().map_err(|_| invalid("skip-prob", v))?;
        }
        if let Some(v) = flag_value(args, "--seed=") {
            self.seed = Some(v.parse().map_err(|_| invalid("seed", v))?);
        }
        if let Some(v) = flag_value(args, "--bound=") {
            self.prime_bound = v.parse().map_err(|_| invalid("bound", v))?;
        }
        if let Some(v) = flag_value(args, "--primes=") {
            self.primes_file = Some(PathBuf::from(v));
        }
        if args.iter().any(|a| a == "--verify-primes") {
            self.verify_primes = true;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_skip_prob == 0 {
            return Err(invalid("initial_skip_prob", "0"));
        }
        Ok(())
    }

    /// Random source for one factoring request.
    ///
    /// Seeded configs give request `stream` the seed `seed + stream`, so
    /// batches stay reproducible regardless of scheduling.
    pub fn rng(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_entropy(),
        }
    }
}

/// Value of the last `--key=value` flag with the given prefix.
pub fn flag_value<'a>(args: &'a [String], prefix: &str) -> Option<&'a str> {
    args.iter().rev().find_map(|a| a.strip_prefix(prefix))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = FactorConfig::default();
        assert_eq!(config.mode, CandidateMode::Deterministic);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.initial_skip_prob, 1);
        assert_eq!(config.prime_bound, DEFAULT_PRIME_BOUND);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = FactorConfig::from_json_str(r#"{"mode": "primorial", "seed": 9}"#).unwrap();
        assert_eq!(config.mode, CandidateMode::Primorial);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_json_round_trip() {
        let config = FactorConfig {
            mode: CandidateMode::Randomized,
            max_retries: 12,
            initial_skip_prob: 3,
            seed: Some(77),
            prime_bound: 500,
            primes_file: Some(PathBuf::from("primes.txt")),
            verify_primes: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(FactorConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            FactorConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            FactorConfig::from_json_str(r#"{"initial_skip_prob": 0}"#),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_retries": 5, "prime_bound": 100}}"#).unwrap();
        file.flush().unwrap();
        let config = FactorConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.prime_bound, 100);

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FactorConfig::from_json_file(dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_apply_args() {
        let mut config = FactorConfig::default();
        config
            .apply_args(&args(&[
                "--mode=randomized",
                "--max-retries=7",
                "--skip-prob=4",
                "--seed=11",
                "--bound=2000",
                "--primes=table.txt",
                "--verify-primes",
                "3392",
            ]))
            .unwrap();
        assert_eq!(config.mode, CandidateMode::Randomized);
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.initial_skip_prob, 4);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.prime_bound, 2000);
        assert_eq!(config.primes_file, Some(PathBuf::from("table.txt")));
        assert!(config.verify_primes);
    }

    #[test]
    fn test_apply_args_rejects_garbage() {
        let mut config = FactorConfig::default();
        let err = config.apply_args(&args(&["--max-retries=lots"])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value 'lots' for max-retries");
        assert!(config.apply_args(&args(&["--mode=sieve"])).is_err());
        assert!(config.apply_args(&args(&["--skip-prob=0"])).is_err());
    }

    #[test]
    fn test_last_flag_wins() {
        let a = args(&["--seed=1", "--seed=2"]);
        assert_eq!(flag_value(&a, "--seed="), Some("2"));
        assert_eq!(flag_value(&a, "--bound="), None);
    }

    #[test]
    fn test_seeded_rng_streams() {
        let config = FactorConfig {
            seed: Some(100),
            ..FactorConfig::default()
        };
        let a: u64 = config.rng(3).gen();
        let b: u64 = config.rng(3).gen();
        let c: u64 = config.rng(4).gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
