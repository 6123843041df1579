//! cf-factor CLI: factor integers with continued fraction convergents.
//!
//! Usage:
//!   cf-factor [options] [N ...]
//!
//! Numbers given on the command line are factored in parallel. With no
//! numbers, one number per line is read from stdin until EOF.
//!
//! Options:
//!   --primes=<file>        Whitespace-separated prime table (default: sieve)
//!   --bound=<N>            Sieve all primes below N (default: 10000)
//!   --mode=<mode>          deterministic | randomized | primorial
//!   --method=<method>      cf (default) | naive (trial division)
//!   --max-retries=<N>      Randomized retries per number (default: 1000)
//!   --skip-prob=<N>        Initial skip probability (default: 1)
//!   --seed=<N>             Seed for reproducible runs
//!   --config=<file.json>   Load settings from JSON; flags override it
//!   --verify-primes        Miller-Rabin check the prime table
//!   --json                 One JSON report per number

use std::io::{self, BufRead, Write};

use factoring_core::PrimeSet;
use num_bigint::BigUint;
use rayon::prelude::*;
use serde::Serialize;

use cf_factor::config::flag_value;
use cf_factor::{factor_naive, factorize, FactorConfig, FactorError, Factorization};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Method {
    ContinuedFraction,
    Naive,
}

/// CLI configuration parsed from command-line arguments.
struct CliConfig {
    factor: FactorConfig,
    method: Method,
    json: bool,
    numbers: Vec<String>,
}

/// One line of output, successful or not.
#[derive(Serialize)]
struct Report {
    input: String,
    #[serde(flatten)]
    result: Option<Factorization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_args(args: &[String]) -> Result<CliConfig, String> {
    let mut factor = match flag_value(args, "--config=") {
        Some(path) => FactorConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => FactorConfig::default(),
    };
    factor.apply_args(args).map_err(|e| e.to_string())?;

    let method = match flag_value(args, "--method=") {
        None | Some("cf") => Method::ContinuedFraction,
        Some("naive") => Method::Naive,
        Some(other) => return Err(format!("Unknown method: {other}. Use --method=cf|naive")),
    };

    let json = args.iter().any(|a| a == "--json");
    let numbers = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .cloned()
        .collect();

    Ok(CliConfig {
        factor,
        method,
        json,
        numbers,
    })
}

fn load_primes(config: &FactorConfig) -> Result<PrimeSet, String> {
    let primes = match &config.primes_file {
        Some(path) => {
            log::info!("Loading primes from {}", path.display());
            PrimeSet::load_file(path)
                .map_err(|e| format!("could not read prime table {}: {}", path.display(), e))?
        }
        None => {
            log::info!("Sieving primes below {}", config.prime_bound);
            PrimeSet::sieve(config.prime_bound)
        }
    };

    if primes.is_empty() {
        return Err("no primes available".to_string());
    }
    if config.verify_primes {
        primes
            .verify(20)
            .map_err(|bad| format!("prime table contains composite {}", bad))?;
    }
    log::info!(
        "Prime table ready: {} primes, largest {}",
        primes.len(),
        primes.largest().map(|p| p.to_string()).unwrap_or_default()
    );
    Ok(primes)
}

fn factor_one(input: &str, primes: &PrimeSet, cli: &CliConfig, stream: u64) -> Report {
    let outcome = input
        .trim()
        .parse::<BigUint>()
        .map_err(|e| format!("not a positive integer: {}", e))
        .and_then(|n| {
            let result = match cli.method {
                Method::ContinuedFraction => {
                    let mut rng = cli.factor.rng(stream);
                    factorize(&n, primes, &cli.factor, &mut rng)
                }
                Method::Naive => factor_naive(&n, primes),
            };
            result.map_err(|e: FactorError| e.to_string())
        });

    match outcome {
        Ok(result) => Report {
            input: input.trim().to_string(),
            result: Some(result),
            error: None,
        },
        Err(e) => {
            log::warn!("Failed to factor '{}': {}", input.trim(), e);
            Report {
                input: input.trim().to_string(),
                result: None,
                error: Some(e),
            }
        }
    }
}

fn render(report: &Report, json: bool) -> String {
    if json {
        return serde_json::to_string(report)
            .unwrap_or_else(|e| format!("{{\"error\":\"could not serialize report: {}\"}}", e));
    }
    match (&report.result, &report.error) {
        (Some(result), _) => {
            let factors: Vec<String> = result.factors.iter().map(|f| f.to_string()).collect();
            format!("{}: {}", report.input, factors.join(" "))
        }
        (None, Some(e)) => format!("{}: FAILED ({})", report.input, e),
        (None, None) => format!("{}: FAILED", report.input),
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let primes = match load_primes(&cli.factor) {
        Ok(primes) => primes,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if !cli.numbers.is_empty() {
        let reports: Vec<Report> = cli
            .numbers
            .par_iter()
            .enumerate()
            .map(|(i, input)| factor_one(input, &primes, &cli, i as u64))
            .collect();
        for report in &reports {
            println!("{}", render(report, cli.json));
        }
        return;
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (i, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Error reading stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let report = factor_one(&line, &primes, &cli, i as u64);
        let written = writeln!(out, "{}", render(&report, cli.json)).and_then(|()| out.flush());
        if let Err(e) = written {
            log::debug!("Stopping, stdout closed: {}", e);
            break;
        }
    }
}
