//! Finite continued fractions of rational numbers.
//!
//! A ratio top/bottom expands to
//!   top/bottom = a_0 + 1/(a_1 + 1/(a_2 + ... + 1/a_n))
//! where the a_k are the successive quotients of the Euclidean algorithm.
//! The chain is stored front-to-back, each node owning its continuation, and
//! the value of every node is folded back from the innermost term:
//!   numerator   = a_k * next.numerator + next.denominator
//!   denominator = next.numerator
//! which yields top/g and bottom/g with g = gcd(top, bottom).

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use std::cell::OnceCell;
use std::fmt;

use crate::error::FactorError;

/// One term of a continued fraction plus the rest of the chain.
///
/// The value of a chain is cached on its outermost node only. Wrapping a
/// chain moves its cached value into the new front node, so building n
/// terms costs O(n) big-integer operations and memory stays linear in the
/// size of the terms. Inner nodes reached through [`continuation`] fold
/// their value on first request.
///
/// [`continuation`]: ContinuedFraction::continuation
pub struct ContinuedFraction {
    term: BigUint,
    continuation: Option<Box<ContinuedFraction>>,
    value: OnceCell<(BigUint, BigUint)>,
}

impl ContinuedFraction {
    /// A single-term fraction `term/1`.
    pub fn new(term: BigUint) -> Self {
        ContinuedFraction {
            value: OnceCell::from((term.clone(), BigUint::one())),
            term,
            continuation: None,
        }
    }

    /// `term + 1/continuation`.
    pub fn with_continuation(term: BigUint, mut continuation: ContinuedFraction) -> Self {
        let (next_num, next_den) = match continuation.value.take() {
            Some(value) => value,
            None => continuation.fold_value(),
        };
        let numerator = &term * &next_num + next_den;
        ContinuedFraction {
            term,
            continuation: Some(Box::new(continuation)),
            value: OnceCell::from((numerator, next_num)),
        }
    }

    pub fn term(&self) -> &BigUint {
        &self.term
    }

    pub fn continuation(&self) -> Option<&ContinuedFraction> {
        self.continuation.as_deref()
    }

    pub fn has_continuation(&self) -> bool {
        self.continuation.is_some()
    }

    pub fn numerator(&self) -> &BigUint {
        &self.value().0
    }

    pub fn denominator(&self) -> &BigUint {
        &self.value().1
    }

    /// Terms from the outermost `a_0` inwards.
    pub fn terms(&self) -> Terms<'_> {
        Terms { next: Some(self) }
    }

    fn value(&self) -> &(BigUint, BigUint) {
        self.value.get_or_init(|| self.fold_value())
    }

    /// Fold the terms from the innermost outwards. Seeding with 1/0 makes
    /// the innermost term read as term/1.
    fn fold_value(&self) -> (BigUint, BigUint) {
        let terms: Vec<&BigUint> = self.terms().collect();
        terms
            .into_iter()
            .rev()
            .fold((BigUint::one(), BigUint::zero()), |(num, den), a| {
                (a * &num + den, num)
            })
    }
}

// Derived drop, eq and debug would recurse once per term.
impl Drop for ContinuedFraction {
    fn drop(&mut self) {
        let mut next = self.continuation.take();
        while let Some(mut node) = next {
            next = node.continuation.take();
        }
    }
}

impl PartialEq for ContinuedFraction {
    fn eq(&self, other: &Self) -> bool {
        self.terms().eq(other.terms())
    }
}

impl Eq for ContinuedFraction {}

impl fmt::Debug for ContinuedFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuedFraction")
            .field("terms", &self.terms().collect::<Vec<_>>())
            .field("value", &format_args!("{}", self))
            .finish()
    }
}

impl fmt::Display for ContinuedFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator(), self.denominator())
    }
}

/// Iterator over the terms of a [`ContinuedFraction`].
pub struct Terms<'a> {
    next: Option<&'a ContinuedFraction>,
}

impl<'a> Iterator for Terms<'a> {
    type Item = &'a BigUint;

    fn next(&mut self) -> Option<&'a BigUint> {
        let node = self.next?;
        self.next = node.continuation();
        Some(&node.term)
    }
}

/// Partial quotients of top/bottom, outermost first.
///
/// ```text
/// while bottom > 0:
///   push top / bottom
///   (top, bottom) = (bottom, top mod bottom)
/// ```
pub fn euclidean_terms(top: &BigUint, bottom: &BigUint) -> Result<Vec<BigUint>, FactorError> {
    if bottom.is_zero() {
        return Err(FactorError::ZeroDenominator);
    }

    let mut terms = Vec::new();
    let mut top = top.clone();
    let mut bottom = bottom.clone();
    while !bottom.is_zero() {
        let (q, rem) = top.div_rem(&bottom);
        terms.push(q);
        top = std::mem::replace(&mut bottom, rem);
    }
    Ok(terms)
}

/// Expand top/bottom into a continued fraction chain.
///
/// The chain is assembled innermost-first: the last quotient becomes a
/// single-term node and each earlier quotient is wrapped around it.
pub fn expand(top: &BigUint, bottom: &BigUint) -> Result<ContinuedFraction, FactorError> {
    let mut terms = euclidean_terms(top, bottom)?;
    let innermost = terms.pop().ok_or(FactorError::ZeroDenominator)?;

    let mut fraction = ContinuedFraction::new(innermost);
    while let Some(term) = terms.pop() {
        fraction = ContinuedFraction::with_continuation(term, fraction);
    }
    Ok(fraction)
}

/// Convergents h_k/k_k of a term sequence, via the forward recurrence.
///
/// ```text
/// h_{-2} = 0, h_{-1} = 1, h_k = a_k * h_{k-1} + h_{k-2}
/// k_{-2} = 1, k_{-1} = 0, k_k = a_k * k_{k-1} + k_{k-2}
/// ```
/// The last convergent is the value of the whole fraction.
pub fn convergents(terms: &[BigUint]) -> Vec<(BigUint, BigUint)> {
    let mut h_prev2 = BigUint::zero();
    let mut h_prev1 = BigUint::one();
    let mut k_prev2 = BigUint::one();
    let mut k_prev1 = BigUint::zero();

    let mut out = Vec::with_capacity(terms.len());
    for a in terms {
        let h = a * &h_prev1 + &h_prev2;
        let k = a * &k_prev1 + &k_prev2;
        h_prev2 = std::mem::replace(&mut h_prev1, h.clone());
        k_prev2 = std::mem::replace(&mut k_prev1, k.clone());
        out.push((h, k));
    }
    out
}
