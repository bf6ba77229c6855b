//! Mixed-radix enumeration over a vector of finite domains.
//!
//! Index vectors start at all zeros. Each step emits the current vector,
//! then increments position 0, carrying into position `p + 1` whenever
//! position `p` wraps. The sequence ends once the carry runs past the last
//! position. A zero-length vector of radices yields one empty vector; any
//! zero radix yields nothing.
//!
//! Enumerators are consumed as they go. Re-running an enumeration means
//! constructing a new one, which always reproduces the same sequence.

use std::iter::FusedIterator;

use dbcbet_core::Value;

use crate::finitize::Domain;

/// Iterator over mixed-radix index vectors, optionally capped at `budget`
/// emissions.
#[derive(Debug, Clone)]
pub struct IndexVectors {
    radices: Vec<usize>,
    current: Option<Vec<usize>>,
    remaining: Option<usize>,
}

impl IndexVectors {
    pub fn new(radices: Vec<usize>, budget: Option<usize>) -> Self {
        let current = if radices.contains(&0) {
            None
        } else {
            Some(vec![0; radices.len()])
        };
        IndexVectors {
            radices,
            current,
            remaining: budget,
        }
    }

    /// Advances `index` in place. Returns false once it would carry past
    /// the last position.
    fn increment(&self, index: &mut [usize]) -> bool {
        for (digit, radix) in index.iter_mut().zip(&self.radices) {
            *digit += 1;
            if *digit < *radix {
                return true;
            }
            *digit = 0;
        }
        false
    }
}

impl Iterator for IndexVectors {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.remaining == Some(0) {
            self.current = None;
            return None;
        }
        let emitted = self.current.take()?;
        let mut next = emitted.clone();
        if self.increment(&mut next) {
            self.current = Some(next);
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(emitted)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let Some(current) = &self.current else {
            return (0, Some(0));
        };
        // Emissions left = total - rank(current).
        let mut rank: usize = 0;
        let mut weight: usize = 1;
        let mut overflow = false;
        for (digit, radix) in current.iter().zip(&self.radices) {
            match digit
                .checked_mul(weight)
                .and_then(|v| rank.checked_add(v))
                .zip(weight.checked_mul(*radix))
            {
                Some((r, w)) => {
                    rank = r;
                    weight = w;
                }
                None => {
                    overflow = true;
                    break;
                }
            }
        }
        let left = if overflow { None } else { Some(weight - rank) };
        match (left, self.remaining) {
            (Some(l), Some(b)) => (l.min(b), Some(l.min(b))),
            (Some(l), None) => (l, Some(l)),
            (None, Some(b)) => (b, Some(b)),
            (None, None) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for IndexVectors {}

/// Value tuples over borrowed domains, in mixed-radix order.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    domains: &'a [Domain],
    indices: IndexVectors,
}

impl Iterator for Combinations<'_> {
    type Item = Vec<Value>;

    fn next(&mut self) -> Option<Vec<Value>> {
        let index = self.indices.next()?;
        index
            .iter()
            .zip(self.domains)
            .map(|(i, domain)| domain.get(*i).cloned())
            .collect()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl FusedIterator for Combinations<'_> {}

/// Every value tuple over `domains`, at most `budget` of them.
pub fn combinations(domains: &[Domain], budget: Option<usize>) -> Combinations<'_> {
    Combinations {
        domains,
        indices: IndexVectors::new(domains.iter().map(Domain::len).collect(), budget),
    }
}

/// Size of the full product, or `None` if it overflows `usize`.
pub fn total_combinations(domains: &[Domain]) -> Option<usize> {
    domains
        .iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(d.len()))
}
