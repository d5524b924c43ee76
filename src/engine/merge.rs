// ABOUTME: Merge strategies for recombining isolated branch contexts
// ABOUTME: Implements first-success, all-success, and majority-vote selection

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::context::Context;
use super::error::ExecutionError;
use super::result::ExecutionResult;

/// Policy for folding sibling branches back into one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// First successful branch in input order wins.
    FirstSuccess,
    /// Every branch must succeed; provenance and metadata are folded into
    /// the first branch's context.
    AllSuccess,
    /// Branches vote by state digest; the most frequent digest wins
    /// (ties go to the earliest branch). Used to validate that nominally
    /// deterministic tasks agree.
    Majority,
}

/// Raised when a strategy cannot produce a merged context.
///
/// Carries every (task kind, error) pair plus the successful branch
/// contexts, so callers can salvage partial work.
#[derive(Error, Debug)]
pub struct MergeError {
    pub failures: Vec<(String, ExecutionError)>,
    pub partial: Vec<Context>,
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "merge failed; {} branch(es) errored:", self.failures.len())?;
        for (kind, err) in &self.failures {
            write!(f, " [{}: {}]", kind, err)?;
        }
        Ok(())
    }
}

impl MergeError {
    fn from_results(results: &[ExecutionResult]) -> Self {
        let failures = results
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| (r.task_kind.clone(), e.clone())))
            .collect();
        let partial = results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.context.clone())
            .collect();
        Self { failures, partial }
    }
}

/// Fold a batch of branch results into a single context.
pub fn merge_results(
    strategy: MergeStrategy,
    results: &[ExecutionResult],
) -> Result<Context, MergeError> {
    match strategy {
        MergeStrategy::FirstSuccess => first_success(results),
        MergeStrategy::AllSuccess => all_success(results),
        MergeStrategy::Majority => majority(results),
    }
}

fn first_success(results: &[ExecutionResult]) -> Result<Context, MergeError> {
    results
        .iter()
        .find(|r| r.is_success())
        .map(|r| r.context.clone())
        .ok_or_else(|| MergeError::from_results(results))
}

fn all_success(results: &[ExecutionResult]) -> Result<Context, MergeError> {
    if results.iter().any(|r| !r.is_success()) {
        return Err(MergeError::from_results(results));
    }

    let mut iter = results.iter();
    let mut base = match iter.next() {
        Some(first) => first.context.clone(),
        None => {
            return Err(MergeError {
                failures: Vec::new(),
                partial: Vec::new(),
            })
        }
    };

    for result in iter {
        base.absorb(&result.context);
    }

    Ok(base)
}

fn majority(results: &[ExecutionResult]) -> Result<Context, MergeError> {
    let successes: Vec<&ExecutionResult> = results.iter().filter(|r| r.is_success()).collect();
    if successes.is_empty() {
        return Err(MergeError::from_results(results));
    }

    // Count digests in input order; ties resolve to the digest seen first.
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for result in &successes {
        let digest = result.context.state_digest();
        if !counts.contains_key(&digest) {
            order.push(digest.clone());
        }
        *counts.entry(digest).or_insert(0) += 1;
    }

    // max_by_key would take the last maximum; ties must go to the first seen
    let mut winner = &order[0];
    for digest in &order[1..] {
        if counts[digest] > counts[winner] {
            winner = digest;
        }
    }

    debug!(
        "Majority merge: {} distinct digests over {} branches, winner count {}",
        order.len(),
        successes.len(),
        counts[winner]
    );

    let chosen = successes
        .iter()
        .find(|r| &r.context.state_digest() == winner)
        .expect("winner digest came from a successful branch");

    Ok(chosen.context.clone())
}
