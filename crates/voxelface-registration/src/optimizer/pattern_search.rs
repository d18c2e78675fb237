//! Pattern search: deterministic derivative-free local minimization.

use std::time::Instant;
use crate::error::{RegistrationError, Result};
use super::trait_::CostFunction;

/// Options for one pattern search run.
///
/// `initial_step` and `min_step` are unitless multipliers applied to the
/// per-parameter scales; the search stops when the step shrinks below
/// `min_step` (converged) or the iteration budget runs out.
#[derive(Debug, Clone)]
pub struct PatternSearchOptions {
    pub initial_step: f64,
    pub min_step: f64,
    pub max_iterations: usize,
    /// Checked between sweeps; expiring raises `RegistrationError::Timeout`
    /// rather than returning a partially converged result.
    pub deadline: Option<Instant>,
}

impl Default for PatternSearchOptions {
    fn default() -> Self {
        Self {
            initial_step: 1.0,
            min_step: 1e-3,
            max_iterations: 100,
            deadline: None,
        }
    }
}

/// Outcome of a pattern search run.
#[derive(Debug, Clone)]
pub struct PatternSearchResult {
    pub params: Vec<f64>,
    pub loss: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
}

/// Minimize `cost` over the parameters flagged in `active`, starting from
/// `initial`.
///
/// Each sweep probes every active parameter at `± step * scale[i]` and
/// greedily accepts the first improving probe per parameter; a sweep with
/// no improvement halves the step. A compass search in the Hooke-Jeeves
/// family. The entire optimizer state is the current point and step size,
/// so calls are pure and results reproducible.
pub fn minimize(
    cost: &impl CostFunction,
    initial: &[f64],
    scales: &[f64],
    active: &[bool],
    options: &PatternSearchOptions,
) -> Result<PatternSearchResult> {
    if scales.len() != initial.len() || active.len() != initial.len() {
        return Err(RegistrationError::InvalidConfiguration(format!(
            "parameter vector ({}), scales ({}) and active mask ({}) must have equal length",
            initial.len(),
            scales.len(),
            active.len()
        )));
    }
    if !(options.initial_step > 0.0) || !(options.min_step > 0.0) {
        return Err(RegistrationError::InvalidConfiguration(
            "step sizes must be positive".into(),
        ));
    }

    let start = Instant::now();
    let mut params = initial.to_vec();
    let mut best = cost.evaluate(&params);
    let mut evaluations = 1usize;
    let mut step = options.initial_step;
    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < options.max_iterations {
        if let Some(deadline) = options.deadline {
            if Instant::now() >= deadline {
                return Err(RegistrationError::Timeout(format!(
                    "deadline expired after {:.1}s ({} evaluations)",
                    start.elapsed().as_secs_f64(),
                    evaluations
                )));
            }
        }

        let mut improved = false;
        for i in 0..params.len() {
            if !active[i] {
                continue;
            }
            for direction in [1.0, -1.0] {
                let mut candidate = params.clone();
                candidate[i] += direction * step * scales[i];
                let loss = cost.evaluate(&candidate);
                evaluations += 1;
                if loss + 1e-12 < best {
                    best = loss;
                    params = candidate;
                    improved = true;
                    break;
                }
            }
        }

        iterations += 1;
        if !improved {
            step *= 0.5;
            if step < options.min_step {
                converged = true;
                break;
            }
        }
    }

    tracing::debug!(
        iterations,
        evaluations,
        loss = best,
        converged,
        "pattern search finished"
    );

    Ok(PatternSearchResult {
        params,
        loss: best,
        iterations,
        evaluations,
        converged,
    })
}
