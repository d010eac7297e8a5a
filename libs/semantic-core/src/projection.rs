//! Deterministic sparse random projection matrices (Achlioptas, 2003).
//!
//! Each matrix entry is independently drawn as `+sqrt(s)` with
//! probability `1/(2s)`, `0` with probability `1-1/s`, `-sqrt(s)` with
//! probability `1/(2s)`, `s=3`. Matrices are generated once per
//! `(slot, seed)` and published immutably for the process lifetime.

use once_cell::sync::Lazy;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::MODEL_DIM;
use llm_governance_models::SLOT_DIM;

pub const SPARSITY_S: f32 = 3.0;

pub const ACTION_SEED: u64 = 42;
pub const RESOURCE_SEED: u64 = 43;
pub const DATA_SEED: u64 = 44;
pub const RISK_SEED: u64 = 45;

pub type ProjectionMatrix = [[f32; MODEL_DIM]; SLOT_DIM];

/// Build a `(d_out x d_in)` sparse projection matrix deterministically
/// from `seed`.
pub fn create_sparse_projection_matrix(seed: u64) -> ProjectionMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let sqrt_s = SPARSITY_S.sqrt();
    let prob_nonzero = 1.0 / SPARSITY_S; // 1/3: split evenly between +/-
    let mut matrix = [[0f32; MODEL_DIM]; SLOT_DIM];
    for row in matrix.iter_mut() {
        for cell in row.iter_mut() {
            let draw: f32 = rng.gen_range(0.0..1.0);
            *cell = if draw < prob_nonzero / 2.0 {
                sqrt_s
            } else if draw < prob_nonzero {
                -sqrt_s
            } else {
                0.0
            };
        }
    }
    matrix
}

static ACTION_MATRIX: Lazy<ProjectionMatrix> = Lazy::new(|| create_sparse_projection_matrix(ACTION_SEED));
static RESOURCE_MATRIX: Lazy<ProjectionMatrix> = Lazy::new(|| create_sparse_projection_matrix(RESOURCE_SEED));
static DATA_MATRIX: Lazy<ProjectionMatrix> = Lazy::new(|| create_sparse_projection_matrix(DATA_SEED));
static RISK_MATRIX: Lazy<ProjectionMatrix> = Lazy::new(|| create_sparse_projection_matrix(RISK_SEED));

/// Fetch the published projection matrix for a named slot. Panics on
/// an unrecognized slot name — the slot schema is fixed and closed.
pub fn projection_matrix_for(slot: &str) -> &'static ProjectionMatrix {
    match slot {
        "action" => &ACTION_MATRIX,
        "resource" => &RESOURCE_MATRIX,
        "data" => &DATA_MATRIX,
        "risk" => &RISK_MATRIX,
        other => panic!("unknown semantic slot: {other}"),
    }
}

/// Project a 384-dim embedding through `matrix` into 32 dims (no
/// normalization — that is the encoder's job).
pub fn project(matrix: &ProjectionMatrix, embedding: &[f32; MODEL_DIM]) -> [f32; SLOT_DIM] {
    let mut out = [0f32; SLOT_DIM];
    for (row, out_v) in matrix.iter().zip(out.iter_mut()) {
        *out_v = row.iter().zip(embedding.iter()).map(|(a, b)| a * b).sum();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_shape_is_fixed() {
        let m = create_sparse_projection_matrix(ACTION_SEED);
        assert_eq!(m.len(), SLOT_DIM);
        assert_eq!(m[0].len(), MODEL_DIM);
    }

    #[test]
    fn zero_fraction_within_spec_bounds() {
        for seed in [ACTION_SEED, RESOURCE_SEED, DATA_SEED, RISK_SEED] {
            let m = create_sparse_projection_matrix(seed);
            let total = SLOT_DIM * MODEL_DIM;
            let zeros = m.iter().flatten().filter(|v| **v == 0.0).count();
            let frac = zeros as f32 / total as f32;
            assert!((0.60..=0.70).contains(&frac), "seed {seed} zero fraction {frac}");
        }
    }

    #[test]
    fn deterministic_given_same_seed() {
        let a = create_sparse_projection_matrix(ACTION_SEED);
        let b = create_sparse_projection_matrix(ACTION_SEED);
        assert_eq!(a, b);
    }

    #[test]
    fn different_slots_get_different_matrices() {
        let action = create_sparse_projection_matrix(ACTION_SEED);
        let resource = create_sparse_projection_matrix(RESOURCE_SEED);
        assert_ne!(action, resource);
    }

    /// With n = SLOT_DIM * MODEL_DIM = 12,288 independent draws at a
    /// true zero-probability of 2/3, the empirical fraction for any
    /// seed sits within a few thousandths of 0.667 — nowhere near the
    /// [0.60, 0.70] edges this asserts.
    #[quickcheck_macros::quickcheck]
    fn zero_fraction_within_bounds_for_arbitrary_seed(seed: u64) -> bool {
        let m = create_sparse_projection_matrix(seed);
        let total = SLOT_DIM * MODEL_DIM;
        let zeros = m.iter().flatten().filter(|v| **v == 0.0).count();
        let frac = zeros as f32 / total as f32;
        (0.60..=0.70).contains(&frac)
    }

    #[quickcheck_macros::quickcheck]
    fn matrix_shape_is_fixed_for_arbitrary_seed(seed: u64) -> bool {
        let m = create_sparse_projection_matrix(seed);
        m.len() == SLOT_DIM && m.iter().all(|row| row.len() == MODEL_DIM)
    }
}
