use serde::{Deserialize, Serialize};

/// Number of float32 values in one semantic slot.
pub const SLOT_DIM: usize = 32;
/// Number of slots concatenated into one intent/anchor vector.
pub const NUM_SLOTS: usize = 4;
/// Total width of an `IntentVector` (4 slots of 32 values each).
pub const VECTOR_DIM: usize = SLOT_DIM * NUM_SLOTS;

/// The four semantic layers, in their fixed concatenation order.
pub const SLOT_ORDER: [&str; NUM_SLOTS] = ["action", "resource", "data", "risk"];

/// Fixed-dimension semantic vector for one intent event: four 32-value
/// slots concatenated in the order (action, resource, data, risk).
///
/// Each slot is independently L2-unit-norm (or exactly zero for
/// degenerate empty slot text), so slot-wise dot product equals cosine
/// similarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentVector(pub [f32; VECTOR_DIM]);

impl IntentVector {
    pub fn from_slots(action: [f32; SLOT_DIM], resource: [f32; SLOT_DIM], data: [f32; SLOT_DIM], risk: [f32; SLOT_DIM]) -> Self {
        let mut out = [0f32; VECTOR_DIM];
        out[0..32].copy_from_slice(&action);
        out[32..64].copy_from_slice(&resource);
        out[64..96].copy_from_slice(&data);
        out[96..128].copy_from_slice(&risk);
        Self(out)
    }

    pub fn slot(&self, index: usize) -> &[f32] {
        let start = index * SLOT_DIM;
        &self.0[start..start + SLOT_DIM]
    }

    pub fn action(&self) -> &[f32] {
        self.slot(0)
    }
    pub fn resource(&self) -> &[f32] {
        self.slot(1)
    }
    pub fn data(&self) -> &[f32] {
        self.slot(2)
    }
    pub fn risk(&self) -> &[f32] {
        self.slot(3)
    }

    pub fn dot(&self, other: &IntentVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| *a as f64 * *b as f64)
            .sum()
    }

    /// `max(0, 1 - dot(baseline, current))`. Per-slot unit norms make
    /// this a non-negative distance on `[0, 2]`; the floor at 0 guards
    /// against float noise around a dot product of exactly 1.
    pub fn drift(baseline: &IntentVector, current: &IntentVector) -> f64 {
        (1.0 - baseline.dot(current)).max(0.0)
    }

    /// Raw little-endian float32 bytes, the fixed wire/BLOB layout.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(VECTOR_DIM * 4);
        for v in &self.0 {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != VECTOR_DIM * 4 {
            return None;
        }
        let mut out = [0f32; VECTOR_DIM];
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            out[i] = f32::from_le_bytes(chunk.try_into().ok()?);
        }
        Some(Self(out))
    }
}

/// L2-normalize a slot vector in place; leaves an all-zero vector
/// unchanged (degenerate empty-text case — downstream similarity is
/// then correctly zero).
pub fn l2_normalize(values: &mut [f32; SLOT_DIM]) {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_le_bytes() {
        let v = IntentVector::from_slots([1.0; 32], [2.0; 32], [3.0; 32], [4.0; 32]);
        let bytes = v.to_le_bytes();
        assert_eq!(bytes.len(), VECTOR_DIM * 4);
        let back = IntentVector::from_le_bytes(&bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector_untouched() {
        let mut z = [0f32; SLOT_DIM];
        l2_normalize(&mut z);
        assert_eq!(z, [0f32; SLOT_DIM]);
    }

    #[test]
    fn l2_normalize_produces_unit_norm() {
        let mut v = [0f32; SLOT_DIM];
        v[0] = 3.0;
        v[1] = 4.0;
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn first_call_drift_against_itself_is_exactly_zero() {
        let v = random_unit_vector(7);
        assert_eq!(IntentVector::drift(&v, &v), 0.0);
    }

    /// Draws a 128-vector with each 32-value slot independently
    /// L2-normalized, deterministically from `seed` — the same shape
    /// every real `IntentVector` has.
    fn random_unit_vector(seed: u64) -> IntentVector {
        use rand::Rng;
        use rand::SeedableRng;

        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let mut slot = || {
            let mut values = [0f32; SLOT_DIM];
            for v in values.iter_mut() {
                *v = rng.gen_range(-1.0f32..1.0);
            }
            l2_normalize(&mut values);
            values
        };
        IntentVector::from_slots(slot(), slot(), slot(), slot())
    }

    #[quickcheck_macros::quickcheck]
    fn drift_is_never_negative_for_arbitrary_unit_norm_vectors(seed_a: u64, seed_b: u64) -> bool {
        let a = random_unit_vector(seed_a);
        let b = random_unit_vector(seed_b);
        IntentVector::drift(&a, &b) >= 0.0
    }

    #[quickcheck_macros::quickcheck]
    fn drift_against_self_is_always_zero(seed: u64) -> bool {
        let v = random_unit_vector(seed);
        IntentVector::drift(&v, &v) == 0.0
    }
}
