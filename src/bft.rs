//! Byzantine fault tolerance round simulator used to test the quorum math
//! underlying consensus (spec §8, §9). Grounded on
//! `gillean::consensus::ProofOfStake`'s validator-set shape, generalised to
//! a deterministic, seeded round simulation rather than live staking.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Byzantine quorum size tolerating `f` faults out of a `3f + 1`-or-larger
/// membership: `2f + 1` (spec §8).
fn quorum(f: u32) -> u32 {
    2 * f + 1
}

/// Run `rounds` independent quorum votes over `n` nodes of which up to `f`
/// are faulty (each fails to vote honestly with probability `fail_prob`),
/// returning `1` if every round reached quorum, `0` otherwise (spec §8:
/// `SimulateBFT(n, f, rounds) == 1` for `n >= 3f + 1`).
///
/// `n < 3f + 1` makes the quorum unreachable by construction once `f` nodes
/// are faulty, regardless of `fail_prob` — spec §8's
/// `SimulateBFTWith(n=3, f=1, rounds=100, fail_prob=0.0) == 0` scenario.
pub fn simulate_bft(n: u32, f: u32, rounds: u32) -> u8 {
    simulate_bft_with(n, f, rounds, 0.0, 0)
}

/// Seeded variant of [`simulate_bft`] taking an explicit `fail_prob` and RNG
/// seed, so results are reproducible in tests (spec §9 open-question
/// resolution: the crypto-seeded variant, not thread-local entropy).
pub fn simulate_bft_with(n: u32, f: u32, rounds: u32, fail_prob: f64, seed: u64) -> u8 {
    if n < 3 * f + 1 {
        return 0;
    }
    let required = quorum(f);
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..rounds {
        let mut honest_votes = 0u32;
        for node in 0..n {
            let is_faulty = node < f;
            let dropped = is_faulty && rng.gen_bool(fail_prob.clamp(0.0, 1.0));
            if !dropped {
                honest_votes += 1;
            }
        }
        if honest_votes < required {
            return 0;
        }
    }
    1
}
