//! 素朴な多倍長 Collatz 写像（検証用の参照実装）。
//!
//! 毎ステップ数全体に 3n+1 または n/2 を適用する。遅すぎて本番では使えないが、
//! エンジンのステップ数と ÷2/×3 の内訳を突き合わせる基準になる。

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::engine::StepCounters;

/// 参照実装の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceResult {
    pub counters: StepCounters,
    /// 軌道上の最大値
    pub max_value: BigUint,
}

/// n から 1 まで BigUint で素直に回す。n = 0 は 0 ステップで返す。
pub fn trajectory(n: &BigUint) -> ReferenceResult {
    let mut counters = StepCounters::default();
    let mut max_value = n.clone();
    if n.is_zero() {
        return ReferenceResult { counters, max_value };
    }

    let mut current = n.clone();
    while !current.is_one() {
        if current.bit(0) {
            current = current * 3u32 + 1u32;
            counters.mul_steps += 1;
            if current > max_value {
                max_value = current.clone();
            }
        } else {
            current >>= 1u32;
            counters.div_steps += 1;
        }
        counters.steps += 1;
    }

    ReferenceResult { counters, max_value }
}

/// u64 入力の高速版。u128 で回し、溢れそうなら BigUint 版へ切り替える。
pub fn trajectory_u64(n: u64) -> ReferenceResult {
    let overflow_limit = (u128::MAX - 1) / 3;
    let mut counters = StepCounters::default();
    let mut current = n as u128;
    let mut max_value = current;

    if n == 0 {
        return ReferenceResult { counters, max_value: BigUint::zero() };
    }

    while current != 1 {
        if current & 1 == 1 {
            if current > overflow_limit {
                let rest = trajectory(&BigUint::from(current));
                counters.steps += rest.counters.steps;
                counters.div_steps += rest.counters.div_steps;
                counters.mul_steps += rest.counters.mul_steps;
                return ReferenceResult {
                    counters,
                    max_value: rest.max_value.max(BigUint::from(max_value)),
                };
            }
            current = current * 3 + 1;
            counters.mul_steps += 1;
            max_value = max_value.max(current);
        } else {
            current >>= 1;
            counters.div_steps += 1;
        }
        counters.steps += 1;
    }

    ReferenceResult { counters, max_value: BigUint::from(max_value) }
}
