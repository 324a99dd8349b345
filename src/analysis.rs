//! 最終カウンタに対する事後判定。
//!
//! 探索の目的は「ステップ数が多く、しかも ÷2 が全体の 99% 以下」の数。
//! 2 を掛ければ ÷2 ステップはいくらでも水増しできるので、比率で足切りする。
//! ステップループ自体はこの条件を一切見ない。

use crate::config::RatioLimit;
use crate::engine::StepCounters;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub counters: StepCounters,
    pub halving_ratio: f64,
    /// ÷2 比率が上限以下
    pub nontrivial: bool,
}

impl StepCounters {
    /// ÷2 ステップの割合。0 ステップなら 0
    pub fn halving_ratio(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.div_steps as f64 / self.steps as f64
        }
    }

    /// ÷2 の割合が limit 以下か（整数で厳密に判定）
    pub fn is_nontrivial(&self, limit: RatioLimit) -> bool {
        limit.admits(self.div_steps, self.steps)
    }

    pub fn classify(&self, limit: RatioLimit) -> Classification {
        Classification {
            counters: *self,
            halving_ratio: self.halving_ratio(),
            nontrivial: self.is_nontrivial(limit),
        }
    }
}
