//! 遅延乗算による Collatz 総ステップ数探索
//!
//! 数百万ワードの巨大整数に対して 3n+1 / n/2 を数十億回適用する。
//! 3n+1 を毎回数全体に適用する代わりに、カーソルより上のワード列への
//! アフィン変換 y = c·x + k として溜め込み、64bit を溢れそうなときだけ
//! 一括で実体化する。÷2 はビットカーソルを進めるだけで済ませる。

pub mod actualize;
pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod lazy;
pub mod reference;
pub mod verify;
pub mod window;

pub use analysis::Classification;
pub use config::{EngineConfig, RatioLimit};
pub use engine::{Progress, RunResult, StepCounters, StepEngine, StepState};
pub use error::{EngineError, Result};
pub use lazy::{LazyTransform, MAX_CARRY, MAX_MULTIPLIER};
pub use verify::{verify_range, verify_range_parallel, verify_range_parallel_cancellable, VerifyResult};
pub use window::WordWindow;
