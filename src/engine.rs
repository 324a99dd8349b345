//! ステップエンジン: 偶奇判定、遅延乗算、実体化、ビット長管理を1ステップずつ回す。
//!
//! 状態遷移（1回の `step()` が Collatz 写像の1ステップに対応）:
//!   Even        — LSB が 0。カーソルを進める。ワード境界を越えたら新ワードにだけ変換を適用
//!   OddLazy     — LSB が 1。変換に 3x+1 を合成
//!   Actualizing — LSB が 1 だが合成すると 64bit を溢れる。実体化してから OddLazy と同じ処理
//!   Done        — 値が 1
//!
//! ビット長 `bitsize` は厳密値の上界として管理する（偶数 -1、奇数 +2）。
//! 変換が恒等のとき、またはカーソルが最上位ワードにあるときは厳密値に一致する。
//! 上界なので `bitsize == 1` なら値は必ず 1。

use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use num_bigint::BigUint;

use crate::actualize::actualize;
use crate::config::{EngineConfig, DEFAULT_PROGRESS_INTERVAL};
use crate::error::Result;
use crate::lazy::LazyTransform;
use crate::window::WordWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Even,
    OddLazy,
    Actualizing,
    Done,
}

/// ステップ数の累計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCounters {
    /// 総ステップ数
    pub steps: u64,
    /// ÷2 ステップ数
    pub div_steps: u64,
    /// 3x+1 ステップ数
    pub mul_steps: u64,
}

/// 進捗報告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub steps: u64,
    pub bitsize: u64,
    pub div_steps: u64,
    pub mul_steps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub counters: StepCounters,
    /// 値 1 に到達したか（false ならキャンセルされた）
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct StepEngine {
    window: WordWindow,
    transform: LazyTransform,
    counters: StepCounters,
    actualizations: u64,
    progress_interval: u64,
}

impl StepEngine {
    /// 構築済みのウィンドウから始める。バッファの大きさはウィンドウが持つので、
    /// エンジン側の設定は進捗間隔だけ（既定値、`with_progress_interval` で変更）
    pub fn new(window: WordWindow) -> Self {
        StepEngine {
            window,
            transform: LazyTransform::identity(),
            counters: StepCounters::default(),
            actualizations: 0,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// 進捗コールバックの間隔。0 は 1 に丸める
    pub fn with_progress_interval(mut self, steps: u64) -> Self {
        self.progress_interval = steps.max(1);
        self
    }

    pub fn progress_interval(&self) -> u64 {
        self.progress_interval
    }

    fn configured(window: WordWindow, config: &EngineConfig) -> Self {
        Self::new(window).with_progress_interval(config.progress_interval)
    }

    pub fn from_bit_str(bits: &[u8], config: &EngineConfig) -> Result<Self> {
        Ok(Self::configured(WordWindow::from_bits(bits, config)?, config))
    }

    /// 全ビット 1 の width ビット数から始める
    pub fn all_ones(width: u64, config: &EngineConfig) -> Result<Self> {
        Ok(Self::configured(WordWindow::all_ones(width, config)?, config))
    }

    /// 作業ワード全体を埋める全ビット 1 の数から始める（引数なし起動時の試験数）
    pub fn all_ones_spanning(config: &EngineConfig) -> Result<Self> {
        Ok(Self::configured(WordWindow::all_ones_spanning(config)?, config))
    }

    pub fn from_u64(n: u64, config: &EngineConfig) -> Result<Self> {
        Ok(Self::configured(WordWindow::from_u64(n, config)?, config))
    }

    pub fn from_biguint(n: &BigUint, config: &EngineConfig) -> Result<Self> {
        Ok(Self::configured(WordWindow::from_biguint(n, config)?, config))
    }

    pub fn counters(&self) -> StepCounters {
        self.counters
    }

    pub fn bitsize(&self) -> u64 {
        self.window.bitsize()
    }

    pub fn window(&self) -> &WordWindow {
        &self.window
    }

    pub fn transform(&self) -> &LazyTransform {
        &self.transform
    }

    /// 実体化の回数
    pub fn actualizations(&self) -> u64 {
        self.actualizations
    }

    pub fn is_done(&self) -> bool {
        self.window.bitsize() == 1
    }

    /// 現在の論理値（保留中の変換はコピー上で適用）
    pub fn value(&self) -> BigUint {
        self.window.materialize(&self.transform)
    }

    /// 現在の値の2進文字列（MSB first）
    pub fn to_bit_string(&self) -> String {
        self.value().to_str_radix(2)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            steps: self.counters.steps,
            bitsize: self.window.bitsize(),
            div_steps: self.counters.div_steps,
            mul_steps: self.counters.mul_steps,
        }
    }

    fn actualize(&mut self) {
        actualize(&mut self.window, &mut self.transform);
        self.actualizations += 1;
    }

    /// Collatz 写像を1ステップ進める
    pub fn step(&mut self) -> StepState {
        if self.is_done() {
            return StepState::Done;
        }

        let state = if !self.window.test_lsb() {
            if self.window.advance_lsb() {
                // 露出したワードはまだ遅延乗算を受けていない
                let (word, _) = self.window.cursor_word_mut();
                self.transform.apply_to_word(word);
            }
            self.counters.div_steps += 1;
            self.window.set_bitsize(self.window.bitsize() - 1);
            StepState::Even
        } else {
            let state = if self.transform.can_defer() {
                StepState::OddLazy
            } else {
                self.actualize();
                StepState::Actualizing
            };
            let (word, mask) = self.window.cursor_word_mut();
            self.transform.absorb_odd_step(word, mask);
            self.counters.mul_steps += 1;
            self.window.set_bitsize(self.window.bitsize() + 2);
            state
        };
        self.counters.steps += 1;

        if self.window.cursor_in_top_word() {
            // 最上位ワードに carry が残っていたら、新しいワードへ逃がしてから数える
            if self.transform.carry() != 0 {
                self.actualize();
            } else {
                self.window.recompute_bitsize_at_boundary();
            }
        }

        state
    }

    /// 1 に到達するまで回す
    pub fn run(&mut self) -> StepCounters {
        while self.step() != StepState::Done {}
        self.counters
    }

    /// progress_interval ステップごとに callback を呼びながら回す
    pub fn run_with_callback(&mut self, mut callback: impl FnMut(&Progress)) -> StepCounters {
        let never = AtomicBool::new(false);
        self.run_cancellable(&never, &mut callback).counters
    }

    /// キャンセル可能な実行。cancel は進捗報告と同じ間隔で確認する。
    /// キャンセルされても不変条件は保たれており、続きから再開できる。
    pub fn run_cancellable(&mut self, cancel: &AtomicBool, mut callback: impl FnMut(&Progress)) -> RunResult {
        let mut next_report = self.counters.steps + self.progress_interval;
        loop {
            if self.step() == StepState::Done {
                return RunResult { counters: self.counters, completed: true };
            }
            if self.counters.steps >= next_report {
                next_report = self.counters.steps + self.progress_interval;
                callback(&self.progress());
                if cancel.load(Ordering::Relaxed) {
                    warn!("キャンセルされました (step {})", self.counters.steps);
                    return RunResult { counters: self.counters, completed: false };
                }
            }
        }
    }
}
