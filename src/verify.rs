use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::config::EngineConfig;
use crate::engine::{StepCounters, StepEngine};
use crate::error::Result;
use crate::reference;

/// エンジンと参照実装の食い違い
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub n: u64,
    pub engine: StepCounters,
    pub reference: StepCounters,
}

/// 範囲検証の結果
#[derive(Debug, Clone, Default)]
pub struct VerifyResult {
    /// 検証した数の総数
    pub total_checked: u64,
    /// 全て一致したか
    pub all_matched: bool,
    /// 最大ステップ数
    pub max_steps: u64,
    /// 最大ステップ数を持つ数
    pub max_steps_number: u64,
    pub mismatches: Vec<Mismatch>,
}

/// 1つの n をエンジンと参照実装の両方で回す
pub fn check_one(n: u64, config: &EngineConfig) -> Result<(StepCounters, Option<Mismatch>)> {
    let engine = StepEngine::from_u64(n, config)?.run();
    let expected = reference::trajectory_u64(n).counters;
    let mismatch = (engine != expected).then_some(Mismatch { n, engine, reference: expected });
    Ok((engine, mismatch))
}

/// [start, end] の全整数を検証する（シングルスレッド版）。
/// progress_callback: (完了数, 総数) を定期的に呼ぶ。
pub fn verify_range(
    start: u64,
    end: u64,
    config: &EngineConfig,
    progress_callback: impl Fn(u64, u64),
) -> Result<VerifyResult> {
    let start = start.max(1);
    if start > end {
        return Ok(empty_result());
    }
    let total = end - start + 1;

    let mut result = empty_result();
    result.max_steps_number = start;
    for n in start..=end {
        let (counters, mismatch) = check_one(n, config)?;
        if counters.steps > result.max_steps {
            result.max_steps = counters.steps;
            result.max_steps_number = n;
        }
        result.mismatches.extend(mismatch);
        result.total_checked += 1;

        if result.total_checked % 1000 == 0 {
            progress_callback(result.total_checked, total);
        }
    }
    progress_callback(result.total_checked, total);

    result.all_matched = result.mismatches.is_empty();
    Ok(result)
}

/// [start, end] の全整数を並列検証する。
/// Rayon でチャンク分割して並列処理。
pub fn verify_range_parallel(
    start: u64,
    end: u64,
    config: &EngineConfig,
    progress_callback: impl Fn(u64, u64) + Sync,
) -> Result<VerifyResult> {
    let never = AtomicBool::new(false);
    verify_range_parallel_cancellable(start, end, config, &never, progress_callback)
}

/// キャンセル可能な並列検証。cancel が true になると途中結果を返す。
pub fn verify_range_parallel_cancellable(
    start: u64,
    end: u64,
    config: &EngineConfig,
    cancel: &AtomicBool,
    progress_callback: impl Fn(u64, u64) + Sync,
) -> Result<VerifyResult> {
    let start = start.max(1);
    if start > end {
        return Ok(empty_result());
    }

    let total = end - start + 1;
    // チャンク分割: 各チャンク10000個
    let chunk_size: u64 = 10000;
    let num_chunks = total.div_ceil(chunk_size);

    let global_done = AtomicU64::new(0);
    let global_max = Mutex::new((0u64, start));
    let global_mismatches: Mutex<Vec<Mismatch>> = Mutex::new(Vec::new());

    (0..num_chunks).into_par_iter().try_for_each(|chunk_idx| -> Result<()> {
        if cancel.load(Ordering::Relaxed) {
            return Ok(());
        }
        let chunk_start = start + chunk_idx * chunk_size;
        let chunk_end = std::cmp::min(chunk_start + (chunk_size - 1), end);

        let mut local_max = (0u64, chunk_start);
        let mut local_mismatches = Vec::new();
        let mut unreported = 0u64;

        for n in chunk_start..=chunk_end {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let (counters, mismatch) = check_one(n, config)?;
            if counters.steps > local_max.0 {
                local_max = (counters.steps, n);
            }
            local_mismatches.extend(mismatch);
            unreported += 1;

            // チャンク内でも定期的に進捗報告
            if unreported >= 1000 {
                let done = global_done.fetch_add(unreported, Ordering::Relaxed) + unreported;
                progress_callback(done, total);
                unreported = 0;
            }
        }

        if unreported > 0 {
            let done = global_done.fetch_add(unreported, Ordering::Relaxed) + unreported;
            progress_callback(done, total);
        }

        {
            let mut guard = global_max.lock().unwrap_or_else(|e| e.into_inner());
            // 同じステップ数なら小さい n を残す
            if local_max.0 > guard.0 || (local_max.0 == guard.0 && local_max.1 < guard.1) {
                *guard = local_max;
            }
        }
        if !local_mismatches.is_empty() {
            global_mismatches
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .extend(local_mismatches);
        }
        Ok(())
    })?;

    let (max_steps, max_steps_number) = global_max.into_inner().unwrap_or_else(|e| e.into_inner());
    let mut mismatches = global_mismatches.into_inner().unwrap_or_else(|e| e.into_inner());
    mismatches.sort_by_key(|m| m.n);

    Ok(VerifyResult {
        total_checked: global_done.load(Ordering::Relaxed),
        all_matched: mismatches.is_empty(),
        max_steps,
        max_steps_number,
        mismatches,
    })
}

fn empty_result() -> VerifyResult {
    VerifyResult {
        all_matched: true,
        ..VerifyResult::default()
    }
}
