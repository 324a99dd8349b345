use collatz_lazy::*;
use num_bigint::BigUint;
use num_traits::One;

/// 大数の全軌道を参照実装と比較するヘルパー
fn verify_large(n: &BigUint, config: &EngineConfig) -> StepEngine {
    let mut engine = StepEngine::from_biguint(n, config).unwrap();
    let counters = engine.run();
    let expected = reference::trajectory(n).counters;
    assert_eq!(counters, expected, "counters mismatch for {}-bit n", n.bits());
    assert_eq!(engine.value(), BigUint::one());
    engine
}

/// 2^100 - 1 (約30桁) の全軌道
#[test]
fn test_2pow100_minus1() {
    let n = (BigUint::one() << 100u32) - BigUint::one();
    verify_large(&n, &EngineConfig::small());
}

/// 2^1000 - 1 (約301桁): 実体化が何度も起きる
#[test]
fn test_2pow1000_minus1() {
    let n = (BigUint::one() << 1000u32) - BigUint::one();
    let config = EngineConfig::small().with_working_words(16).with_high_padding(16);
    let engine = verify_large(&n, &config);
    assert!(engine.actualizations() > 10);
}

/// 全ビット 1 の数（引数なし起動時の試験数）
#[test]
fn test_all_ones_matches_mersenne() {
    let config = EngineConfig::small().with_working_words(8);
    let mut engine = StepEngine::all_ones(8 * 64, &config).unwrap();
    let n = (BigUint::one() << 512u32) - BigUint::one();
    assert_eq!(engine.value(), n);
    let counters = engine.run();
    assert_eq!(counters, reference::trajectory(&n).counters);
}

/// パディングを最小にしてウィンドウシフトを頻発させる
#[test]
fn test_frequent_window_shifts() {
    let n = (BigUint::one() << 640u32) - BigUint::from(977u32);
    let config = EngineConfig::small().with_working_words(10).with_high_padding(2);
    let engine = verify_large(&n, &config);
    // 軌道の最大値は 640 ビットを超えるので、バッファはシフトか拡張で対応している
    assert!(engine.window().capacity() >= 12);
}

/// 作業ワードぴったりの数からバッファ拡張が必要になる場合
#[test]
fn test_buffer_growth_from_exact_fit() {
    let n = (BigUint::one() << 256u32) - BigUint::one();
    let config = EngineConfig::small().with_working_words(4).with_high_padding(0);
    let engine = verify_large(&n, &config);
    assert!(engine.window().capacity() > 6);
}

/// 1ステップごとの値を算術計算と比較（多数の実体化とシフトを跨ぐ）
#[test]
fn test_stepwise_values_with_tiny_buffer() {
    let start = (BigUint::one() << 300u32) + BigUint::from(0x1234_5678_9ABC_DEFFu64);
    let config = EngineConfig::small().with_working_words(5).with_high_padding(2);
    let mut engine = StepEngine::from_biguint(&start, &config).unwrap();
    let mut expected = start;
    let mut step = 0u64;
    while engine.step() != StepState::Done {
        expected = if expected.bit(0) { expected * 3u32 + 1u32 } else { expected >> 1u32 };
        step += 1;
        if step % 7 == 0 {
            assert_eq!(engine.value(), expected, "value mismatch at step {}", step);
        }
        assert!(engine.bitsize() >= expected.bits(), "bitsize below actual at step {}", step);
    }
    assert_eq!(expected, BigUint::one());
}

/// 実体化直後はビット長が生ワード列から再計算できる
#[test]
fn test_bitsize_after_actualization() {
    let n = (BigUint::one() << 400u32) - BigUint::one();
    let config = EngineConfig::small().with_working_words(12);
    let mut engine = StepEngine::from_biguint(&n, &config).unwrap();
    let mut checked = 0;
    loop {
        if engine.transform().is_identity() {
            let w = engine.window();
            let words = w.live_words();
            let top = *words.last().unwrap();
            let from_raw = (words.len() as u64 - 1) * 64 + (64 - top.leading_zeros() as u64)
                - w.mask().trailing_zeros() as u64;
            assert_eq!(engine.bitsize(), from_raw);
            checked += 1;
        }
        if engine.step() == StepState::Done {
            break;
        }
    }
    assert!(checked > 0);
}
