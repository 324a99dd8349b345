//! ワード窓による巨大整数の表現。
//!
//! バッキングバッファ上の連続区間 `[low, high)` が数の生きている部分で、
//! `low` ワードの `mask` ビットが現在の LSB。mask 未満のビットは処理済みの履歴で
//! 常に 0 になっている。÷2 はカーソルを1ビット進めるだけで、数を実際にシフトしない。
//!
//! `high` が上端に近づいたら生きている区間をバッファ先頭へ移す（ウィンドウシフト）。

use log::{debug, error};
use num_bigint::BigUint;

use crate::config::{EngineConfig, SHIFT_MARGIN};
use crate::error::{EngineError, Result};
use crate::lazy::LazyTransform;

#[derive(Debug, Clone)]
pub struct WordWindow {
    words: Vec<u64>,
    /// カーソルのワード位置
    low: usize,
    /// カーソルのビットマスク（1ビットだけ立つ）
    mask: u64,
    /// 最上位の生きているワードの1つ上
    high: usize,
    /// 有効ビット数。厳密値か上界（engine 参照）
    bitsize: u64,
    working_words: usize,
}

impl WordWindow {
    /// 0 埋めのバッファを確保する。確保できなければ AllocationError。
    /// 総ワード数が usize を溢れる設定も確保できないものとして扱う。
    fn allocate(config: &EngineConfig) -> Result<Vec<u64>> {
        let total = config
            .buffer_words()
            .ok_or(EngineError::Allocation { words: config.working_words })?;
        let mut words: Vec<u64> = Vec::new();
        words
            .try_reserve_exact(total)
            .map_err(|_| EngineError::Allocation { words: total })?;
        words.resize(total, 0);
        Ok(words)
    }

    fn check_capacity(needed_words: usize, config: &EngineConfig) -> Result<()> {
        if needed_words > config.working_words {
            return Err(EngineError::Capacity {
                needed_words,
                available_words: config.working_words,
            });
        }
        Ok(())
    }

    /// ASCII の '0'/'1' 列（MSB first）から構築する。
    /// 末尾の改行 1つ（"\n" または "\r\n"）は許す。先頭の 0 は読み飛ばす。
    pub fn from_bits(bits: &[u8], config: &EngineConfig) -> Result<Self> {
        let body = bits
            .strip_suffix(b"\n")
            .map(|b| b.strip_suffix(b"\r").unwrap_or(b))
            .unwrap_or(bits);

        if let Some(position) = body.iter().position(|&c| c != b'0' && c != b'1') {
            return Err(EngineError::Format {
                position,
                found: body[position] as char,
            });
        }

        let first_one = body.iter().position(|&c| c == b'1').ok_or(EngineError::Zero)?;
        let digits = &body[first_one..];
        let needed_words = digits.len().div_ceil(64);
        Self::check_capacity(needed_words, config)?;

        let mut words = Self::allocate(config)?;
        // 末尾（LSB側）から 64 文字ずつワードへ
        for (i, chunk) in digits.rchunks(64).enumerate() {
            words[i] = chunk
                .iter()
                .fold(0u64, |acc, &c| (acc << 1) | (c - b'0') as u64);
        }

        Ok(WordWindow {
            words,
            low: 0,
            mask: 1,
            high: needed_words,
            bitsize: digits.len() as u64,
            working_words: config.working_words,
        })
    }

    /// 全ビット 1 の width ビット数を作る
    pub fn all_ones(width: u64, config: &EngineConfig) -> Result<Self> {
        if width == 0 {
            return Err(EngineError::Zero);
        }
        let needed_words = width.div_ceil(64) as usize;
        Self::check_capacity(needed_words, config)?;

        let mut words = Self::allocate(config)?;
        words[..needed_words].fill(u64::MAX);
        let extra = width % 64;
        if extra != 0 {
            words[needed_words - 1] = (1u64 << extra) - 1;
        }

        Ok(WordWindow {
            words,
            low: 0,
            mask: 1,
            high: needed_words,
            bitsize: width,
            working_words: config.working_words,
        })
    }

    /// 作業ワード全体を埋める全ビット 1 の数
    pub fn all_ones_spanning(config: &EngineConfig) -> Result<Self> {
        let width = config
            .working_bits()
            .ok_or(EngineError::Allocation { words: config.working_words })?;
        Self::all_ones(width, config)
    }

    pub fn from_biguint(n: &BigUint, config: &EngineConfig) -> Result<Self> {
        let digits = n.to_u64_digits();
        if digits.is_empty() {
            return Err(EngineError::Zero);
        }
        Self::check_capacity(digits.len(), config)?;

        let mut words = Self::allocate(config)?;
        words[..digits.len()].copy_from_slice(&digits);
        Ok(WordWindow {
            words,
            low: 0,
            mask: 1,
            high: digits.len(),
            bitsize: n.bits(),
            working_words: config.working_words,
        })
    }

    pub fn from_u64(n: u64, config: &EngineConfig) -> Result<Self> {
        Self::from_biguint(&BigUint::from(n), config)
    }

    #[inline]
    pub fn test_lsb(&self) -> bool {
        self.words[self.low] & self.mask != 0
    }

    /// カーソルを1ビット上へ進める（÷2）。
    /// mask が 63 ビット目を越えて次のワードへ移ったら true を返す。
    /// その場合、呼び出し側は新しいワードに保留中の変換を1回だけ適用しなければならない。
    #[inline]
    pub fn advance_lsb(&mut self) -> bool {
        if self.mask == 1 << 63 {
            debug_assert!(self.low + 1 < self.high);
            self.low += 1;
            self.mask = 1;
            true
        } else {
            self.mask <<= 1;
            false
        }
    }

    /// カーソルのワードが最上位ワードか
    #[inline]
    pub fn cursor_in_top_word(&self) -> bool {
        self.low + 1 == self.high
    }

    /// カーソルが最上位ワードにあるときの O(1) 厳密ビット長。
    /// 保留中の carry が 0 であること。
    #[inline]
    pub fn recompute_bitsize_at_boundary(&mut self) {
        debug_assert!(self.cursor_in_top_word());
        let top = self.words[self.low];
        self.bitsize = (64 - top.leading_zeros() - self.mask.trailing_zeros()) as u64;
    }

    /// 上位ワードが確定しているときの厳密ビット長（実体化直後）
    pub(crate) fn recompute_bitsize(&mut self) {
        let top = self.words[self.high - 1];
        debug_assert!(top != 0);
        let span = (self.high - self.low - 1) as u64 * 64;
        self.bitsize = span + (64 - top.leading_zeros()) as u64 - self.mask.trailing_zeros() as u64;
    }

    pub fn bitsize(&self) -> u64 {
        self.bitsize
    }

    pub(crate) fn set_bitsize(&mut self, bitsize: u64) {
        self.bitsize = bitsize;
    }

    pub fn low(&self) -> usize {
        self.low
    }

    pub fn high(&self) -> usize {
        self.high
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }

    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    pub fn working_words(&self) -> usize {
        self.working_words
    }

    /// 生きているワード列 `[low, high)`（上位は変換未適用のまま）
    pub fn live_words(&self) -> &[u64] {
        &self.words[self.low..self.high]
    }

    #[inline]
    pub(crate) fn cursor_word_mut(&mut self) -> (&mut u64, u64) {
        (&mut self.words[self.low], self.mask)
    }

    /// カーソルより上のワード列（実体化の対象）
    #[inline]
    pub(crate) fn upper_words_mut(&mut self) -> &mut [u64] {
        &mut self.words[self.low + 1..self.high]
    }

    /// 最終繰り上がりを新しい最上位ワードとして追加する
    pub(crate) fn push_top_word(&mut self, word: u64) {
        assert!(self.high < self.words.len(), "ウィンドウがバッファ上端を越えた");
        self.words[self.high] = word;
        self.high += 1;
    }

    /// 上端の余白が SHIFT_MARGIN を切っているか
    #[inline]
    pub(crate) fn near_end(&self) -> bool {
        self.high + SHIFT_MARGIN > self.words.len()
    }

    /// 生きている区間をバッファ先頭へ移す。ビットパターンと mask は変わらない。
    pub fn shift_to_front(&mut self) {
        if self.low == 0 {
            return;
        }
        let len = self.high - self.low;
        self.words.copy_within(self.low..self.high, 0);
        debug!("ウィンドウシフト: {} ワード前へ ({} ワード生存)", self.low, len);
        self.low = 0;
        self.high = len;
    }

    /// 上端の余白を確保する。シフトで足りなければバッファを倍に伸ばす。
    pub(crate) fn ensure_headroom(&mut self) {
        if !self.near_end() {
            return;
        }
        self.shift_to_front();
        if self.near_end() {
            let new_len = self.words.len().saturating_mul(2).max(self.high + SHIFT_MARGIN);
            if let Err(e) = self.grow_to(new_len) {
                // ステップループは失敗を返せないので、ここで打ち切る
                error!("{}", e);
                panic!("{}", e);
            }
        }
    }

    /// バッファを new_len ワードへ広げる。確保できなければ AllocationError で、バッファは元のまま
    pub(crate) fn grow_to(&mut self, new_len: usize) -> Result<()> {
        let len = self.words.len();
        if new_len <= len {
            return Ok(());
        }
        debug!("バッファ拡張: {} → {} ワード", len, new_len);
        self.words
            .try_reserve_exact(new_len - len)
            .map_err(|_| EngineError::Allocation { words: new_len })?;
        self.words.resize(new_len, 0);
        Ok(())
    }

    /// 保留中の変換を反映した論理値を返す（コピー上で計算）
    pub fn materialize(&self, transform: &LazyTransform) -> BigUint {
        let mut words = self.live_words().to_vec();
        let mut t = *transform;
        for w in words.iter_mut().skip(1) {
            t.apply_to_word(w);
        }
        if t.carry() != 0 {
            words.push(t.carry());
        }
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        BigUint::from_bytes_le(&bytes) >> self.mask.trailing_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EngineConfig {
        EngineConfig::small()
    }

    #[test]
    fn test_from_bits_small() {
        let w = WordWindow::from_bits(b"11011\n", &cfg()).unwrap();
        assert_eq!(w.live_words(), &[27]);
        assert_eq!(w.bitsize(), 5);
        assert!(w.test_lsb());
    }

    #[test]
    fn test_from_bits_crlf_and_leading_zeros() {
        let w = WordWindow::from_bits(b"000110\r\n", &cfg()).unwrap();
        assert_eq!(w.live_words(), &[6]);
        assert_eq!(w.bitsize(), 3);
    }

    #[test]
    fn test_from_bits_two_words() {
        // 2^64 + 1
        let mut s = String::from("1");
        s.push_str(&"0".repeat(63));
        s.push('1');
        let w = WordWindow::from_bits(s.as_bytes(), &cfg()).unwrap();
        assert_eq!(w.live_words(), &[1, 1]);
        assert_eq!(w.bitsize(), 65);
    }

    #[test]
    fn test_from_bits_format_error() {
        let err = WordWindow::from_bits(b"10x1", &cfg()).unwrap_err();
        assert!(matches!(err, EngineError::Format { position: 2, found: 'x' }));
    }

    #[test]
    fn test_from_bits_zero() {
        assert!(matches!(WordWindow::from_bits(b"000\n", &cfg()), Err(EngineError::Zero)));
        assert!(matches!(WordWindow::from_bits(b"", &cfg()), Err(EngineError::Zero)));
    }

    #[test]
    fn test_from_bits_capacity_error() {
        let s = "1".repeat(4 * 64 + 1);
        let err = WordWindow::from_bits(s.as_bytes(), &cfg()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Capacity { needed_words: 5, available_words: 4 }
        ));
    }

    #[test]
    fn test_all_ones() {
        let w = WordWindow::all_ones(70, &cfg()).unwrap();
        assert_eq!(w.live_words(), &[u64::MAX, 0x3F]);
        assert_eq!(w.bitsize(), 70);

        let full = WordWindow::all_ones(256, &cfg()).unwrap();
        assert_eq!(full.live_words(), &[u64::MAX; 4]);
        assert!(WordWindow::all_ones(257, &cfg()).is_err());
    }

    #[test]
    fn test_allocation_error_for_huge_buffer() {
        let config = EngineConfig::small().with_working_words(usize::MAX / 16);
        let err = WordWindow::from_u64(27, &config).unwrap_err();
        assert!(matches!(err, EngineError::Allocation { .. }));
    }

    #[test]
    fn test_overflowing_buffer_size_is_an_error() {
        let config = EngineConfig::small().with_working_words(usize::MAX);
        assert!(matches!(
            WordWindow::all_ones_spanning(&config),
            Err(EngineError::Allocation { .. })
        ));
        assert!(matches!(
            WordWindow::all_ones(u64::MAX, &config),
            Err(EngineError::Allocation { .. })
        ));
        assert!(matches!(
            WordWindow::from_u64(27, &config),
            Err(EngineError::Allocation { .. })
        ));
    }

    #[test]
    fn test_all_ones_spanning() {
        let w = WordWindow::all_ones_spanning(&cfg()).unwrap();
        assert_eq!(w.live_words(), &[u64::MAX; 4]);
        assert_eq!(w.bitsize(), 256);
    }

    #[test]
    fn test_advance_wraps_at_bit_63() {
        let mut w = WordWindow::from_biguint(&(BigUint::from(1u8) << 64u32), &cfg()).unwrap();
        for _ in 0..63 {
            assert!(!w.advance_lsb());
        }
        assert_eq!(w.mask(), 1 << 63);
        assert!(w.advance_lsb());
        assert_eq!(w.low(), 1);
        assert_eq!(w.mask(), 1);
        assert!(w.test_lsb());
    }

    #[test]
    fn test_shift_preserves_value() {
        let n = (BigUint::from(0xDEADu32) << 130u32) + BigUint::from(1u8);
        let mut w = WordWindow::from_biguint(&n, &cfg()).unwrap();
        // カーソルを 1 ワード目の途中まで進める（下位ビットを 0 にしておく）
        w.words[0] = 0;
        for _ in 0..70 {
            w.advance_lsb();
        }
        let before = w.materialize(&LazyTransform::identity());
        let mask = w.mask();
        w.shift_to_front();
        assert_eq!(w.low(), 0);
        assert_eq!(w.mask(), mask);
        assert_eq!(w.materialize(&LazyTransform::identity()), before);
    }

    #[test]
    fn test_grow_to_failure_keeps_buffer() {
        let mut w = WordWindow::from_u64(27, &cfg()).unwrap();
        let before = w.capacity();
        let err = w.grow_to(usize::MAX / 16).unwrap_err();
        assert!(matches!(err, EngineError::Allocation { words } if words == usize::MAX / 16));
        assert_eq!(w.capacity(), before);
        assert_eq!(w.materialize(&LazyTransform::identity()), BigUint::from(27u32));

        w.grow_to(before + 10).unwrap();
        assert_eq!(w.capacity(), before + 10);
    }

    #[test]
    fn test_ensure_headroom_grows() {
        let mut w = WordWindow::all_ones(4 * 64, &EngineConfig::small().with_high_padding(2)).unwrap();
        assert_eq!(w.capacity(), 6);
        w.push_top_word(1);
        w.ensure_headroom();
        assert!(w.capacity() >= w.high() + SHIFT_MARGIN);
        assert_eq!(w.high(), 5);
    }
}
