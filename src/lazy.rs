//! 遅延乗算（3x+1 の繰り延べ）。
//!
//! 奇数ステップのたびに数全体へ 3x+1 を適用する代わりに、
//! カーソルより上のワード列に未適用のアフィン変換 y = c·x + k を保持する。
//! 奇数ステップ s 回分の合成は c = 3^s となり、k は 1 を s 回 3x+1 した値に
//! ワード内の繰り上がりを畳み込んだもの。c, k が 64bit に収まる限り繰り延べられる。

/// 3^39。これ以下なら次の ×3 が 64bit に収まる (3^40 < 2^64)
pub const MAX_MULTIPLIER: u64 = 4_052_555_153_018_976_267;

/// (2^64 - 4) / 3。これ以下なら 3k + 2 が 64bit に収まる
pub const MAX_CARRY: u64 = 6_148_914_691_236_517_204;

/// 未適用のアフィン変換 (multiplier, carry)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LazyTransform {
    multiplier: u64,
    carry: u64,
}

impl Default for LazyTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl LazyTransform {
    pub const fn identity() -> Self {
        LazyTransform { multiplier: 1, carry: 0 }
    }

    pub fn multiplier(&self) -> u64 {
        self.multiplier
    }

    pub fn carry(&self) -> u64 {
        self.carry
    }

    pub fn is_identity(&self) -> bool {
        self.multiplier == 1 && self.carry == 0
    }

    /// もう1ステップ合成しても c, k が 64bit に収まるか
    #[inline]
    pub fn can_defer(&self) -> bool {
        self.multiplier <= MAX_MULTIPLIER && self.carry <= MAX_CARRY
    }

    /// カーソル位置のワードに 3x+1 を適用し、上位ワード分は変換に合成する。
    ///
    /// `mask` はカーソルのビット（ワード内で立っている奇数ビット）。
    /// カーソル未満のビットは常に 0 なので、3·word + mask の繰り上がりは最大 2。
    #[inline]
    pub fn absorb_odd_step(&mut self, word: &mut u64, mask: u64) {
        debug_assert!(self.can_defer());
        debug_assert!(*word & mask != 0);
        debug_assert!(*word & (mask - 1) == 0);

        let v = 3 * (*word as u128) + mask as u128;
        *word = v as u64;
        let overflow = (v >> 64) as u64;

        self.multiplier *= 3;
        self.carry = 3 * self.carry + overflow;
    }

    /// 1ワードだけ変換を適用し、繰り上がりを新しい carry として残す。
    /// カーソルが次のワードへ移るときに、新しく露出したワードを確定させる。
    #[inline]
    pub fn apply_to_word(&mut self, word: &mut u64) {
        let v = mul_add(*word, self.multiplier, self.carry);
        *word = v as u64;
        self.carry = (v >> 64) as u64;
    }

    pub fn reset(&mut self) {
        *self = Self::identity();
    }
}

/// word·c + k を 128bit で計算。c, k < 2^64 なので溢れない
#[inline]
pub(crate) fn mul_add(word: u64, multiplier: u64, carry: u64) -> u128 {
    word as u128 * multiplier as u128 + carry as u128
}
