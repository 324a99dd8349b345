//! 実体化: 保留中の変換をカーソルより上の全ワードへ適用する。
//!
//! 各ワードを word' = c·word + k_in（128bit 中間値）で置き換え、上位 64bit を次の
//! ワードへ繰り上げる。最後に残った繰り上がりは新しい最上位ワードになる。
//! コストはウィンドウ長に比例するので、遅延乗算はこれの呼び出し回数を減らすためにある。

use crate::lazy::{mul_add, LazyTransform};
use crate::window::WordWindow;

/// 変換を適用して恒等変換に戻し、ビット長を厳密に再計算する。
/// 上端に近づいていればウィンドウシフト（必要ならバッファ拡張）も行う。
pub fn actualize(window: &mut WordWindow, transform: &mut LazyTransform) {
    if !transform.is_identity() {
        let multiplier = transform.multiplier();
        let mut carry = transform.carry();
        for word in window.upper_words_mut() {
            let v = mul_add(*word, multiplier, carry);
            *word = v as u64;
            carry = (v >> 64) as u64;
        }
        if carry != 0 {
            window.push_top_word(carry);
        }
        transform.reset();
    }

    window.recompute_bitsize();
    window.ensure_headroom();
}
