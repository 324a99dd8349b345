use std::path::PathBuf;

use thiserror::Error;

/// エンジンのエラー種別。
/// ステップループ内で回復可能なエラーは存在しない（初期化時のみ発生する）。
#[derive(Error, Debug)]
pub enum EngineError {
    /// バッキングバッファを確保できなかった
    #[error("メモリ確保に失敗しました ({words} ワード)")]
    Allocation { words: usize },

    /// 入力のビット長が作業ワード数を超えている
    #[error("メモリが足りません: {needed_words} ワード必要, {available_words} ワード ({} バイト) 確保済み", .available_words * 8)]
    Capacity {
        needed_words: usize,
        available_words: usize,
    },

    /// '0' / '1' 以外の文字
    #[error("不正な文字 {found:?} (位置 {position})")]
    Format { position: usize, found: char },

    /// 値 0 は 1 に到達しない
    #[error("入力が 0 です")]
    Zero,

    #[error("ファイルを読めません {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
