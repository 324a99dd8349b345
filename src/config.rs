//! エンジン設定。
//!
//! デフォルト値は 50M ワード（約 400MB）の作業領域と 1M ワードの上端パディング。

/// ウィンドウシフトを起動する上端までの余白（ワード数）。
/// 1回の実体化で増えるのは最大1ワードなので 2 で足りる。
pub const SHIFT_MARGIN: usize = 2;

/// 作業ワード数のデフォルト
pub const DEFAULT_WORKING_WORDS: usize = 50_000_000;

/// 上端パディングのデフォルト
pub const DEFAULT_HIGH_PADDING: usize = 1_000_000;

/// 進捗報告の間隔（ステップ数）
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1 << 18;

/// ÷2 ステップ比率の上限 99/100（これを超えると自明な数とみなす）
pub const DEFAULT_HALVING_RATIO_LIMIT: RatioLimit = RatioLimit::new(99, 100);

/// 比率の上限を分数で持つ。比較は常に整数で行う
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioLimit {
    pub numerator: u64,
    pub denominator: u64,
}

impl RatioLimit {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        RatioLimit { numerator, denominator }
    }

    /// part / whole <= numerator / denominator か
    pub fn admits(&self, part: u64, whole: u64) -> bool {
        part as u128 * self.denominator as u128 <= whole as u128 * self.numerator as u128
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// 数の表現に使える作業ワード数。入力はこれに収まらなければならない
    pub working_words: usize,
    /// 繰り上がりで伸びる分のために確保する上端パディング
    pub high_padding: usize,
    /// run_with_callback のコールバック間隔
    pub progress_interval: u64,
    pub halving_ratio_limit: RatioLimit,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            working_words: DEFAULT_WORKING_WORDS,
            high_padding: DEFAULT_HIGH_PADDING,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            halving_ratio_limit: DEFAULT_HALVING_RATIO_LIMIT,
        }
    }
}

impl EngineConfig {
    /// 小さい数の検証用（テスト・範囲検証で何百万回も作り直すため）
    pub fn small() -> Self {
        EngineConfig {
            working_words: 4,
            high_padding: 4,
            ..EngineConfig::default()
        }
    }

    pub fn with_working_words(mut self, words: usize) -> Self {
        self.working_words = words;
        self
    }

    pub fn with_high_padding(mut self, words: usize) -> Self {
        self.high_padding = words;
        self
    }

    pub fn with_progress_interval(mut self, steps: u64) -> Self {
        self.progress_interval = steps.max(1);
        self
    }

    pub fn with_halving_ratio_limit(mut self, limit: RatioLimit) -> Self {
        self.halving_ratio_limit = limit;
        self
    }

    /// シフト余白を下回らないよう補正した上端パディング
    pub fn effective_high_padding(&self) -> usize {
        self.high_padding.max(SHIFT_MARGIN)
    }

    /// バッキングバッファの総ワード数。usize を溢れるなら None
    pub fn buffer_words(&self) -> Option<usize> {
        self.working_words.checked_add(self.effective_high_padding())
    }

    /// 作業ワード全体のビット幅（引数なし起動時の試験数）。u64 を溢れるなら None
    pub fn working_bits(&self) -> Option<u64> {
        (self.working_words as u64).checked_mul(64)
    }
}
