use std::path::PathBuf;
use std::process::exit;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use collatz_lazy::config::{DEFAULT_HIGH_PADDING, DEFAULT_PROGRESS_INTERVAL, DEFAULT_WORKING_WORDS};
use collatz_lazy::*;

/// 遅延乗算による Collatz 総ステップ数の計測
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// '0'/'1' の2進文字列ファイル (MSB first)。省略時は全ビット 1 の数
    input: Option<PathBuf>,

    /// 数の表現に使う作業ワード数
    #[arg(long, default_value_t = DEFAULT_WORKING_WORDS)]
    words: usize,

    /// 繰り上がり用の上端パディング（ワード数）
    #[arg(long, default_value_t = DEFAULT_HIGH_PADDING)]
    padding: usize,

    /// 進捗表示の間隔（ステップ数）
    #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    progress_interval: u64,

    /// [START, END] の全整数で参照実装と突き合わせる
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    verify: Option<Vec<u64>>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.verify.as_deref() {
        Some(&[start, end]) => cmd_verify(&cli, start, end),
        _ => cmd_run(&cli),
    };
    if let Err(e) = result {
        eprintln!("エラー: {:#}", e);
        exit(1);
    }
}

fn config_from(cli: &Cli) -> EngineConfig {
    EngineConfig::default()
        .with_working_words(cli.words)
        .with_high_padding(cli.padding)
        .with_progress_interval(cli.progress_interval)
}

fn cmd_run(cli: &Cli) -> Result<()> {
    let config = config_from(cli);
    info!(
        "作業領域 {} ワード + パディング {} ワード",
        config.working_words,
        config.effective_high_padding()
    );

    let mut engine = match &cli.input {
        Some(path) => {
            println!("ファイル {} から数を読み込みます", path.display());
            let bits = std::fs::read(path).map_err(|source| EngineError::Io {
                path: path.clone(),
                source,
            })?;
            StepEngine::from_bit_str(&bits, &config).context("入力の読み込みに失敗")?
        }
        None => {
            let engine = StepEngine::all_ones_spanning(&config).context("試験数の生成に失敗")?;
            println!("全ビット 1 の {} ビット数で試験します", engine.bitsize());
            engine
        }
    };

    println!("計算を開始します...");
    let timer = Instant::now();
    let counters = engine.run_with_callback(|p| {
        println!(
            "ステップ {}: {} ビット (÷2/×3 {} {})",
            p.steps, p.bitsize, p.div_steps, p.mul_steps
        );
    });
    let elapsed = timer.elapsed();

    println!(
        "完了: {} ステップ, {:.6} 秒, ÷2/×3 = {} / {}",
        counters.steps,
        elapsed.as_secs_f64(),
        counters.div_steps,
        counters.mul_steps
    );
    let class = counters.classify(config.halving_ratio_limit);
    println!(
        "÷2 比率 {:.4}% ({})",
        class.halving_ratio * 100.0,
        if class.nontrivial { "非自明" } else { "自明: ÷2 が多すぎる" }
    );
    info!("実体化 {} 回", engine.actualizations());
    Ok(())
}

fn cmd_verify(cli: &Cli, start: u64, end: u64) -> Result<()> {
    let config = EngineConfig::small().with_progress_interval(cli.progress_interval);
    let num_threads = rayon::current_num_threads();
    println!("範囲検証: [{}, {}] ({}スレッド並列)", start, end, num_threads);

    let timer = Instant::now();
    let result = verify_range_parallel(start, end, &config, |done, total| {
        if done % 100_000 == 0 || done == total {
            eprint!("\x1b[2K\r  {}/{}", done, total);
        }
    })
    .context("範囲検証に失敗")?;
    let elapsed = timer.elapsed();
    eprintln!();

    println!("検証した数        = {}", result.total_checked);
    println!("全て一致          = {}", if result.all_matched { "はい" } else { "いいえ" });
    println!("最大ステップ数    = {} (n={})", result.max_steps, result.max_steps_number);
    println!("計算時間          = {:?}", elapsed);
    for m in result.mismatches.iter().take(10) {
        println!("  不一致 n={}: エンジン {:?} / 参照 {:?}", m.n, m.engine, m.reference);
    }
    if !result.all_matched {
        anyhow::bail!("{} 件の不一致", result.mismatches.len());
    }
    Ok(())
}
