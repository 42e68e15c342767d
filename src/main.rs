// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::fs::{self, OpenOptions};
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing_subscriber::EnvFilter;

mod app;
mod audio;
mod config;
mod deck;
mod quiz;
mod save_data;
mod ui;

use app::{App, AppOptions, Screen};
use audio::AudioPlayer;
use config::{Config, load_or_create_config, project_dirs};
use deck::{Deck, DeckError, spawn_loader};
use quiz::Mode;
use save_data::PlayerData;

#[derive(Parser, Debug)]
#[command(version, about = "Multiple-choice kanji / furigana vocabulary quiz")]
struct Cli {
    /// 単語データ (JSON)
    #[arg(short, long)]
    deck: Option<PathBuf>,

    /// 選択肢に使うフィールド
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// 音声ファイルのディレクトリ
    #[arg(long)]
    audio_dir: Option<PathBuf>,

    /// 出題順を固定する乱数シード
    #[arg(long)]
    seed: Option<u64>,

    /// 音声を自動再生しない
    #[arg(long)]
    no_audio: bool,

    /// 学習記録を保存しない
    #[arg(long)]
    no_save: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// これまでの学習記録を表示する
    Stats,
}

// --------------------------------------------------
// メイン関数
// --------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging();

    match cli.command {
        Some(Command::Stats) => print_stats(&PlayerData::load()),
        None => run_quiz(cli, log_path),
    }
}

/// TUIが画面を使うので、ログはデータディレクトリのファイルに出す
fn init_logging() -> Option<PathBuf> {
    let dir = project_dirs()?.data_dir().to_path_buf();
    fs::create_dir_all(&dir).ok()?;
    let path = dir.join("kanaquiz.log");
    let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Some(path)
}

/// 設定ファイルにコマンドライン引数を上書きする
fn apply_cli(mut cfg: Config, cli: &Cli) -> Config {
    if let Some(deck) = &cli.deck {
        cfg.deck_path = deck.clone();
    }
    if let Some(mode) = cli.mode {
        cfg.mode = mode;
    }
    if let Some(dir) = &cli.audio_dir {
        cfg.audio_dir = Some(dir.clone());
    }
    if cli.no_audio {
        cfg.autoplay_audio = false;
    }
    cfg
}

fn run_quiz(cli: Cli, log_path: Option<PathBuf>) -> Result<()> {
    let cfg = apply_cli(load_or_create_config(), &cli);
    tracing::info!("Starting with deck {} (mode {})", cfg.deck_path.display(), cfg.mode);

    let audio = Some(AudioPlayer::new(cfg.resolved_audio_dir()));
    let options = AppOptions {
        mode: cfg.mode,
        advance_delay: Duration::from_millis(cfg.advance_delay_ms),
        reveal_feedback: cfg.reveal_feedback,
        autoplay_audio: cfg.autoplay_audio,
        seed: cli.seed,
    };
    let mut app = App::new(options, PlayerData::load(), audio);
    let loader = spawn_loader(cfg.deck_path.clone());

    let mut terminal = setup_terminal().context("failed to set up terminal")?;
    let result = run_app(&mut terminal, &mut app, loader);
    restore_terminal().context("failed to restore terminal")?;
    result?;

    if let Screen::Loading { error: Some(error) } = &app.screen {
        eprintln!("{} {}", style("error:").red().bold(), error);
    }
    if app.finish() {
        if let Some(quiz) = app.quiz() {
            let stats = quiz.stats();
            println!(
                "{} {}/{} correct",
                style("Session:").cyan().bold(),
                stats.correct,
                stats.answered
            );
        }
        if cli.no_save {
            tracing::info!("--no-save given, progress not written");
        } else {
            app.player_data.save().context("failed to save progress")?;
        }
    }
    if let Some(path) = log_path {
        tracing::info!("Log written to {}", path.display());
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?; // 代替スクリーンを使用
    stdout().execute(Hide)?; // カーソルを非表示
    let backend = CrosstermBackend::new(stdout());
    Ok(Terminal::new(backend)?)
}

fn restore_terminal() -> Result<()> {
    stdout().execute(Show)?; // カーソルを再表示
    stdout().execute(LeaveAlternateScreen)?; // 代替スクリーンを終了
    disable_raw_mode()?;
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<impl Backend>,
    app: &mut App,
    loader: Receiver<Result<Deck, DeckError>>,
) -> Result<()> {
    let mut loader = Some(loader);

    loop {
        // デッキの読み込みが終わったか
        if let Some(rx) = &loader {
            match rx.try_recv() {
                Ok(result) => {
                    app.on_deck_loaded(result);
                    loader = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    tracing::error!("Deck loader stopped without a result");
                    app.screen = Screen::Loading {
                        error: Some("deck loader stopped unexpectedly".to_string()),
                    };
                    loader = None;
                }
            }
        }

        app.tick(Instant::now());
        terminal.draw(|f| ui::ui(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        break;
                    }
                    app.handle_key(key.code, Instant::now());
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

// --------------------------------------------------
// 学習記録の表示 (TUIなし)
// --------------------------------------------------

fn print_stats(data: &PlayerData) -> Result<()> {
    if data.history.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }

    println!("{}", style("Sessions").bold().underlined());
    for record in &data.history {
        println!(
            "  {}  {:<16} {:<18} {:>4}/{:<4}",
            style(record.timestamp.format("%Y-%m-%d %H:%M")).dim(),
            record.deck,
            record.mode,
            record.correct,
            record.answered,
        );
    }
    let accuracy = data
        .accuracy()
        .map(|a| format!("{:.1}%", a))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} {}/{} ({})",
        style("Total:").green().bold(),
        data.total_correct,
        data.total_answered,
        accuracy
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "kanaquiz",
            "--deck",
            "n5.json",
            "--mode",
            "kanji-furigana",
            "--no-audio",
        ]);
        let cfg = apply_cli(Config::default(), &cli);
        assert_eq!(cfg.deck_path, PathBuf::from("n5.json"));
        assert_eq!(cfg.mode, Mode::KanjiFurigana);
        assert!(!cfg.autoplay_audio);
        assert_eq!(cfg.audio_dir, None);
    }

    #[test]
    fn test_cli_defaults_keep_config() {
        let cli = Cli::parse_from(["kanaquiz"]);
        let cfg = apply_cli(Config::default(), &cli);
        assert_eq!(cfg, Config::default());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_stats_subcommand() {
        let cli = Cli::parse_from(["kanaquiz", "stats"]);
        assert!(matches!(cli.command, Some(Command::Stats)));
    }
}
