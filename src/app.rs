// ============================================
// src/app.rs
// アプリ全体の状態とキー入力の処理
// ============================================

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::audio::AudioPlayer;
use crate::deck::{Deck, DeckError};
use crate::quiz::{Mode, Quiz, choice_for_key};
use crate::save_data::PlayerData;

/// 画面の状態
pub enum Screen {
    /// デッキ読み込み中。失敗した場合はエラーを表示したままここに留まる
    Loading { error: Option<String> },
    Quiz(Quiz),
}

/// 回答直後、前の選択肢を色付きで見せておくための状態
pub struct Flash {
    pub choices: Vec<String>,
    pub taken: usize,
    pub correct: bool,
    until: Instant,
}

/// 起動時に決まる設定
pub struct AppOptions {
    pub mode: Mode,
    pub advance_delay: Duration,
    pub reveal_feedback: bool,
    pub autoplay_audio: bool,
    pub seed: Option<u64>,
}

pub struct App {
    pub screen: Screen,
    /// 前回の答えを表示するか (false のときはぼかす)
    pub reveal: bool,
    /// 矢印キーで選んでいる選択肢
    pub cursor: usize,
    pub flash: Option<Flash>,
    /// ステータスバーに出す一時的なメッセージ
    pub status: Option<String>,
    pub player_data: PlayerData,
    pub should_quit: bool,
    mode: Mode,
    advance_delay: Duration,
    autoplay_audio: bool,
    seed: Option<u64>,
    audio: Option<AudioPlayer>,
}

impl App {
    pub fn new(options: AppOptions, player_data: PlayerData, audio: Option<AudioPlayer>) -> Self {
        Self {
            screen: Screen::Loading { error: None },
            reveal: options.reveal_feedback,
            cursor: 0,
            flash: None,
            status: None,
            player_data,
            should_quit: false,
            mode: options.mode,
            advance_delay: options.advance_delay,
            autoplay_audio: options.autoplay_audio,
            seed: options.seed,
            audio,
        }
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        match &self.screen {
            Screen::Quiz(quiz) => Some(quiz),
            Screen::Loading { .. } => None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.quiz().map(Quiz::mode).unwrap_or(self.mode)
    }

    /// MARK:読み込み結果を受け取る
    pub fn on_deck_loaded(&mut self, result: Result<Deck, DeckError>) {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        match result.and_then(|deck| Quiz::new(deck, self.mode, rng)) {
            Ok(quiz) => {
                tracing::info!("Quiz ready: {} items, mode {}", quiz.deck().len(), quiz.mode());
                self.screen = Screen::Quiz(quiz);
                self.play_current_audio();
            }
            Err(e) => {
                tracing::error!("Failed to load deck: {}", e);
                self.screen = Screen::Loading {
                    error: Some(e.to_string()),
                };
            }
        }
    }

    /// 時間経過の処理 (フラッシュ表示の終了)
    pub fn tick(&mut self, now: Instant) {
        if self.flash.as_ref().is_some_and(|f| now >= f.until) {
            self.flash = None;
            self.play_current_audio();
        }
    }

    /// MARK:キー入力の処理
    pub fn handle_key(&mut self, code: KeyCode, now: Instant) {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(' ') | KeyCode::Char('b') => self.reveal = !self.reveal,
            KeyCode::Char('m') => self.cycle_mode(),
            KeyCode::Char('p') => self.replay_audio(),
            KeyCode::Left | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Right | KeyCode::Down | KeyCode::Tab => self.move_cursor(1),
            KeyCode::Enter => self.select(self.cursor, now),
            KeyCode::Char(c) => {
                if let Some(position) = choice_for_key(c) {
                    self.select(position, now);
                }
            }
            _ => {}
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let Some(quiz) = self.quiz() else { return };
        let len = quiz.choices().len() as isize;
        if len > 0 {
            self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
        }
    }

    fn cycle_mode(&mut self) {
        self.mode = self.mode().next();
        if let Screen::Quiz(quiz) = &mut self.screen {
            quiz.set_mode(self.mode);
        }
    }

    /// 選択肢を選ぶ。フラッシュ表示中や、その位置に選択肢がない場合は無視
    pub fn select(&mut self, position: usize, now: Instant) {
        if self.flash.is_some() {
            return;
        }
        let Screen::Quiz(quiz) = &mut self.screen else {
            return;
        };
        let shown = quiz.choices().to_vec();
        let Some(feedback) = quiz.select(position) else {
            return;
        };

        self.status = None;
        if self.advance_delay.is_zero() {
            self.play_current_audio();
        } else {
            self.flash = Some(Flash {
                choices: shown,
                taken: position,
                correct: feedback.is_correct(),
                until: now + self.advance_delay,
            });
        }
    }

    fn play_current_audio(&mut self) {
        if !self.autoplay_audio {
            return;
        }
        self.replay_audio();
    }

    /// 現在の問題の音声を再生 (失敗してもクイズは続ける)
    pub fn replay_audio(&mut self) {
        let Screen::Quiz(quiz) = &self.screen else {
            return;
        };
        let Some(player) = self.audio.as_mut() else {
            return;
        };
        if let Err(e) = player.play(&quiz.current().audio) {
            tracing::warn!("Audio playback failed: {}", e);
            self.status = Some(e.to_string());
        }
    }

    /// MARK:終了時にセッション結果を記録する
    /// 記録すべき回答があったら true
    pub fn finish(&mut self) -> bool {
        if let Some(player) = self.audio.as_mut() {
            player.stop();
        }
        let Screen::Quiz(quiz) = &self.screen else {
            return false;
        };
        self.player_data
            .record_session(&quiz.deck().name, quiz.mode(), quiz.stats())
    }
}
