// ============================================
// src/quiz.rs
// 出題・選択肢生成・採点のロジック
// ============================================

use std::collections::HashSet;
use std::fmt;

use clap::ValueEnum;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};

use crate::deck::{Deck, DeckError, VocabItem};

/// 選択肢の数
pub const CHOICE_COUNT: usize = 4;

/// 選択肢にどのフィールドを使うか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Kanji,
    Furigana,
    #[serde(alias = "kanjiFurigana")]
    KanjiFurigana,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Kanji, Mode::Furigana, Mode::KanjiFurigana];

    /// 画面表示用のラベル
    pub fn label(self) -> &'static str {
        match self {
            Mode::Kanji => "Kanji",
            Mode::Furigana => "Furigana",
            Mode::KanjiFurigana => "Kanji + Furigana",
        }
    }

    /// 単語データからこのモードの値を取り出す
    pub fn field(self, item: &VocabItem) -> &str {
        match self {
            Mode::Kanji => &item.kanji,
            Mode::Furigana => &item.furigana,
            Mode::KanjiFurigana => &item.kanji_furigana,
        }
    }

    /// 次のモード (最後の次は最初に戻る)
    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 直前の回答結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub taken: String,
    pub correct: String,
    pub meaning: String,
}

impl Feedback {
    pub fn is_correct(&self) -> bool {
        score(&self.taken, &self.correct)
    }
}

/// このセッションの成績
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub answered: u32,
    pub correct: u32,
}

impl SessionStats {
    /// 正答率 (%)。未回答なら None
    pub fn accuracy(&self) -> Option<f64> {
        (self.answered > 0).then(|| self.correct as f64 / self.answered as f64 * 100.0)
    }
}

/// MARK:選択肢を作る
/// 他の単語から重複しない値を3つ選び、正解を加えてシャッフルする。
/// 異なる値が4つ未満のデッキでは、ある分だけを返す。
pub fn next_choices<R: Rng + ?Sized>(
    deck: &Deck,
    index: usize,
    mode: Mode,
    rng: &mut R,
) -> Vec<String> {
    let Some(item) = deck.get(index) else {
        return Vec::new();
    };
    let correct = mode.field(item);

    // 出現順を保ったまま重複を除く (シード固定時に結果を再現できるように)
    let mut seen = HashSet::new();
    let pool: Vec<&str> = deck
        .items
        .iter()
        .map(|other| mode.field(other))
        .filter(|value| *value != correct && seen.insert(*value))
        .collect();

    let mut choices: Vec<String> = pool
        .choose_multiple(rng, CHOICE_COUNT - 1)
        .map(|value| value.to_string())
        .collect();
    choices.push(correct.to_string());
    choices.shuffle(rng);
    choices
}

/// 採点
pub fn score(pick: &str, correct: &str) -> bool {
    pick == correct
}

/// ショートカットキー '1'..'4' を選択肢の位置 0..3 に変換
pub fn choice_for_key(c: char) -> Option<usize> {
    match c {
        '1'..='4' => Some(c as usize - '1' as usize),
        _ => None,
    }
}

/// クイズ全体の状態
pub struct Quiz {
    deck: Deck,
    index: usize,
    mode: Mode,
    choices: Vec<String>,
    last: Option<Feedback>,
    stats: SessionStats,
    /// 何周目か (1始まり)
    round: u32,
    rng: StdRng,
}

impl Quiz {
    /// デッキをシャッフルして最初の問題を用意する
    pub fn new(mut deck: Deck, mode: Mode, mut rng: StdRng) -> Result<Self, DeckError> {
        if deck.items.is_empty() {
            return Err(DeckError::Empty);
        }
        deck.shuffle(&mut rng);
        let mut quiz = Self {
            deck,
            index: 0,
            mode,
            choices: Vec::new(),
            last: None,
            stats: SessionStats::default(),
            round: 1,
            rng,
        };
        quiz.refresh_choices();
        Ok(quiz)
    }

    fn refresh_choices(&mut self) {
        self.choices = next_choices(&self.deck, self.index, self.mode, &mut self.rng);
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn last(&self) -> Option<&Feedback> {
        self.last.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// 現在の問題
    pub fn current(&self) -> &VocabItem {
        &self.deck.items[self.index]
    }

    /// 現在の問題の正解 (モード依存)
    pub fn correct_answer(&self) -> &str {
        self.mode.field(self.current())
    }

    /// モード切り替え。同じ問題のまま選択肢を作り直す
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.mode = mode;
            self.refresh_choices();
        }
    }

    /// MARK:回答する
    /// 位置に選択肢がなければ何もしない
    pub fn select(&mut self, position: usize) -> Option<Feedback> {
        let taken = self.choices.get(position)?.clone();
        let feedback = Feedback {
            taken,
            correct: self.correct_answer().to_string(),
            meaning: self.current().meaning.clone(),
        };

        self.stats.answered += 1;
        if feedback.is_correct() {
            self.stats.correct += 1;
        }
        tracing::debug!(
            "answered '{}' (correct: '{}') at index {}",
            feedback.taken,
            feedback.correct,
            self.index
        );

        self.last = Some(feedback.clone());
        self.advance();
        Some(feedback)
    }

    /// 次の問題へ。最後まで行ったらシャッフルし直して最初から
    fn advance(&mut self) {
        self.index += 1;
        if self.index >= self.deck.len() {
            self.index = 0;
            self.round += 1;
            self.deck.shuffle(&mut self.rng);
            tracing::info!("Deck finished, starting round {}", self.round);
        }
        self.refresh_choices();
    }
}
