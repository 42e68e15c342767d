// ============================================
// src/deck.rs
// 単語データ (data.json) の構造と読み込み
// ============================================

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 1件の単語データ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabItem {
    pub kanji: String,
    pub furigana: String,
    pub kanji_furigana: String,
    pub meaning: String,
    /// 音声ファイル名 (audio ディレクトリからの相対パス)
    #[serde(default)]
    pub audio: String,
}

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse deck: {0}")]
    Json(#[from] serde_json::Error),

    #[error("deck contains no items")]
    Empty,
}

/// 単語リスト
#[derive(Debug, Clone)]
pub struct Deck {
    pub name: String,
    pub items: Vec<VocabItem>,
}

impl Deck {
    /// JSON文字列からデッキを作る (空リストはエラー)
    pub fn from_json(name: impl Into<String>, text: &str) -> Result<Self, DeckError> {
        let items: Vec<VocabItem> = serde_json::from_str(text)?;
        if items.is_empty() {
            return Err(DeckError::Empty);
        }
        Ok(Self {
            name: name.into(),
            items,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, index: usize) -> Option<&VocabItem> {
        self.items.get(index)
    }

    /// 並び順をランダムにする
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.items.shuffle(rng);
    }
}

/// MARK:ファイルからデッキを読み込む
pub fn load_deck(path: &Path) -> Result<Deck, DeckError> {
    let text = fs::read_to_string(path).map_err(|source| DeckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("deck")
        .to_string();
    let deck = Deck::from_json(name, &text)?;
    tracing::info!("Loaded deck '{}' ({} items) from {}", deck.name, deck.len(), path.display());
    Ok(deck)
}

/// 別スレッドで読み込み、結果をチャネルで返す
/// (UIはその間「Loading...」を表示し続ける)
pub fn spawn_loader(path: PathBuf) -> Receiver<Result<Deck, DeckError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // 受信側が先に閉じていても気にしない
        let _ = tx.send(load_deck(&path));
    });
    rx
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    pub(crate) const SAMPLE: &str = r#"[
        {"kanji": "猫", "furigana": "ねこ", "kanjiFurigana": "猫(ねこ)", "meaning": "cat", "audio": "neko.mp3"},
        {"kanji": "犬", "furigana": "いぬ", "kanjiFurigana": "犬(いぬ)", "meaning": "dog", "audio": "inu.mp3"},
        {"kanji": "空", "furigana": "そら", "kanjiFurigana": "空(そら)", "meaning": "sky", "audio": "sora.mp3"},
        {"kanji": "海", "furigana": "うみ", "kanjiFurigana": "海(うみ)", "meaning": "sea", "audio": "umi.mp3"},
        {"kanji": "山", "furigana": "やま", "kanjiFurigana": "山(やま)", "meaning": "mountain", "audio": "yama.mp3"},
        {"kanji": "川", "furigana": "かわ", "kanjiFurigana": "川(かわ)", "meaning": "river", "audio": "kawa.mp3"}
    ]"#;

    pub(crate) fn sample_deck() -> Deck {
        Deck::from_json("sample", SAMPLE).unwrap()
    }

    #[test]
    fn test_parse_camel_case_fields() {
        let deck = sample_deck();
        assert_eq!(deck.len(), 6);
        assert_eq!(deck.items[0].kanji_furigana, "猫(ねこ)");
        assert_eq!(deck.items[0].audio, "neko.mp3");
    }

    #[test]
    fn test_missing_audio_defaults_to_empty() {
        let json = r#"[{"kanji": "車", "furigana": "くるま", "kanjiFurigana": "車(くるま)", "meaning": "car"}]"#;
        let deck = Deck::from_json("x", json).unwrap();
        assert_eq!(deck.items[0].audio, "");
    }

    #[test]
    fn test_empty_deck_is_rejected() {
        assert!(matches!(Deck::from_json("x", "[]"), Err(DeckError::Empty)));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(Deck::from_json("x", "{\"kanji\": 1}"), Err(DeckError::Json(_))));
        assert!(matches!(Deck::from_json("x", "not json"), Err(DeckError::Json(_))));
    }

    #[test]
    fn test_shuffle_keeps_items() {
        let mut deck = sample_deck();
        let mut rng = StdRng::seed_from_u64(7);
        deck.shuffle(&mut rng);
        let mut kanji: Vec<_> = deck.items.iter().map(|i| i.kanji.clone()).collect();
        kanji.sort();
        let mut expected: Vec<_> = sample_deck().items.iter().map(|i| i.kanji.clone()).collect();
        expected.sort();
        assert_eq!(kanji, expected);
    }

    #[test]
    fn test_load_deck_from_file_and_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("words.json");
        fs::write(&path, SAMPLE).unwrap();

        let deck = load_deck(&path).unwrap();
        assert_eq!(deck.name, "words");
        assert_eq!(deck.len(), 6);

        let missing = temp_dir.path().join("nope.json");
        assert!(matches!(load_deck(&missing), Err(DeckError::Io { .. })));
    }

    #[test]
    fn test_spawn_loader_reports_error() {
        let rx = spawn_loader(PathBuf::from("/definitely/not/here/data.json"));
        let result = rx.recv().unwrap();
        assert!(result.is_err());
    }
}
