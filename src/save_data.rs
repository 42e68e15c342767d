// ============================================
// src/save_data.rs
// 学習記録の構造と読み書きロジック
// ============================================

use bincode::config::standard;
use bincode::{Decode, Encode};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::config::project_dirs;
use crate::quiz::{Mode, SessionStats};

const SAVE_FILE_BIN: &str = "save_data.bin";

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// 1セッションごとの記録
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub timestamp: DateTime<Utc>,
    pub deck: String,
    pub mode: String,
    pub answered: u32,
    pub correct: u32,
}

/// bincode用の内部表現（DateTimeをi64に変換）
#[derive(Encode, Decode)]
struct SessionRecordBin {
    timestamp_secs: i64,
    deck: String,
    mode: String,
    answered: u32,
    correct: u32,
}

impl From<&SessionRecord> for SessionRecordBin {
    fn from(record: &SessionRecord) -> Self {
        Self {
            timestamp_secs: record.timestamp.timestamp(),
            deck: record.deck.clone(),
            mode: record.mode.clone(),
            answered: record.answered,
            correct: record.correct,
        }
    }
}

impl From<SessionRecordBin> for SessionRecord {
    fn from(bin: SessionRecordBin) -> Self {
        Self {
            timestamp: Utc
                .timestamp_opt(bin.timestamp_secs, 0)
                .single()
                .unwrap_or_default(),
            deck: bin.deck,
            mode: bin.mode,
            answered: bin.answered,
            correct: bin.correct,
        }
    }
}

/// 累計の学習データ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    pub total_answered: u32,
    pub total_correct: u32,
    /// 過去のセッション記録
    pub history: Vec<SessionRecord>,
}

/// bincode用の内部表現
#[derive(Encode, Decode)]
struct PlayerDataBin {
    total_answered: u32,
    total_correct: u32,
    history: Vec<SessionRecordBin>,
}

impl From<&PlayerData> for PlayerDataBin {
    fn from(data: &PlayerData) -> Self {
        Self {
            total_answered: data.total_answered,
            total_correct: data.total_correct,
            history: data.history.iter().map(SessionRecordBin::from).collect(),
        }
    }
}

impl From<PlayerDataBin> for PlayerData {
    fn from(bin: PlayerDataBin) -> Self {
        Self {
            total_answered: bin.total_answered,
            total_correct: bin.total_correct,
            history: bin.history.into_iter().map(SessionRecord::from).collect(),
        }
    }
}

impl PlayerData {
    // MARK:セーブファイルのパスを取得する関数
    pub fn save_file_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.data_dir().join(SAVE_FILE_BIN))
    }

    /// 累計正答率 (%)
    pub fn accuracy(&self) -> Option<f64> {
        SessionStats {
            answered: self.total_answered,
            correct: self.total_correct,
        }
        .accuracy()
    }

    /// セッション結果を追加する。1問も答えていなければ何もしない
    pub fn record_session(&mut self, deck: &str, mode: Mode, stats: SessionStats) -> bool {
        if stats.answered == 0 {
            return false;
        }
        self.total_answered += stats.answered;
        self.total_correct += stats.correct;
        self.history.push(SessionRecord {
            timestamp: Utc::now(),
            deck: deck.to_string(),
            mode: mode.label().to_string(),
            answered: stats.answered,
            correct: stats.correct,
        });
        true
    }

    /// MARK:データをファイルに保存する (バイナリ + JSON)
    pub fn save_to(&self, path: &Path) -> Result<(), SaveError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // --- 1. バイナリ形式で保存 (本番用) ---
        let encoded = bincode::encode_to_vec(PlayerDataBin::from(self), standard())?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&encoded)?;
        writer.flush()?;

        // --- 2. JSON形式で保存 (デバッグ用) ---
        fs::write(path.with_extension("json"), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// MARK:ファイルからデータを読み込む (バイナリ優先、JSONフォールバック)
    pub fn load_from(path: &Path) -> Self {
        // 1. バイナリファイルから読み込みを試行
        if let Ok(mut file) = File::open(path) {
            let mut buffer = Vec::new();
            if file.read_to_end(&mut buffer).is_ok() {
                match bincode::decode_from_slice::<PlayerDataBin, _>(&buffer, standard()) {
                    Ok((bin_data, _)) => return PlayerData::from(bin_data),
                    Err(e) => tracing::warn!("Corrupt save data at {}: {}", path.display(), e),
                }
            }
        }

        // 2. バイナリ失敗時、JSONファイルから読み込みを試行
        if let Ok(file) = File::open(path.with_extension("json")) {
            if let Ok(data) = serde_json::from_reader(BufReader::new(file)) {
                return data;
            }
        }

        // どちらも失敗した場合はデフォルト
        Self::default()
    }

    pub fn load() -> Self {
        Self::save_file_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), SaveError> {
        match Self::save_file_path() {
            Some(path) => self.save_to(&path),
            None => {
                tracing::warn!("No data directory available, progress not saved");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_save_path() -> (PathBuf, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (temp_dir.path().join("data").join(SAVE_FILE_BIN), temp_dir)
    }

    #[test]
    fn test_record_session_updates_totals() {
        let mut data = PlayerData::default();
        assert!(!data.record_session("n5", Mode::Kanji, SessionStats::default()));
        assert!(data.history.is_empty());

        assert!(data.record_session("n5", Mode::Furigana, SessionStats { answered: 4, correct: 3 }));
        assert!(data.record_session("n5", Mode::Kanji, SessionStats { answered: 6, correct: 2 }));
        assert_eq!(data.total_answered, 10);
        assert_eq!(data.total_correct, 5);
        assert_eq!(data.accuracy(), Some(50.0));
        assert_eq!(data.history[0].mode, "Furigana");
    }

    #[test]
    fn test_save_and_load_binary() {
        let (path, _temp) = temp_save_path();
        let mut data = PlayerData::default();
        data.record_session("n4", Mode::KanjiFurigana, SessionStats { answered: 8, correct: 7 });
        data.save_to(&path).unwrap();

        let loaded = PlayerData::load_from(&path);
        assert_eq!(loaded.total_answered, 8);
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.history[0].deck, "n4");
        // バイナリは秒単位で保存される
        assert_eq!(
            loaded.history[0].timestamp.timestamp(),
            data.history[0].timestamp.timestamp()
        );
    }

    #[test]
    fn test_falls_back_to_json_when_binary_is_corrupt() {
        let (path, _temp) = temp_save_path();
        let mut data = PlayerData::default();
        data.record_session("n3", Mode::Kanji, SessionStats { answered: 2, correct: 1 });
        data.save_to(&path).unwrap();
        fs::write(&path, b"\xff\xff\xff").unwrap();

        let loaded = PlayerData::load_from(&path);
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_missing_files_give_default() {
        let (path, _temp) = temp_save_path();
        assert_eq!(PlayerData::load_from(&path), PlayerData::default());
    }
}
