// ============================================
// src/config.rs
// 設定ファイル (config.toml) の読み書き
// ============================================

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quiz::Mode;

const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// ユーザー設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 単語データ (JSON) のパス
    pub deck_path: PathBuf,
    /// 音声ファイルのディレクトリ。未指定ならデッキと同じ場所の audio/
    pub audio_dir: Option<PathBuf>,
    /// 起動時のモード
    pub mode: Mode,
    /// 回答後、次の問題に進むまでの待ち時間
    pub advance_delay_ms: u64,
    /// 前回の答えを最初から表示するか (false ならぼかす)
    pub reveal_feedback: bool,
    /// 問題が変わったら音声を自動再生
    pub autoplay_audio: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deck_path: PathBuf::from("data.json"),
            audio_dir: None,
            mode: Mode::Kanji,
            advance_delay_ms: 300,
            reveal_feedback: false,
            autoplay_audio: true,
        }
    }
}

impl Config {
    /// 実際に使う音声ディレクトリ
    pub fn resolved_audio_dir(&self) -> PathBuf {
        match &self.audio_dir {
            Some(dir) => dir.clone(),
            None => self
                .deck_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join("audio"),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }
}

/// OSごとのアプリ用ディレクトリ
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("jp", "kanaquiz", "kanaquiz")
}

/// 設定ファイルのパス (例: ~/.config/kanaquiz/config.toml)
pub fn config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// MARK:設定を読み込む。なければデフォルトを書き出して使う
/// 壊れた設定ファイルは上書きせず、デフォルトで起動する
pub fn load_or_create_config() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("No config directory available, using defaults");
        return Config::default();
    };

    if path.exists() {
        match Config::load_from(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                tracing::warn!("Ignoring config at {}: {}", path.display(), e);
                return Config::default();
            }
        }
    }

    let cfg = Config::default();
    if let Err(e) = cfg.save_to(&path) {
        tracing::warn!("Could not write default config to {}: {}", path.display(), e);
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_round_trips_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(CONFIG_FILE);
        let mut cfg = Config::default();
        cfg.mode = Mode::KanjiFurigana;
        cfg.audio_dir = Some(PathBuf::from("/tmp/sounds"));

        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: Config = toml::from_str("mode = \"furigana\"\nadvance_delay_ms = 0\n").unwrap();
        assert_eq!(cfg.mode, Mode::Furigana);
        assert_eq!(cfg.advance_delay_ms, 0);
        assert_eq!(cfg.deck_path, PathBuf::from("data.json"));
        assert!(!cfg.reveal_feedback);
    }

    #[test]
    fn test_mode_accepts_camel_case_alias() {
        let cfg: Config = toml::from_str("mode = \"kanjiFurigana\"").unwrap();
        assert_eq!(cfg.mode, Mode::KanjiFurigana);
    }

    #[test]
    fn test_legacy_audio_player_key_is_ignored() {
        let cfg: Config = toml::from_str("audio_player = [\"mpv\"]\nautoplay_audio = false\n").unwrap();
        assert!(!cfg.autoplay_audio);
        assert!(!toml::to_string(&cfg).unwrap().contains("audio_player"));
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        assert!(toml::from_str::<Config>("mode = \"romaji\"").is_err());
    }

    #[test]
    fn test_audio_dir_defaults_next_to_deck() {
        let mut cfg = Config::default();
        cfg.deck_path = PathBuf::from("/srv/words/data.json");
        assert_eq!(cfg.resolved_audio_dir(), PathBuf::from("/srv/words/audio"));
        cfg.audio_dir = Some(PathBuf::from("/mnt/audio"));
        assert_eq!(cfg.resolved_audio_dir(), PathBuf::from("/mnt/audio"));
    }
}
