// ============================================
// src/audio.rs
// 単語の音声を再生する (rodio)
// ============================================

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use rodio::decoder::DecoderError;
use rodio::stream::{OutputStream, OutputStreamBuilder, StreamError};
use rodio::{Decoder, Sink};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("audio file not found: {0}")]
    Missing(PathBuf),

    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecoderError,
    },

    #[error("no audio output device: {0}")]
    Stream(#[from] StreamError),
}

pub struct AudioPlayer {
    audio_dir: PathBuf,
    /// 出力ストリームは最初の再生時に開く。Sink は再生ごとに作り直す
    output: Option<(OutputStream, Sink)>,
}

impl AudioPlayer {
    pub fn new(audio_dir: PathBuf) -> Self {
        Self {
            audio_dir,
            output: None,
        }
    }

    /// 音声ファイルのフルパス。ファイル名が空なら None
    pub fn path_for(&self, file: &str) -> Option<PathBuf> {
        (!file.is_empty()).then(|| self.audio_dir.join(file))
    }

    /// MARK:再生する
    /// 音声のない単語では何もしない
    pub fn play(&mut self, file: &str) -> Result<(), AudioError> {
        let Some(path) = self.path_for(file) else {
            return Ok(());
        };
        let source = decode(path)?;

        self.stop();
        let stream = match self.output.take() {
            Some((stream, _old_sink)) => stream,
            None => {
                let mut stream = OutputStreamBuilder::open_default_stream()?;
                stream.log_on_drop(false);
                stream
            }
        };
        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);
        tracing::debug!("Playing {}", file);
        self.output = Some((stream, sink));
        Ok(())
    }

    /// 再生中なら止める
    pub fn stop(&mut self) {
        if let Some((_, sink)) = &self.output {
            sink.stop();
        }
    }
}

/// ファイルを開いてデコーダを作る (出力デバイスは不要)
fn decode(path: PathBuf) -> Result<Decoder<BufReader<File>>, AudioError> {
    if !path.exists() {
        return Err(AudioError::Missing(path));
    }
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(source) => return Err(AudioError::Io { path, source }),
    };
    Decoder::new(BufReader::new(file)).map_err(|source| AudioError::Decode { path, source })
}
