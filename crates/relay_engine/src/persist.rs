use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use relay_core::WeatherTokens;
use relay_logging::{relay_debug, relay_warn};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("work directory missing or not writable: {0}")]
    WorkDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the work directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::WorkDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::WorkDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::WorkDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Appends one line, creating the file if needed.
    pub fn append_line(&self, filename: &str, line: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut file = OpenOptions::new().create(true).append(true).open(&target)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(target)
    }
}

/// `{id}.{extension}` with path separators and other characters that are
/// unsafe in file names replaced by `_`.
pub fn state_filename(id: &str, extension: &str) -> String {
    let cleaned: String = id
        .trim()
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let stem = if cleaned.is_empty() { "station" } else { cleaned };
    format!("{stem}.{extension}")
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

/// Per-station state in the work directory.
///
/// `{pws_id}.ts` and `{cwop_id}.obs` are overwritten whole; `{cwop_id}.pkt`
/// and `{cwop_id}.log` only ever grow.
pub struct StationStore {
    dir: PathBuf,
    writer: AtomicFileWriter,
}

impl StationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            writer: AtomicFileWriter::new(dir.clone()),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn last_observed_at(&self, pws_id: &str) -> Result<Option<i64>, PersistError> {
        let filename = state_filename(pws_id, "ts");
        let Some(text) = self.read(&filename)? else {
            return Ok(None);
        };
        match text.trim().parse::<i64>() {
            Ok(ts) => Ok(Some(ts)),
            Err(err) => {
                relay_warn!(
                    "Ignoring unreadable timestamp in {:?}: {}",
                    self.dir.join(&filename),
                    err
                );
                Ok(None)
            }
        }
    }

    pub fn record_observed_at(&self, pws_id: &str, observed_at: i64) -> Result<PathBuf, PersistError> {
        let path = self
            .writer
            .write(&state_filename(pws_id, "ts"), &observed_at.to_string())?;
        relay_debug!("Recorded observation time {} in {:?}", observed_at, path);
        Ok(path)
    }

    pub fn last_encoded_fields(&self, cwop_id: &str) -> Result<Option<String>, PersistError> {
        self.read(&state_filename(cwop_id, "obs"))
    }

    pub fn record_encoded_fields(&self, cwop_id: &str, fields: &str) -> Result<PathBuf, PersistError> {
        self.writer.write(&state_filename(cwop_id, "obs"), fields)
    }

    pub fn append_packet(&self, cwop_id: &str, packet: &str) -> Result<PathBuf, PersistError> {
        self.writer.append_line(&state_filename(cwop_id, "pkt"), packet)
    }

    /// One line: transmit time as `DDHHMMz`, then every token space separated.
    pub fn append_observation(
        &self,
        cwop_id: &str,
        sent_at: DateTime<Utc>,
        tokens: &WeatherTokens,
    ) -> Result<PathBuf, PersistError> {
        let mut line = sent_at.format("%d%H%Mz").to_string();
        for token in tokens.as_array() {
            line.push(' ');
            line.push_str(token);
        }
        self.writer.append_line(&state_filename(cwop_id, "log"), &line)
    }

    fn read(&self, filename: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.dir.join(filename)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
