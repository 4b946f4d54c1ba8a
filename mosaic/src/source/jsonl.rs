use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use super::{EpisodeSource, SourceError};
use crate::trajectory::RawEpisode;

/// One JSON-encoded [`RawEpisode`] per line. Blank lines are skipped.
#[derive(Debug)]
pub struct JsonlSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
}

impl JsonlSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let lines = Self::reader(&path)?;
        Ok(Self {
            path,
            lines,
            line: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(path: &Path) -> Result<Lines<BufReader<File>>, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(BufReader::new(file).lines())
    }
}

impl EpisodeSource for JsonlSource {
    fn next_episode(&mut self) -> Result<Option<RawEpisode>, SourceError> {
        for line in self.lines.by_ref() {
            self.line += 1;
            let line = line.map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let episode = serde_json::from_str(&line).map_err(|e| SourceError::Decode {
                path: self.path.clone(),
                line: self.line,
                message: e.to_string(),
            })?;
            return Ok(Some(episode));
        }
        Ok(None)
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.lines = Self::reader(&self.path)?;
        self.line = 0;
        Ok(())
    }
}
