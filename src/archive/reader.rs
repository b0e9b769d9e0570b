//! Read side of the audit log: tail, follow and search across generations.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use regex::Regex;

use super::rotate::generation_path;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMatch {
    pub file: PathBuf,
    pub line: String,
}

/// Retained generations of `base`, oldest first. A slot may be plain or gzip.
pub fn generations(base: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for index in 0.. {
        let plain = generation_path(base, index, false);
        let gz = generation_path(base, index, true);
        match (plain.exists(), gz.exists()) {
            (false, false) => break,
            (true, _) => found.push(plain),
            (false, true) => found.push(gz),
        }
    }
    found.reverse();
    found
}

fn open_lines(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Last `n` lines of `path`.
pub fn tail_lines(path: &Path, n: usize) -> io::Result<Vec<String>> {
    let mut ring = VecDeque::with_capacity(n.min(4096));
    if n == 0 {
        return Ok(Vec::new());
    }
    for line in open_lines(path)?.lines() {
        if ring.len() == n {
            ring.pop_front();
        }
        ring.push_back(line?);
    }
    Ok(ring.into())
}

/// Lines appended to `path` since `offset`. A file shorter than `offset` was
/// rotated, so reading restarts from its beginning.
pub fn read_new(path: &Path, offset: &mut u64) -> io::Result<Vec<String>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len < *offset {
        *offset = 0;
    }
    if len == *offset {
        return Ok(Vec::new());
    }

    file.seek(SeekFrom::Start(*offset))?;
    let mut chunk = String::new();
    file.take(len - *offset).read_to_string(&mut chunk)?;

    // Hold back a trailing partial line until it is complete
    let complete = chunk.rfind('\n').map_or(0, |i| i + 1);
    *offset += complete as u64;
    Ok(chunk[..complete].lines().map(str::to_owned).collect())
}

/// Every line matching `pattern` in the retained generations and the current
/// file, oldest first.
pub fn search(base: &Path, pattern: &Regex) -> io::Result<Vec<LogMatch>> {
    let mut files = generations(base);
    if base.exists() {
        files.push(base.to_path_buf());
    }

    let mut matches = Vec::new();
    for file in files {
        for line in open_lines(&file)?.lines() {
            let line = line?;
            if pattern.is_match(&line) {
                matches.push(LogMatch {
                    file: file.clone(),
                    line,
                });
            }
        }
    }
    Ok(matches)
}
