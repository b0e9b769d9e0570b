//! Generation shifting and gzip compression.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::ArchivePolicy;

/// `<base>.<index>` or `<base>.<index>.gz`.
pub fn generation_path(base: &Path, index: usize, compressed: bool) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!(".{index}"));
    if compressed {
        name.push(".gz");
    }
    PathBuf::from(name)
}

/// Drop the oldest generation, shift the rest down by one and move the
/// current file into slot 0.
pub(super) fn shift_generations(base: &Path, policy: &ArchivePolicy) -> io::Result<()> {
    let max = policy.max_files.max(1);

    for compressed in [false, true] {
        remove_if_exists(&generation_path(base, max - 1, compressed))?;
    }

    for index in (0..max - 1).rev() {
        for compressed in [false, true] {
            let from = generation_path(base, index, compressed);
            if from.exists() {
                fs::rename(&from, generation_path(base, index + 1, compressed))?;
            }
        }
    }

    let newest = generation_path(base, 0, false);
    fs::rename(base, &newest)?;

    if policy.compress {
        let gz = generation_path(base, 0, true);
        match compress(&newest, &gz) {
            Ok(()) => fs::remove_file(&newest)?,
            Err(e) => {
                // Keep the plain generation rather than lose it
                crate::log!("warn"; "compressing {} failed: {}", newest.display(), e);
                let _ = fs::remove_file(&gz);
            }
        }
    }
    Ok(())
}

fn compress(src: &Path, dst: &Path) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(src)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(dst)?), Compression::best());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.into_inner().map_err(|e| e.into_error())?.sync_all()
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
