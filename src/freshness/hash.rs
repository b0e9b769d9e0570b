//! Whole-file content fingerprints using blake3.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Convert to hex string (for debugging/display).
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 16 hex chars are enough to tell digests apart in logs
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Stream `path` through blake3 in fixed-size chunks.
///
/// Returns the digest and the number of bytes read, which can differ from a
/// prior `stat` when the file is being written concurrently.
pub fn hash_file(path: &Path) -> io::Result<(ContentHash, u64)> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
                total += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok((ContentHash::new(*hasher.finalize().as_bytes()), total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_display() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(format!("{}", hash), "abababababababab");
        assert_eq!(hash.to_hex().len(), 64);
    }

    #[test]
    fn test_hash_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        fs::write(&path, "hello world").unwrap();

        let (hash1, size) = hash_file(&path).unwrap();
        let (hash2, _) = hash_file(&path).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(size, 11);
        assert_eq!(hash1, ContentHash::new(*blake3::hash(b"hello world").as_bytes()));

        fs::write(&path, "goodbye world").unwrap();
        let (hash3, _) = hash_file(&path).unwrap();
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_hash_file_spanning_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        let (hash, size) = hash_file(&path).unwrap();
        assert_eq!(size, data.len() as u64);
        assert_eq!(hash, ContentHash::new(*blake3::hash(&data).as_bytes()));
    }

    #[test]
    fn test_hash_file_nonexistent() {
        assert!(hash_file(Path::new("/nonexistent/file.txt")).is_err());
    }
}
