//! Hasher (C1): streaming content digests with case-insensitive hex
//! comparison, grounded in `ocfl::digest`'s `DigestAlgorithm`/`HexDigest`.

use std::cmp::Ordering;
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher as StdHasher};
use std::io::{self, Read};
use std::path::Path;

use blake2::Blake2b512;
use digest::{Digest as _, DynDigest};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

/// Hash algorithms the engine can compute and compare digests with. A single
/// process-wide default is selected at [`Hasher::new`]; additional
/// algorithms remain usable through [`Hasher::digest_bytes_with`] and
/// friends without changing the default.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Blake2b512,
}

impl DigestAlgorithm {
    fn new_impl(&self) -> Box<dyn DynDigest> {
        match self {
            DigestAlgorithm::Md5 => Box::new(Md5::new()),
            DigestAlgorithm::Sha1 => Box::new(Sha1::new()),
            DigestAlgorithm::Sha256 => Box::new(Sha256::new()),
            DigestAlgorithm::Sha512 => Box::new(Sha512::new()),
            DigestAlgorithm::Blake2b512 => Box::new(Blake2b512::new()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
            DigestAlgorithm::Blake2b512 => "blake2b512",
        };
        write!(f, "{name}")
    }
}

/// A hex-encoded content digest. Invariant (§3): the empty digest never
/// compares equal to any digest produced by an actual hash.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexDigest(String);

impl HexDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for HexDigest {
    fn from(bytes: Vec<u8>) -> Self {
        Self(hex::encode(bytes))
    }
}

impl From<&str> for HexDigest {
    fn from(value: &str) -> Self {
        Self(value.to_ascii_lowercase())
    }
}

impl From<String> for HexDigest {
    fn from(value: String) -> Self {
        Self(value.to_ascii_lowercase())
    }
}

impl fmt::Display for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for HexDigest {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Hash for HexDigest {
    fn hash<H: StdHasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl PartialOrd for HexDigest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HexDigest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.to_ascii_lowercase().cmp(&other.0.to_ascii_lowercase())
    }
}

/// A `Read` wrapper that feeds every byte it passes through into a digest.
struct DigestReader<R> {
    inner: R,
    digest: Box<dyn DynDigest>,
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.digest.update(&buf[..n]);
        }
        Ok(n)
    }
}

/// Computes content digests over byte streams or files without loading
/// entire files into memory, per §4.1.
#[derive(Debug, Copy, Clone)]
pub struct Hasher {
    default_algorithm: DigestAlgorithm,
}

impl Hasher {
    pub fn new(default_algorithm: DigestAlgorithm) -> Self {
        Self { default_algorithm }
    }

    pub fn default_algorithm(&self) -> DigestAlgorithm {
        self.default_algorithm
    }

    /// Digests an in-memory byte slice with the default algorithm.
    pub fn digest_bytes(&self, bytes: &[u8]) -> HexDigest {
        self.digest_bytes_with(self.default_algorithm, bytes)
    }

    pub fn digest_bytes_with(&self, algorithm: DigestAlgorithm, bytes: &[u8]) -> HexDigest {
        let mut digest = algorithm.new_impl();
        digest.update(bytes);
        HexDigest::from(digest.finalize().to_vec())
    }

    /// Digests a file by streaming it through a bounded buffer; never reads
    /// the whole file into memory. Returns an empty digest when the file is
    /// unreadable, matching §4.1's "sentinel invalid result" contract —
    /// callers upstream turn that into `IntegrityViolation`/`InternalError`.
    pub fn digest_file(&self, path: &Path) -> HexDigest {
        self.digest_file_with(self.default_algorithm, path)
    }

    pub fn digest_file_with(&self, algorithm: DigestAlgorithm, path: &Path) -> HexDigest {
        match File::open(path) {
            Ok(file) => self.digest_reader_with(algorithm, file).unwrap_or_else(|_| HexDigest::from(String::new())),
            Err(_) => HexDigest::from(String::new()),
        }
    }

    /// Digests any `Read` implementation by streaming through `io::copy`
    /// into `io::sink()`, per the teacher's `hash_hex`.
    pub fn digest_reader(&self, reader: impl Read) -> io::Result<HexDigest> {
        self.digest_reader_with(self.default_algorithm, reader)
    }

    pub fn digest_reader_with(&self, algorithm: DigestAlgorithm, reader: impl Read) -> io::Result<HexDigest> {
        let mut digest_reader = DigestReader {
            inner: reader,
            digest: algorithm.new_impl(),
        };
        io::copy(&mut digest_reader, &mut io::sink())?;
        Ok(HexDigest::from(digest_reader.digest.finalize().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sha256_known_answer() {
        let hasher = Hasher::new(DigestAlgorithm::Sha256);
        let digest = hasher.digest_bytes(b"abc");
        assert_eq!(
            digest.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hex_digest_comparison_is_case_insensitive() {
        let a = HexDigest::from("DEADBEEF");
        let b = HexDigest::from("deadbeef");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_digest_never_equals_real_digest() {
        let empty = HexDigest::from(String::new());
        let hasher = Hasher::new(DigestAlgorithm::Sha256);
        let real = hasher.digest_bytes(b"");
        assert_ne!(empty, real);
    }

    #[test]
    fn digest_file_streams_without_reading_whole_file_at_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![7u8; 4 * 1024 * 1024]).unwrap();
        let hasher = Hasher::new(DigestAlgorithm::Sha256);
        let digest = hasher.digest_file(file.path());
        assert!(!digest.is_empty());
    }

    #[test]
    fn digest_file_returns_empty_digest_when_unreadable() {
        let hasher = Hasher::new(DigestAlgorithm::Sha256);
        let digest = hasher.digest_file(Path::new("/nonexistent/path/for/patchline/tests"));
        assert!(digest.is_empty());
    }

    #[test]
    fn same_bytes_produce_deterministic_digest() {
        let hasher = Hasher::new(DigestAlgorithm::Sha256);
        let a = hasher.digest_bytes(b"hello world");
        let b = hasher.digest_bytes(b"hello world");
        assert_eq!(a, b);
    }
}
