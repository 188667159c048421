use std::path::Path;

use sha1::{Digest, Sha1};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

use crate::transport::copy::BUFFER_SIZE;
use crate::transport::decoding::decode_text;
use crate::transport::http::HttpTransport;
use crate::transport::TransportError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha1,
    Md5,
}
impl ChecksumAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Md5 => "md5",
        }
    }

    /// the suffix a repository appends to an artifact's location for the checksum file
    pub fn extension(&self) -> &'static str {
        self.name()
    }

    /// lower case hex digest of a file's content
    pub async fn digest_file(&self, path: &Path) -> anyhow::Result<String> {
        let mut file = File::open(path).await?;
        let mut buffer = vec![0u8; BUFFER_SIZE];

        let mut hasher = Hasher::new(*self);
        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(hasher.finalize())
    }
}

enum Hasher {
    Sha1(Sha1),
    Md5(md5::Context),
}
impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Hasher {
        match algorithm {
            ChecksumAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            ChecksumAlgorithm::Md5 => Hasher::Md5(md5::Context::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha1(hasher) => hasher.update(data),
            Hasher::Md5(context) => context.consume(data),
        }
    }

    fn finalize(self) -> String {
        match self {
            Hasher::Sha1(hasher) => hex::encode(hasher.finalize()),
            Hasher::Md5(context) => hex::encode(context.compute().0),
        }
    }
}

/// Extracts the hex digest from a checksum file. Most repositories store just the digest,
///  optionally followed by the file name; BSD style `MD5 (file) = digest` is understood too.
pub fn parse_checksum_file(content: &str) -> Option<String> {
    let line = content.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())?;

    let candidate = match line.rsplit_once(" = ") {
        Some((_, digest)) => digest.trim(),
        None => line.split_whitespace().next()?,
    };

    let candidate = candidate.to_ascii_lowercase();
    if candidate.is_empty() || hex::decode(&candidate).is_err() {
        return None;
    }
    Some(candidate)
}

/// Checks a downloaded file against the checksum the repository publishes next to it.
///  Returns `false` if there is no checksum to check against. On a mismatch the file is
///  deleted.
pub async fn verify_checksum(transport: &HttpTransport, url: &str, file: &Path, algorithm: ChecksumAlgorithm) -> anyhow::Result<bool> {
    let checksum_url = format!("{}.{}", url, algorithm.extension());
    if !transport.probe(&checksum_url, None).await.is_available() {
        debug!("no {} checksum for {}", algorithm.name(), url);
        return Ok(false);
    }

    let content = transport.open_stream(&checksum_url, None).await?;
    let expected = parse_checksum_file(&decode_text(&content, "UTF-8"));
    let actual = algorithm.digest_file(file).await?;
    trace!("validating {} checksum of {}", algorithm.name(), file.display());

    match expected {
        Some(expected) if expected == actual => Ok(true),
        expected => {
            tokio::fs::remove_file(file).await?;
            Err(TransportError::ChecksumMismatch {
                url: url.to_string(),
                algorithm: algorithm.name(),
                expected: expected.unwrap_or_default(),
                actual,
            }.into())
        }
    }
}
