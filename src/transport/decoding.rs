use async_compression::tokio::bufread::{GzipDecoder, ZlibDecoder};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt};

/// The Content-Encoding values the transport can undo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentEncoding {
    /// no encoding, or one we pass through as is
    Identity,
    Gzip,
    Deflate,
}
impl ContentEncoding {
    pub fn from_header(value: Option<&str>) -> ContentEncoding {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("gzip") | Some("x-gzip") => ContentEncoding::Gzip,
            Some("deflate") => ContentEncoding::Deflate,
            _ => ContentEncoding::Identity,
        }
    }
}

/// wraps a raw body reader so that reading yields the decoded content
pub fn decoding_reader<'a, R>(encoding: ContentEncoding, reader: R) -> Box<dyn AsyncRead + Unpin + Send + 'a>
where R: AsyncBufRead + Unpin + Send + 'a
{
    match encoding {
        ContentEncoding::Identity => Box::new(reader),
        ContentEncoding::Gzip => Box::new(GzipDecoder::new(reader)),
        ContentEncoding::Deflate => Box::new(ZlibDecoder::new(reader)),
    }
}

/// Decodes text in the given charset. Only the charsets that matter for diagnostics are
///  handled exactly, everything else is read as lossy UTF-8.
pub fn decode_text(bytes: &[u8], charset: &str) -> String {
    let charset = charset.to_ascii_lowercase();
    match charset.as_str() {
        "iso-8859-1" | "latin1" | "iso8859-1" | "us-ascii" | "ascii" => {
            // every byte is the code point of the same value
            bytes.iter().map(|&b| b as char).collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Reads at most `max_len` bytes and decodes them as text. The limit applies to the raw bytes,
///  so the resulting string can be longer than `max_len` bytes when the charset maps single
///  bytes to multi-byte UTF-8. Whatever remains in `reader` is left for the caller to drain.
pub async fn read_truncated<R>(reader: R, max_len: usize, charset: &str) -> std::io::Result<String>
where R: AsyncRead + Unpin
{
    let mut buf = Vec::with_capacity(max_len);
    reader.take(max_len as u64)
        .read_to_end(&mut buf)
        .await?;
    Ok(decode_text(&buf, charset))
}
