use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::transport::progress::CopyProgressListener;

pub const BUFFER_SIZE: usize = 64 * 1024;

/// Copies `reader` to `writer` until end of input, returning the number of bytes copied. A
///  single read that takes longer than `read_timeout` fails the copy with `TimedOut`.
pub async fn copy<R, W>(
    reader: &mut R,
    writer: &mut W,
    read_timeout: Option<Duration>,
    listener: &dyn CopyProgressListener,
    total: Option<u64>,
) -> io::Result<u64>
where R: AsyncRead + Unpin + ?Sized,
      W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut copied = 0u64;

    listener.start(total);
    loop {
        let read = match read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, reader.read(&mut buffer))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, format!("no data received for {:?}", timeout)))??,
            None => reader.read(&mut buffer).await?,
        };
        if read == 0 {
            break;
        }

        writer.write_all(&buffer[..read]).await?;
        copied += read as u64;
        listener.progress(copied, total);
    }
    writer.flush().await?;
    listener.end(copied);

    Ok(copied)
}
