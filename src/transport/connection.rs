use std::io;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures_core::Stream;
use hyper::body::HttpBody;
use hyper::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED, LOCATION};
use hyper::{Body, HeaderMap, Method, Response, StatusCode};
use tokio_util::io::StreamReader;
use tracing::{debug, trace};

use crate::transport::decoding::ContentEncoding;

/// how long a background task keeps draining an abandoned body when the exchange has no
///  timeout of its own
pub const BACKGROUND_DRAIN_LIMIT: Duration = Duration::from_secs(30);

/// An HTTP exchange whose response head has arrived. The connection behind it is exclusively
///  owned by this value.
///
/// A response body that is left unread keeps the connection from going back to the keep-alive
///  pool, so the body must be drained before the connection is released. `disconnect` does
///  that; dropping an undrained connection hands the draining off to a background task, so
///  early returns and panics can not leak it either. HEAD responses have no body and are never
///  drained.
///
/// Draining is bounded by the exchange's timeout. A body that does not end in time is dropped,
///  which closes the connection instead of returning it to the pool.
pub struct HttpConnection {
    method: Method,
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
    drain_timeout: Option<Duration>,
    released: bool,
}
impl HttpConnection {
    pub fn new(method: Method, response: Response<Body>, drain_timeout: Option<Duration>) -> HttpConnection {
        let (parts, body) = response.into_parts();
        HttpConnection {
            method,
            status: parts.status,
            headers: parts.headers,
            body,
            drain_timeout,
            released: false,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn header(&self, name: hyper::header::HeaderName) -> Option<&str> {
        self.headers.get(name)
            .and_then(|v| v.to_str().ok())
    }

    /// -1 if the server did not say
    pub fn content_length(&self) -> i64 {
        self.header(CONTENT_LENGTH)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(-1)
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.header(LAST_MODIFIED)
            .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    /// the raw Content-Encoding header
    pub fn content_encoding_header(&self) -> Option<&str> {
        self.header(CONTENT_ENCODING)
    }

    pub fn content_encoding(&self) -> ContentEncoding {
        ContentEncoding::from_header(self.content_encoding_header())
    }

    pub fn location(&self) -> Option<&str> {
        self.header(LOCATION)
    }

    /// The undecoded body. Reading stops wherever the caller stops, `disconnect` drains the
    ///  rest.
    pub fn body_reader(&mut self) -> StreamReader<impl Stream<Item = io::Result<Bytes>> + Unpin + Send + '_, Bytes> {
        StreamReader::new((&mut self.body)
            .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e))))
    }

    /// Drains whatever is left of the body and releases the connection.
    pub async fn disconnect(mut self) {
        self.released = true;
        if self.method != Method::HEAD {
            drain(&mut self.body, self.drain_timeout).await;
        }
    }

    /// Gives up on the exchange without reading any further, e.g. after a failed transfer. The
    ///  connection is closed rather than reused.
    pub fn abandon(mut self) {
        self.released = true;
        trace!("abandoning {} response body, closing the connection", self.method);
    }
}

impl Drop for HttpConnection {
    fn drop(&mut self) {
        if self.released || self.method == Method::HEAD {
            return;
        }

        let mut body = std::mem::take(&mut self.body);
        if body.is_end_stream() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                trace!("draining abandoned response body in the background");
                let limit = self.drain_timeout.unwrap_or(BACKGROUND_DRAIN_LIMIT);
                handle.spawn(async move { drain(&mut body, Some(limit)).await });
            }
            Err(_) => {
                // no runtime to drain on: dropping the body closes the connection instead of
                //  returning it to the pool
            }
        }
    }
}

/// reads and discards a body; errors just mean there is nothing left to read
async fn drain(body: &mut Body, timeout: Option<Duration>) {
    let read_all = async {
        while let Some(chunk) = body.data().await {
            if chunk.is_err() {
                break;
            }
        }
    };
    match timeout {
        Some(timeout) => {
            if tokio::time::timeout(timeout, read_all).await.is_err() {
                debug!("response body not drained within {:?}, closing the connection", timeout);
            }
        }
        None => read_all.await,
    }
}
