use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use hyper::{Body, Client, HeaderMap, Method, Request, StatusCode, Uri};
use hyper_tls::HttpsConnector;
use percent_encoding::percent_decode_str;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::transport::auth::{Authenticator, NoAuthenticator};
use crate::transport::connection::HttpConnection;
use crate::transport::copy::copy;
use crate::transport::decoding::{decode_text, decoding_reader, read_truncated, ContentEncoding};
use crate::transport::listing::{list_directory, parse_directory_listing};
use crate::transport::progress::{CopyProgressListener, NopProgressListener, ProgressStream};
use crate::transport::url_info::{charset_of, UrlInfo};
use crate::transport::{file, RequestMethod, ResourceLister, ResourceTransport, TransportError};

pub const MAX_REDIRECTS: usize = 10;

/// how much of a PUT response body is kept for diagnostics, in bytes of the raw (decompressed
///  but not yet charset decoded) body
pub const ERROR_BODY_TRUNCATE_LEN: usize = 512;

const ACCEPT_VALUE: &str = "application/octet-stream, application/json, application/xml, */*";
const ACCEPT_ENCODING_VALUE: &str = "gzip,deflate";

/// Moves resources to and from HTTP(S) repositories, with `file:` URLs handled locally.
///
/// Instances share one connection pool, so keeping them alive has performance benefits.
///  Probes never fail, they report anything that goes wrong as an unavailable resource.
///  Transfers fail with a `TransportError` for every problem the server reports.
pub struct HttpTransport {
    client: Client<HttpsConnector<HttpConnector>>,
    user_agent: String,
    request_method: RequestMethod,
    timeout: Option<Duration>,
    authenticator: Arc<dyn Authenticator>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        HttpTransport::new()
    }
}

impl HttpTransport {
    pub fn new() -> HttpTransport {
        HttpTransport {
            client: Client::builder()
                .build::<_, Body>(HttpsConnector::new()),
            user_agent: default_user_agent(),
            request_method: RequestMethod::default(),
            timeout: None,
            authenticator: Arc::new(NoAuthenticator),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> HttpTransport {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_request_method(mut self, request_method: RequestMethod) -> HttpTransport {
        self.request_method = request_method;
        self
    }

    /// The timeout for operations that do not bring their own. Zero means no timeout of our
    ///  own, leaving it to the OS.
    pub fn with_timeout(mut self, timeout: Duration) -> HttpTransport {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> HttpTransport {
        self.authenticator = authenticator;
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn request_method(&self) -> RequestMethod {
        self.request_method
    }

    fn effective_timeout(&self, timeout: Option<Duration>) -> Option<Duration> {
        timeout.or(self.timeout)
            .filter(|t| !t.is_zero())
    }

    /// Checks whether a resource exists and fetches its metadata, issuing HEAD or GET as
    ///  configured.
    pub async fn probe(&self, url: &str, timeout: Option<Duration>) -> UrlInfo {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(e) => {
                debug!("not probing malformed URL {:?}: {}", url, e);
                return UrlInfo::UNAVAILABLE;
            }
        };

        if url.scheme() == "file" {
            return file::url_info(&url).await;
        }
        if !is_http(&url) {
            debug!("no way to probe {}", url);
            return UrlInfo::UNAVAILABLE;
        }

        let method = self.request_method.as_method();
        match self.connect(method, &url, Body::empty(), None, self.effective_timeout(timeout)).await {
            Ok(connection) => {
                let info = if check_status_code(connection.method(), connection.status(), &url) {
                    UrlInfo::available(
                        connection.content_length(),
                        connection.last_modified(),
                        charset_of(connection.content_type()),
                    )
                }
                else {
                    UrlInfo::UNAVAILABLE
                };
                connection.disconnect().await;
                info
            }
            Err(e) => {
                log_access_failure(&url, &e);
                UrlInfo::UNAVAILABLE
            }
        }
    }

    /// Fetches a resource into memory, undoing gzip / deflate content encoding.
    pub async fn open_stream(&self, url: &str, timeout: Option<Duration>) -> anyhow::Result<Bytes> {
        let url = parse_url(url)?;
        if url.scheme() == "file" {
            return file::read(&url).await;
        }
        ensure_http(&url, "reading")?;

        let timeout = self.effective_timeout(timeout);
        let mut connection = self.connect(Method::GET, &url, Body::empty(), None, timeout).await?;
        if !check_status_code(connection.method(), connection.status(), &url) {
            let status = connection.status();
            connection.disconnect().await;
            return Err(TransportError::NotSuccessful { url: url.to_string(), status: status.as_u16() }.into());
        }

        let encoding = connection.content_encoding();
        let mut content = Vec::new();
        let copied = copy(&mut decoding_reader(encoding, connection.body_reader()), &mut content, timeout, &NopProgressListener, None).await;
        release(connection, &copied).await;

        copied.with_context(|| format!("reading {}", url))?;
        Ok(Bytes::from(content))
    }

    /// Downloads a resource to `dest`, following redirects. The file is either complete or
    ///  absent afterwards: a failed or short transfer removes it.
    pub async fn download(&self, url: &str, dest: &Path, listener: Arc<dyn CopyProgressListener>, timeout: Option<Duration>) -> anyhow::Result<()> {
        let mut url = parse_url(url)?;
        if url.scheme() == "file" {
            return file::download(&url, dest, listener).await;
        }
        ensure_http(&url, "download")?;

        let timeout = self.effective_timeout(timeout);
        let mut redirects = 0;
        let mut connection = loop {
            let connection = self.connect(Method::GET, &url, Body::empty(), None, timeout).await?;
            if !is_redirect(connection.status()) {
                break connection;
            }

            if redirects == MAX_REDIRECTS {
                connection.disconnect().await;
                return Err(TransportError::TooManyRedirects { url: url.to_string(), max: MAX_REDIRECTS }.into());
            }
            redirects += 1;

            let target = redirect_target(&url, connection.location());
            connection.disconnect().await;
            url = target?;
            ensure_http(&url, "download")?;
            debug!("following redirect to {}", url);
        };

        if !check_status_code(connection.method(), connection.status(), &url) {
            let status = connection.status();
            connection.disconnect().await;
            return Err(TransportError::NotSuccessful { url: url.to_string(), status: status.as_u16() }.into());
        }

        let expected_length = connection.content_length();
        let encoding = connection.content_encoding();
        let last_modified = connection.last_modified();
        let total = match encoding {
            ContentEncoding::Identity => u64::try_from(expected_length).ok(),
            _ => None,
        };

        let mut target = File::create(dest).await?;
        let copied = copy(&mut decoding_reader(encoding, connection.body_reader()), &mut target, timeout, listener.as_ref(), total).await;
        release(connection, &copied).await;

        let checked = copied
            .with_context(|| format!("downloading {}", url))
            .and_then(|actual| check_length(&url, expected_length, actual, encoding != ContentEncoding::Identity));
        if let Err(e) = checked {
            drop(target);
            file::remove_incomplete(dest).await;
            return Err(e);
        }

        if let Some(last_modified) = last_modified {
            file::set_modified(target, last_modified.into()).await?;
        }
        Ok(())
    }

    /// Uploads a local file with PUT. Only HTTP(S) destinations are supported.
    pub async fn upload(&self, source: &Path, url: &str, listener: Arc<dyn CopyProgressListener>, timeout: Option<Duration>) -> anyhow::Result<()> {
        let url = parse_url(url)?;
        ensure_http(&url, "upload")?;

        let file = File::open(source).await?;
        let length = file.metadata().await?.len();
        let body = Body::wrap_stream(ProgressStream::new(ReaderStream::new(file), listener, Some(length)));

        let mut connection = self.connect(Method::PUT, &url, body, Some(length), self.effective_timeout(timeout)).await?;
        debug!("response headers for PUT {}:\n{}", url, headers_as_debug_string(connection.headers()));

        let charset = charset_of(connection.content_type());
        let encoding = connection.content_encoding();
        let message = read_truncated(decoding_reader(encoding, connection.body_reader()), ERROR_BODY_TRUNCATE_LEN, &charset).await;
        let status = connection.status();
        connection.disconnect().await;

        let message = message.unwrap_or_else(|e| {
            debug!("could not read response body for PUT {}: {}", url, e);
            String::new()
        });
        validate_put_status(&url, status, message)
    }

    async fn connect(&self, method: Method, url: &Url, body: Body, content_length: Option<u64>, timeout: Option<Duration>) -> anyhow::Result<HttpConnection> {
        self.authenticator.ensure_installed();

        let uri = Uri::try_from(url.as_str())
            .map_err(|e| TransportError::InvalidUrl { url: url.to_string(), reason: e.to_string() })?;

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(USER_AGENT, self.user_agent.as_str());
        if method == Method::PUT {
            builder = builder.header(CONTENT_TYPE, "application/octet-stream");
            if let Some(content_length) = content_length {
                builder = builder.header(CONTENT_LENGTH, content_length);
            }
        }
        else {
            builder = builder
                .header(ACCEPT_ENCODING, ACCEPT_ENCODING_VALUE)
                .header(ACCEPT, ACCEPT_VALUE);
        }
        let request = builder.body(body)?;

        trace!("{} {}", method, url);
        if method == Method::PUT {
            debug!("request headers for PUT {}:\n{}", url, headers_as_debug_string(request.headers()));
        }

        let response = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.client.request(request))
                .await
                .map_err(|_| TransportError::Timeout { url: url.to_string(), timeout })??,
            None => self.client.request(request).await?,
        };
        Ok(HttpConnection::new(method, response, timeout))
    }

    /// Lists the direct children of a directory URL, from the file system for `file:` URLs
    ///  and from the server's HTML index otherwise.
    pub async fn list(&self, parent: &str) -> anyhow::Result<Vec<String>> {
        let mut url = parse_url(parent)?;
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }

        if url.scheme() == "file" {
            let path = url.to_file_path()
                .map_err(|_| TransportError::InvalidUrl { url: url.to_string(), reason: "not a local file".to_string() })?;
            return list_directory(&path).await;
        }
        ensure_http(&url, "listing")?;

        let mut connection = self.connect(Method::GET, &url, Body::empty(), None, self.effective_timeout(None)).await?;
        if connection.status() != StatusCode::OK {
            debug!("no directory listing at {}: HTTP status {}", url, connection.status());
            connection.disconnect().await;
            return Ok(Vec::new());
        }

        let charset = charset_of(connection.content_type());
        let encoding = connection.content_encoding();
        let mut html = Vec::new();
        let copied = copy(&mut decoding_reader(encoding, connection.body_reader()), &mut html, self.effective_timeout(None), &NopProgressListener, None).await;
        release(connection, &copied).await;
        copied.with_context(|| format!("listing {}", url))?;

        Ok(parse_directory_listing(&url, &decode_text(&html, &charset)))
    }
}

#[async_trait]
impl ResourceTransport for HttpTransport {
    async fn probe(&self, location: &str) -> UrlInfo {
        HttpTransport::probe(self, location, None).await
    }
}

#[async_trait]
impl ResourceLister for HttpTransport {
    async fn list(&self, parent: &str) -> anyhow::Result<Vec<String>> {
        HttpTransport::list(self, parent).await
    }
}

/// A transfer that failed part way, e.g. on a stalled read, leaves a body that may never end.
///  Such a connection is closed instead of drained.
async fn release<T>(connection: HttpConnection, copied: &std::io::Result<T>) {
    match copied {
        Ok(_) => connection.disconnect().await,
        Err(_) => connection.abandon(),
    }
}

fn default_user_agent() -> String {
    format!("arti-resolver/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_url(url: &str) -> anyhow::Result<Url> {
    Url::parse(url)
        .map_err(|e| TransportError::InvalidUrl { url: url.to_string(), reason: e.to_string() }.into())
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

fn ensure_http(url: &Url, operation: &'static str) -> anyhow::Result<()> {
    if is_http(url) {
        Ok(())
    }
    else {
        Err(TransportError::UnsupportedScheme { url: url.to_string(), operation }.into())
    }
}

fn is_redirect(status: StatusCode) -> bool {
    status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND
}

/// resolves a (percent-encoded, possibly relative) Location header against the current URL
fn redirect_target(current: &Url, location: Option<&str>) -> anyhow::Result<Url> {
    let location = location
        .ok_or_else(|| TransportError::InvalidRedirect { url: current.to_string() })?;
    let decoded = percent_decode_str(location.trim())
        .decode_utf8()
        .map_err(|_| TransportError::InvalidRedirect { url: current.to_string() })?;

    current.join(&decoded)
        .map_err(|_| TransportError::InvalidRedirect { url: current.to_string() }.into())
}

/// Success is 200, and 204 for HEAD requests since some servers answer a HEAD that way.
///  Everything else is logged at a level matching how suspicious it is.
fn check_status_code(method: &Method, status: StatusCode, url: &Url) -> bool {
    if status == StatusCode::OK {
        return true;
    }
    if *method == Method::HEAD && status == StatusCode::NO_CONTENT {
        return true;
    }

    if status == StatusCode::PROXY_AUTHENTICATION_REQUIRED {
        warn!("Your proxy requires authentication. url={}", url);
    }
    else if status.is_client_error() {
        debug!("HTTP response status: {} url={}", status, url);
    }
    else if status.is_server_error() {
        error!("Server error: {} url={}", status, url);
    }
    else {
        debug!("HTTP response status: {} url={}", status, url);
    }
    false
}

fn is_dns_failure(e: &anyhow::Error) -> bool {
    e.chain()
        .any(|cause| cause.to_string().contains("dns error"))
}

fn log_access_failure(url: &Url, e: &anyhow::Error) {
    if is_dns_failure(e) {
        warn!("Host {} not found. url={}", url.host_str().unwrap_or(""), url);
        info!("You probably access the destination server through a proxy server that is not well configured.");
    }
    else {
        error!("Server access error at url {}: {:#}", url, e);
    }
}

/// Verifies the transferred byte count. Content-encoded transfers are exempt since the
///  advertised length is that of the encoded body.
fn check_length(url: &Url, expected: i64, actual: u64, encoded: bool) -> anyhow::Result<()> {
    if encoded {
        return Ok(());
    }
    match u64::try_from(expected) {
        Ok(expected) if expected != actual => {
            Err(TransportError::LengthMismatch { url: url.to_string(), expected, actual }.into())
        }
        _ => Ok(()),
    }
}

fn validate_put_status(url: &Url, status: StatusCode, message: String) -> anyhow::Result<()> {
    match status.as_u16() {
        200 | 201 | 202 | 204 => Ok(()),
        401 | 403 => Err(TransportError::AccessRefused { url: url.to_string(), message }.into()),
        status => Err(TransportError::PutFailed { url: url.to_string(), status, message }.into()),
    }
}

fn headers_as_debug_string(headers: &HeaderMap) -> String {
    headers.iter()
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join("\n")
}


#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_compression::tokio::bufread::GzipEncoder;
    use axum::http::header::{CONTENT_ENCODING, LAST_MODIFIED, LOCATION};
    use axum::response::IntoResponse;
    use axum::routing::{any, get, put};
    use axum::Router;
    use chrono::{DateTime, Utc};
    use tokio::io::AsyncReadExt;

    use crate::transport::auth::OnceAuthenticator;
    use crate::transport::progress::test::RecordingListener;
    use crate::transport::test_server::{serve, serve_raw, serve_stalled};
    use super::*;

    const LAST_MODIFIED_VALUE: &str = "Wed, 21 Oct 2015 07:28:00 GMT";
    const LAST_MODIFIED_SECS: i64 = 1445412480;

    fn url(addr: std::net::SocketAddr, path: &str) -> String {
        format!("http://{}{}", addr, path)
    }

    fn transport_error(e: &anyhow::Error) -> &TransportError {
        e.downcast_ref::<TransportError>().unwrap()
    }

    #[tokio::test]
    async fn test_probe_with_get() {
        let addr = serve(|_| Router::new()
            .route("/mod.jar", get(|| async {
                ([(CONTENT_TYPE, "text/plain; charset=UTF-8"), (LAST_MODIFIED, LAST_MODIFIED_VALUE)], "0123456789")
            })));
        let transport = HttpTransport::new().with_request_method(RequestMethod::Get);

        let info = transport.probe(&url(addr, "/mod.jar"), None).await;
        assert!(info.is_available());
        assert_eq!(info.content_length(), 10);
        assert_eq!(info.last_modified().map(|d| d.timestamp()), Some(LAST_MODIFIED_SECS));
        assert_eq!(info.body_charset(), Some("UTF-8"));
    }

    #[tokio::test]
    async fn test_probe_defaults_charset() {
        let addr = serve(|_| Router::new()
            .route("/ivy.xml", get(|| async { b"<ivy-module/>".to_vec() })));

        let info = HttpTransport::new().probe(&url(addr, "/ivy.xml"), None).await;
        assert!(info.is_available());
        assert_eq!(info.body_charset(), Some("ISO-8859-1"));
    }

    #[tokio::test]
    async fn test_probe_no_content() {
        let addr = serve(|_| Router::new()
            .route("/empty", any(|| async { StatusCode::NO_CONTENT })));

        let head = HttpTransport::new().with_request_method(RequestMethod::Head);
        assert!(head.probe(&url(addr, "/empty"), None).await.is_available());

        let get = HttpTransport::new().with_request_method(RequestMethod::Get);
        assert_eq!(get.probe(&url(addr, "/empty"), None).await, UrlInfo::UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_probe_unavailable() {
        let addr = serve(|_| Router::new()
            .route("/proxy", any(|| async { StatusCode::PROXY_AUTHENTICATION_REQUIRED }))
            .route("/broken", any(|| async { StatusCode::INTERNAL_SERVER_ERROR })));
        let transport = HttpTransport::new();

        assert_eq!(transport.probe(&url(addr, "/missing"), None).await, UrlInfo::UNAVAILABLE);
        assert_eq!(transport.probe(&url(addr, "/proxy"), None).await, UrlInfo::UNAVAILABLE);
        assert_eq!(transport.probe(&url(addr, "/broken"), None).await, UrlInfo::UNAVAILABLE);
        assert_eq!(transport.probe("not a url", None).await, UrlInfo::UNAVAILABLE);

        let closed = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        assert_eq!(transport.probe(&url(closed, "/x"), None).await, UrlInfo::UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_probe_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ivy.xml");
        std::fs::write(&path, "<ivy-module/>").unwrap();

        let info = HttpTransport::new().probe(Url::from_file_path(&path).unwrap().as_str(), None).await;
        assert!(info.is_available());
        assert_eq!(info.content_length(), 13);
    }

    #[tokio::test]
    async fn test_open_stream_decodes_gzip() {
        let mut encoded = Vec::new();
        GzipEncoder::new(&b"decoded content"[..]).read_to_end(&mut encoded).await.unwrap();

        let addr = serve(move |_| Router::new()
            .route("/data", get(move || {
                let encoded = encoded.clone();
                async move { ([(CONTENT_ENCODING, "gzip")], encoded) }
            })));

        let content = HttpTransport::new().open_stream(&url(addr, "/data"), None).await.unwrap();
        assert_eq!(content, Bytes::from_static(b"decoded content"));
    }

    #[tokio::test]
    async fn test_open_stream_not_successful() {
        let addr = serve(|_| Router::new()
            .route("/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") })));

        let e = HttpTransport::new().open_stream(&url(addr, "/broken"), None).await.unwrap_err();
        assert!(matches!(transport_error(&e), TransportError::NotSuccessful { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_open_stream_timeout() {
        let addr = serve(|_| Router::new()
            .route("/slow", get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "too late"
            })));

        let e = HttpTransport::new().open_stream(&url(addr, "/slow"), Some(Duration::from_millis(100))).await.unwrap_err();
        assert!(matches!(transport_error(&e), TransportError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_download_follows_redirect() {
        let addr = serve(|addr| Router::new()
            .route("/start", get(move || async move {
                (StatusCode::FOUND, [(LOCATION, format!("http://{}/real", addr))])
            }))
            .route("/relative", get(|| async {
                (StatusCode::MOVED_PERMANENTLY, [(LOCATION, "/start")])
            }))
            .route("/real", get(|| async { "the real content" })));
        let dir = tempfile::tempdir().unwrap();
        let transport = HttpTransport::new();

        let dest = dir.path().join("downloaded");
        transport.download(&url(addr, "/start"), &dest, Arc::new(NopProgressListener), None).await.unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "the real content");

        let dest = dir.path().join("downloaded-twice");
        transport.download(&url(addr, "/relative"), &dest, Arc::new(NopProgressListener), None).await.unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "the real content");
    }

    #[tokio::test]
    async fn test_download_redirect_loop() {
        let addr = serve(|_| Router::new()
            .route("/loop", get(|| async { (StatusCode::FOUND, [(LOCATION, "/loop")]) })));
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("never");

        let e = HttpTransport::new().download(&url(addr, "/loop"), &dest, Arc::new(NopProgressListener), None).await.unwrap_err();
        assert!(matches!(transport_error(&e), TransportError::TooManyRedirects { max: MAX_REDIRECTS, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_short_body_leaves_no_file() {
        let mut response = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(&[b'x'; 90]);
        let addr = serve_raw(response).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("short.jar");

        let e = HttpTransport::new().download(&url(addr, "/short.jar"), &dest, Arc::new(NopProgressListener), None).await.unwrap_err();
        // the body ends before the announced length, which fails the read itself
        assert!(e.downcast_ref::<std::io::Error>().is_some());
        assert!(e.downcast_ref::<TransportError>().is_none());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_length_mismatch_leaves_no_file() {
        // not chunked and read until the connection closes, but still announcing a length
        let mut response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: identity\r\nContent-Length: 100\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(&[b'x'; 90]);
        let addr = serve_raw(response).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("mismatch.jar");

        let e = HttpTransport::new().download(&url(addr, "/mismatch.jar"), &dest, Arc::new(NopProgressListener), None).await.unwrap_err();
        assert!(matches!(transport_error(&e), TransportError::LengthMismatch { expected: 100, actual: 90, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_from_stalled_server_times_out() {
        let mut response = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n".to_vec();
        response.extend_from_slice(&[b'x'; 10]);
        let addr = serve_stalled(response, Duration::from_secs(5)).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("stalled.jar");

        let started = std::time::Instant::now();
        let e = HttpTransport::new().download(&url(addr, "/stalled.jar"), &dest, Arc::new(NopProgressListener), Some(Duration::from_millis(200))).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
        assert_eq!(e.downcast_ref::<std::io::Error>().map(|e| e.kind()), Some(std::io::ErrorKind::TimedOut));
        assert!(!dest.exists());

        let started = std::time::Instant::now();
        assert!(HttpTransport::new().open_stream(&url(addr, "/stalled.jar"), Some(Duration::from_millis(200))).await.is_err());
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn test_download_sets_modification_time() {
        let addr = serve(|_| Router::new()
            .route("/mod.jar", get(|| async { ([(LAST_MODIFIED, LAST_MODIFIED_VALUE)], "jar content") })));
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("mod.jar");
        let listener = Arc::new(RecordingListener::default());

        HttpTransport::new().download(&url(addr, "/mod.jar"), &dest, listener.clone(), None).await.unwrap();

        let modified: DateTime<Utc> = std::fs::metadata(&dest).unwrap().modified().unwrap().into();
        assert_eq!(modified.timestamp(), LAST_MODIFIED_SECS);
        assert_eq!(listener.events.lock().unwrap().first().map(String::as_str), Some("start Some(11)"));
        assert_eq!(listener.events.lock().unwrap().last().map(String::as_str), Some("end 11"));
    }

    #[tokio::test]
    async fn test_download_not_found() {
        let addr = serve(|_| Router::new());
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.jar");

        let e = HttpTransport::new().download(&url(addr, "/missing.jar"), &dest, Arc::new(NopProgressListener), None).await.unwrap_err();
        assert!(matches!(transport_error(&e), TransportError::NotSuccessful { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_check_length() {
        let url = Url::parse("http://repo.example/a.jar").unwrap();

        assert!(check_length(&url, 100, 100, false).is_ok());
        assert!(check_length(&url, -1, 90, false).is_ok());
        assert!(check_length(&url, 100, 90, true).is_ok());

        let e = check_length(&url, 100, 90, false).unwrap_err();
        assert!(matches!(transport_error(&e), TransportError::LengthMismatch { expected: 100, actual: 90, .. }));
    }

    #[tokio::test]
    async fn test_upload() {
        let received: Arc<Mutex<Option<(Option<String>, Bytes)>>> = Arc::new(Mutex::new(None));
        let addr = {
            let received = received.clone();
            serve(move |_| Router::new()
                .route("/repo/mod.jar", put(move |headers: HeaderMap, body: Bytes| {
                    let received = received.clone();
                    async move {
                        let length = headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()).map(str::to_string);
                        *received.lock().unwrap() = Some((length, body));
                        StatusCode::CREATED
                    }
                })))
        };
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("mod.jar");
        std::fs::write(&source, "jar content").unwrap();
        let listener = Arc::new(RecordingListener::default());

        HttpTransport::new().upload(&source, &url(addr, "/repo/mod.jar"), listener.clone(), None).await.unwrap();

        let (length, body) = received.lock().unwrap().take().unwrap();
        assert_eq!(length.as_deref(), Some("11"));
        assert_eq!(body, Bytes::from_static(b"jar content"));
        assert_eq!(listener.events.lock().unwrap().last().map(String::as_str), Some("end 11"));
    }

    #[tokio::test]
    async fn test_upload_refused() {
        let addr = serve(|_| Router::new()
            .route("/repo/mod.jar", put(|| async { (StatusCode::FORBIDDEN, "no write access").into_response() }))
            .route("/repo/full.jar", put(|| async { (StatusCode::INSUFFICIENT_STORAGE, "x".repeat(2000)) })));
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("mod.jar");
        std::fs::write(&source, "jar content").unwrap();
        let transport = HttpTransport::new();

        let e = transport.upload(&source, &url(addr, "/repo/mod.jar"), Arc::new(NopProgressListener), None).await.unwrap_err();
        match transport_error(&e) {
            TransportError::AccessRefused { message, .. } => assert_eq!(message, "no write access"),
            other => panic!("unexpected error {:?}", other),
        }

        let e = transport.upload(&source, &url(addr, "/repo/full.jar"), Arc::new(NopProgressListener), None).await.unwrap_err();
        match transport_error(&e) {
            TransportError::PutFailed { status, message, .. } => {
                assert_eq!(*status, 507);
                assert_eq!(message.len(), ERROR_BODY_TRUNCATE_LEN);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_unsupported_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("mod.jar");
        std::fs::write(&source, "jar content").unwrap();
        let dest = Url::from_file_path(dir.path().join("copy.jar")).unwrap();

        let e = HttpTransport::new().upload(&source, dest.as_str(), Arc::new(NopProgressListener), None).await.unwrap_err();
        assert!(matches!(transport_error(&e), TransportError::UnsupportedScheme { operation: "upload", .. }));
    }

    #[tokio::test]
    async fn test_authenticator_installed_before_access() {
        let addr = serve(|_| Router::new()
            .route("/a", get(|| async { "a" })));
        let count = Arc::new(AtomicUsize::new(0));
        let authenticator = {
            let count = count.clone();
            Arc::new(OnceAuthenticator::new(move || { count.fetch_add(1, Ordering::SeqCst); }))
        };
        let transport = HttpTransport::new().with_authenticator(authenticator);

        assert!(transport.probe(&url(addr, "/a"), None).await.is_available());
        assert!(transport.open_stream(&url(addr, "/a"), None).await.is_ok());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_list_http_directory() {
        let addr = serve(|_| Router::new()
            .route("/repo/org/mod/", get(|| async {
                ([(CONTENT_TYPE, "text/html")], r#"<a href="../">..</a> <a href="1.0/">1.0/</a> <a href="1.1/">1.1/</a>"#)
            })));

        let transport = HttpTransport::new();
        assert_eq!(transport.list(&url(addr, "/repo/org/mod")).await.unwrap(), vec!["1.0", "1.1"]);
        assert!(transport.list(&url(addr, "/repo/other")).await.unwrap().is_empty());
    }

    #[test]
    fn test_redirect_target() {
        let current = Url::parse("http://repo.example/a/b.jar").unwrap();

        assert_eq!(redirect_target(&current, Some("http://mirror.example/b.jar")).unwrap().as_str(), "http://mirror.example/b.jar");
        assert_eq!(redirect_target(&current, Some("/c/b%2Djar")).unwrap().as_str(), "http://repo.example/c/b-jar");
        assert_eq!(redirect_target(&current, Some("d.jar")).unwrap().as_str(), "http://repo.example/a/d.jar");
        assert!(redirect_target(&current, None).is_err());
    }
}
