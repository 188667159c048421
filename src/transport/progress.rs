use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::{ready, Stream};
use pin_project_lite::pin_project;

/// Observes byte counts while a transfer is running. Listeners must not influence the
///  transfer itself.
pub trait CopyProgressListener: Send + Sync {
    fn start(&self, _total: Option<u64>) {}

    fn progress(&self, transferred: u64, total: Option<u64>);

    fn end(&self, _transferred: u64) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NopProgressListener;

impl CopyProgressListener for NopProgressListener {
    fn progress(&self, _transferred: u64, _total: Option<u64>) {
        // ignore
    }
}

pin_project! {
    /// Passes a byte stream through unchanged, reporting every chunk to a progress listener.
    ///  Used for request bodies, which are polled by hyper rather than by our own copy loop.
    pub struct ProgressStream<S> {
        #[pin]
        inner: S,
        listener: Arc<dyn CopyProgressListener>,
        total: Option<u64>,
        transferred: u64,
        started: bool,
    }
}
impl <S> ProgressStream<S> {
    pub fn new(inner: S, listener: Arc<dyn CopyProgressListener>, total: Option<u64>) -> ProgressStream<S> {
        ProgressStream {
            inner,
            listener,
            total,
            transferred: 0,
            started: false,
        }
    }
}

impl <S, E> Stream for ProgressStream<S>
where S: Stream<Item = Result<Bytes, E>>
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if !*this.started {
            *this.started = true;
            this.listener.start(*this.total);
        }

        let inner = ready!(this.inner.poll_next(cx));
        match &inner {
            Some(Ok(data)) => {
                *this.transferred += data.len() as u64;
                this.listener.progress(*this.transferred, *this.total);
            }
            None => {
                this.listener.end(*this.transferred);
            }
            Some(Err(_)) => {}
        }
        Poll::Ready(inner)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
