use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Fires its held closure exactly once: on an explicit [`EofGuard::fire`], or
/// on drop if `fire` was never called. Abnormal termination — the client
/// aborts mid-send, the response is dropped before being polled to EOF — is
/// the ordinary way a tracked request ends without ever reaching
/// `Poll::Ready(None)`, and the completion hook (SPEC_FULL §6.3: "invoked
/// exactly once per tracked request") must still run in that case, or the
/// registry entry never tombstones and leaks past the reaper forever.
struct EofGuard<E>(Option<E>);

impl<E: FnOnce() + Send + 'static> EofGuard<E> {
    fn fire(&mut self) {
        if let Some(on_eof) = self.0.take() {
            on_eof();
        }
    }
}

impl<E: FnOnce() + Send + 'static> Drop for EofGuard<E> {
    fn drop(&mut self) {
        self.fire();
    }
}

pin_project_lite::pin_project! {
    /// Wraps an HTTP body, reporting each polled data frame's length to
    /// `on_bytes` and invoking `on_eof` exactly once, whether the stream
    /// reaches a clean EOF or is simply dropped beforehand.
    ///
    /// Used on both sides of a tracked request: on the request body to
    /// drive `bytes_in`, and on the response body to drive `bytes_out` and
    /// the Live→Tombstone transition once the response is done with, clean
    /// or not.
    pub struct CountedBody<B, F, E> {
        #[pin]
        inner: B,
        on_bytes: Option<F>,
        on_eof: EofGuard<E>,
    }
}

impl<B, F, E> CountedBody<B, F, E>
where
    F: FnMut(u64) + Send + 'static,
    E: FnOnce() + Send + 'static,
{
    pub fn new(inner: B, on_bytes: F, on_eof: E) -> Self {
        CountedBody {
            inner,
            on_bytes: Some(on_bytes),
            on_eof: EofGuard(Some(on_eof)),
        }
    }
}

impl<B, F, E> Body for CountedBody<B, F, E>
where
    B: Body<Data = Bytes>,
    F: FnMut(u64) + Send + 'static,
    E: FnOnce() + Send + 'static,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        match this.inner.as_mut().poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    if let Some(on_bytes) = this.on_bytes.as_mut() {
                        on_bytes(data.len() as u64);
                    }
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(None) => {
                this.on_eof.fire();
                Poll::Ready(None)
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted(
        data: &'static str,
    ) -> (
        CountedBody<Full<Bytes>, impl FnMut(u64), impl FnOnce()>,
        Arc<AtomicUsize>,
        Arc<AtomicUsize>,
    ) {
        let bytes_seen = Arc::new(AtomicUsize::new(0));
        let eof_calls = Arc::new(AtomicUsize::new(0));
        let (b, e) = (bytes_seen.clone(), eof_calls.clone());
        let body = CountedBody::new(
            Full::new(Bytes::from_static(data.as_bytes())),
            move |n| {
                b.fetch_add(n as usize, Ordering::SeqCst);
            },
            move || {
                e.fetch_add(1, Ordering::SeqCst);
            },
        );
        (body, bytes_seen, eof_calls)
    }

    #[tokio::test]
    async fn reaching_eof_fires_on_eof_once() {
        let (body, bytes_seen, eof_calls) = counted("hello");
        let collected = body.collect().await.expect("body reads cleanly");
        assert_eq!(collected.to_bytes().as_ref(), b"hello");
        assert_eq!(bytes_seen.load(Ordering::SeqCst), 5);
        assert_eq!(eof_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_before_eof_still_fires_on_eof() {
        let (body, _bytes_seen, eof_calls) = counted("hello");
        assert_eq!(eof_calls.load(Ordering::SeqCst), 0);
        drop(body);
        assert_eq!(eof_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn eof_fires_only_once_even_if_dropped_after_completing() {
        let (body, _bytes_seen, eof_calls) = counted("hello");
        let _ = body.collect().await.expect("body reads cleanly");
        assert_eq!(eof_calls.load(Ordering::SeqCst), 1);
        // `body` is already consumed by `collect`; the guard's own drop
        // already ran as part of that, so nothing further fires here.
    }
}
