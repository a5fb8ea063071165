//! Request body progress, used to time only the upstream's share of an
//! exchange.
//!
//! A proxied upload is streamed at the client's pace. Time spent waiting
//! for the client to send more bytes is not the upstream's fault, so the
//! deadline is paused while the body is waiting on the client. It runs
//! while a chunk sits with the upstream connection, and runs in full once
//! the body is complete.

use std::task::Poll;
use std::time::Duration;

use axum::body::{Body, HttpBody};
use futures_util::{stream, StreamExt};
use tokio::sync::watch;

/// Where a forwarded request body currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upload {
    /// The client has not sent the next chunk yet.
    AwaitingClient,
    /// A chunk was handed to the upstream connection, which has not asked
    /// for the next one.
    AwaitingUpstream,
    /// The whole body has been sent (or the body failed).
    Complete,
}

/// Wrap `body` so its progress can be watched. Bodies that are already at
/// end of stream are returned untouched, so no framing changes upstream.
pub fn track(body: Body) -> (Body, watch::Receiver<Upload>) {
    if body.is_end_stream() {
        let (_, rx) = watch::channel(Upload::Complete);
        return (body, rx);
    }

    let (tx, rx) = watch::channel(Upload::AwaitingUpstream);
    let mut inner = body.into_data_stream();
    let tracked = stream::poll_fn(move |cx| {
        let poll = inner.poll_next_unpin(cx);
        let state = match &poll {
            Poll::Pending => Upload::AwaitingClient,
            Poll::Ready(Some(Ok(_))) => Upload::AwaitingUpstream,
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => Upload::Complete,
        };
        tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        poll
    });

    (Body::from_stream(tracked), rx)
}

/// Resolves once the upstream has been given `timeout` of its own time
/// without producing a response.
///
/// While the body is in flight, each stretch spent waiting on the upstream
/// must stay under `timeout`. After the body is complete, the upstream
/// gets a full `timeout` to send response headers.
pub async fn upstream_deadline(mut progress: watch::Receiver<Upload>, timeout: Duration) {
    loop {
        let state = *progress.borrow_and_update();
        let changed = match state {
            Upload::Complete => break,
            Upload::AwaitingClient => progress.changed().await,
            Upload::AwaitingUpstream => {
                match tokio::time::timeout(timeout, progress.changed()).await {
                    Ok(changed) => changed,
                    Err(_) => return,
                }
            }
        };
        // Body dropped before it finished.
        if changed.is_err() {
            break;
        }
    }
    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use http_body_util::BodyExt;
    use std::time::Instant;

    #[tokio::test]
    async fn empty_body_is_complete() {
        let (body, progress) = track(Body::empty());
        assert!(body.is_end_stream());
        assert_eq!(*progress.borrow(), Upload::Complete);
    }

    #[tokio::test]
    async fn stalled_upstream_hits_deadline() {
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from_static(b"first")), Ok(Bytes::from_static(b"second"))];
        let (mut body, progress) = track(Body::from_stream(stream::iter(chunks)));

        // Take one chunk and never ask for the next.
        let frame = body.frame().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"first"));
        assert_eq!(*progress.borrow(), Upload::AwaitingUpstream);

        let start = Instant::now();
        upstream_deadline(progress, Duration::from_millis(100)).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn waiting_on_client_pauses_deadline() {
        let silent = stream::pending::<Result<Bytes, std::io::Error>>();
        let (mut body, progress) = track(Body::from_stream(silent));

        let polled = tokio::time::timeout(Duration::from_millis(50), body.frame()).await;
        assert!(polled.is_err());
        assert_eq!(*progress.borrow(), Upload::AwaitingClient);

        let fired = tokio::time::timeout(
            Duration::from_millis(300),
            upstream_deadline(progress, Duration::from_millis(50)),
        )
        .await;
        assert!(fired.is_err(), "deadline ran while the client was still uploading");
        drop(body);
    }
}
