//! Push delivery of a [`PartialResultStream`] into a bounded channel.
use bytes::Bytes;
use futures_core::Stream;
use std::{
    pin::Pin,
    task::{Context, Poll, ready},
    time::Duration,
};
use tokio::{
    sync::{
        mpsc::{self, Receiver, Sender, error::TrySendError},
        oneshot,
    },
    time::{Instant, Sleep, sleep},
};

use crate::{
    Result,
    common::verbose,
    error::{BackpressureError, ClosedError},
    fragment::Fragment,
    retry::Status,
    stream::{Event, PartialResultStream},
};

pin_project_lite::pin_project! {
    /// Future that pushes every event of a stream into a [`Sender`].
    ///
    /// When the channel is full, reading from the stream is paused and the push
    /// is retried after a delay that doubles on every failed attempt. The future
    /// fails with [`BackpressureError`] once the retries are exhausted.
    ///
    /// Must be created within a tokio runtime.
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct Forward<F, S> {
        stream: PartialResultStream<F, S>,
        send: Sender<Result<Event>>,
        item: Option<Result<Event>>,
        #[pin]
        sleep: Sleep,
        sleeping: bool,
        delay: Duration,
        attempts: u32,
    }
}

impl<F, S> Forward<F, S> {
    pub fn new(stream: PartialResultStream<F, S>, send: Sender<Result<Event>>) -> Self {
        let delay = stream.options().initial_backoff;
        Self {
            stream,
            send,
            item: None,
            sleep: sleep(Duration::ZERO),
            sleeping: false,
            delay,
            attempts: 0,
        }
    }
}

impl<F, S> Future for Forward<F, S>
where
    F: FnMut(Bytes) -> S + Unpin,
    S: Stream<Item = Result<Fragment, Status>> + Unpin,
{
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let mut me = self.project();

        loop {
            if *me.sleeping {
                ready!(me.sleep.as_mut().poll(cx));
                *me.sleeping = false;
            }

            let item = match me.item.take() {
                Some(item) => item,
                None => match ready!(Pin::new(&mut *me.stream).poll_next(cx)) {
                    Some(item) => item,
                    None => return Poll::Ready(Ok(())),
                },
            };

            match me.send.try_send(item) {
                Ok(()) => {
                    *me.attempts = 0;
                    *me.delay = me.stream.options().initial_backoff;
                }
                Err(TrySendError::Full(item)) => {
                    let (max_retries, max_backoff) = {
                        let options = me.stream.options();
                        (options.max_resume_retries, options.max_backoff)
                    };
                    if *me.attempts >= max_retries {
                        let retries = *me.attempts;
                        me.stream.destroy(None);
                        return Poll::Ready(Err(BackpressureError { retries }.into()));
                    }

                    verbose!("consumer full, probing again in {:?}", me.delay);

                    *me.attempts += 1;
                    *me.item = Some(item);
                    me.sleep.as_mut().reset(Instant::now() + *me.delay);
                    *me.sleeping = true;
                    *me.delay = (*me.delay * 2).min(max_backoff);
                }
                Err(TrySendError::Closed(_)) => {
                    me.stream.destroy(None);
                    return Poll::Ready(Err(ClosedError.into()));
                }
            }
        }
    }
}

impl<F, S> PartialResultStream<F, S>
where
    F: FnMut(Bytes) -> S + Unpin + Send + 'static,
    S: Stream<Item = Result<Fragment, Status>> + Unpin + Send + 'static,
{
    /// Drive the stream on a tokio task, delivering into a channel of `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn(self, capacity: usize) -> RowReceiver {
        let (send, recv) = mpsc::channel(capacity);
        let (error_send, error) = oneshot::channel();
        let forward = Forward::new(self, send);

        tokio::spawn(async move {
            if let Err(err) = forward.await {
                let _ = error_send.send(err);
            }
        });

        RowReceiver { recv, error: Some(error) }
    }
}

/// [`Stream`] returned from [`PartialResultStream::spawn`].
#[derive(Debug)]
pub struct RowReceiver {
    recv: Receiver<Result<Event>>,
    error: Option<oneshot::Receiver<crate::Error>>,
}

impl Stream for RowReceiver {
    type Item = Result<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();

        if let Some(item) = ready!(me.recv.poll_recv(cx)) {
            return Poll::Ready(Some(item));
        }

        // data channel closed, the forwarding task may have failed
        let Some(error) = me.error.as_mut() else {
            return Poll::Ready(None);
        };
        let result = ready!(Pin::new(error).poll(cx));
        me.error = None;

        match result {
            Ok(err) => Poll::Ready(Some(Err(err))),
            Err(_) => Poll::Ready(None),
        }
    }
}
