//! Resumable stream of assembled rows.
use bytes::Bytes;
use futures_core::{FusedStream, Stream};
use std::{
    collections::VecDeque,
    fmt, mem,
    pin::Pin,
    task::{Context, Poll, ready},
};

use crate::{
    Error, Result,
    builder::RowBuilder,
    checkpoint::CheckpointBuffer,
    common::{span, verbose},
    config::Options,
    fragment::{Fragment, Stats},
    retry::Status,
    row::Row,
    value::Field,
};

/// Item yielded by [`PartialResultStream`].
#[derive(Debug, Clone)]
pub enum Event {
    /// A fragment as received, only when [`Options::emit_responses`] is set.
    Response(Fragment),
    /// Execution statistics, at most once.
    Stats(Stats),
    /// An assembled row.
    Row(Row),
}

impl Event {
    /// Returns the row, if this is a row event.
    pub fn into_row(self) -> Option<Row> {
        match self {
            Self::Row(row) => Some(row),
            _ => None,
        }
    }
}

/// Reassemble rows from a remote call that streams chunked fragments.
///
/// `request` is called with the last received resume token, empty for the
/// first call. It is called again from that token when the active call fails
/// with a retryable error, as long as no fragment past the token was released.
///
/// The first call is only issued when the stream is first polled.
pub fn partial_result_stream<F, S>(request: F, options: Options) -> PartialResultStream<F, S>
where
    F: FnMut(Bytes) -> S,
{
    PartialResultStream::new(request, options)
}

#[must_use = "streams do nothing unless polled"]
pub struct PartialResultStream<F, S> {
    request: F,
    options: Options,
    phase: Phase<S>,
    buffer: CheckpointBuffer,
    builder: RowBuilder,
    resume_token: Bytes,
    events: VecDeque<Event>,
    stats: Option<Stats>,
    retries: u32,
    destroyed: bool,
}

enum Phase<S> {
    Init,
    Streaming(S),
    /// Failed call torn down, reissued on the next poll.
    Retrying,
    Failed(Error),
    Done,
}

impl<F, S> PartialResultStream<F, S> {
    pub fn new(request: F, options: Options) -> Self {
        Self {
            request,
            buffer: CheckpointBuffer::new(options.max_queued),
            options,
            phase: Phase::Init,
            builder: RowBuilder::new(),
            resume_token: Bytes::new(),
            events: VecDeque::new(),
            stats: None,
            retries: 0,
            destroyed: false,
        }
    }

    /// Returns the column metadata, once received.
    pub fn metadata(&self) -> Option<&[Field]> {
        self.builder.fields()
    }

    /// Returns the execution statistics, once received.
    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    /// Returns the last resume token confirmed by a checkpoint.
    pub fn resume_token(&self) -> &Bytes {
        &self.resume_token
    }

    /// Number of times the remote call was reissued.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub(crate) fn options(&self) -> &Options {
        &self.options
    }

    /// Stop the stream, dropping the active call and everything buffered.
    ///
    /// If `err` is given it is yielded on the next poll, unless the stream already
    /// failed. Calling `destroy` again is a no-op.
    pub fn destroy(&mut self, err: Option<Error>) {
        if mem::replace(&mut self.destroyed, true) {
            return;
        }

        verbose!("destroy");

        self.events.clear();
        self.buffer.reset();
        self.builder.discard();

        self.phase = match (mem::replace(&mut self.phase, Phase::Done), err) {
            (Phase::Failed(err), _) => Phase::Failed(err),
            (Phase::Done, _) | (_, None) => Phase::Done,
            (_, Some(err)) => Phase::Failed(err),
        };
    }

    /// Only yield rows.
    pub fn rows(self) -> Rows<F, S> {
        Rows { inner: self }
    }

    /// Only yield rows, converted into JSON objects.
    #[cfg(feature = "json")]
    pub fn json(self, options: crate::json::JsonOptions) -> JsonRows<F, S> {
        JsonRows { inner: self, options }
    }

    /// Collect all rows.
    pub fn fetch_all(self) -> FetchAll<F, S> {
        FetchAll { rows: self.rows(), output: vec![] }
    }

    fn fail(&mut self, err: Error) {
        #[cfg(feature = "log")]
        log::error!("partial result stream failed: {err}");

        self.buffer.reset();
        self.builder.discard();
        self.phase = Phase::Failed(err);
    }

    /// Feed released fragments to the builder, queueing the resulting events.
    fn release(&mut self, fragments: Vec<Fragment>) -> Result<()> {
        for fragment in fragments {
            if self.options.emit_responses {
                self.events.push_back(Event::Response(fragment.clone()));
            }

            if let Some(stats) = &fragment.stats {
                self.stats = Some(stats.clone());
                self.events.push_back(Event::Stats(stats.clone()));
            }

            self.builder.add_fragment(fragment)?;

            while let Some(row) = self.builder.pop_row() {
                self.events.push_back(Event::Row(row));
            }
        }
        Ok(())
    }

    fn on_fragment(&mut self, fragment: Fragment) {
        verbose!(
            "fragment: values={}, chunked={}, checkpoint={}",
            fragment.values.len(),
            fragment.chunked_value,
            fragment.is_checkpoint()
        );

        if fragment.is_checkpoint() {
            self.resume_token = fragment.resume_token.clone();
        }

        let released = self.buffer.push(fragment);
        if let Err(err) = self.release(released) {
            self.fail(err);
        }
    }

    fn on_end(&mut self) {
        // everything left is complete data from a finished call
        let released = self.buffer.flush();
        match self.release(released).and_then(|()| self.builder.finish()) {
            Ok(()) => self.phase = Phase::Done,
            Err(err) => self.fail(err),
        }
    }
}

impl<F, S> PartialResultStream<F, S>
where
    F: FnMut(Bytes) -> S,
{
    fn issue(&mut self) {
        span!("issue", retries = self.retries);
        verbose!("issuing call, resume token: {:?}", self.resume_token);

        self.builder.clear_pending();
        self.phase = Phase::Streaming((self.request)(self.resume_token.clone()));
    }

    fn on_error(&mut self, status: Status) {
        let retryable = self.options.retry.is_retryable(&status);

        if retryable && self.buffer.is_safe_to_retry() {
            #[cfg(feature = "log")]
            log::warn!(
                "retrying after {status}, discarding {} unconfirmed fragments",
                self.buffer.len()
            );

            self.buffer.reset();
            self.retries += 1;
            self.phase = Phase::Retrying;
            return;
        }

        // data released so far is safe, deliver it before failing
        let released = self.buffer.flush();
        if let Err(_err) = self.release(released) {
            #[cfg(feature = "log")]
            log::error!("failed to release buffered fragments: {_err}");
        }

        let err = Error::from(status);
        let err = match retryable {
            true => err.context(format!(
                "{} fragments without a resume token, retry is unsafe",
                self.buffer.without_checkpoint()
            )),
            false => err,
        };
        self.fail(err);
    }
}

impl<F, S> Stream for PartialResultStream<F, S>
where
    F: FnMut(Bytes) -> S + Unpin,
    S: Stream<Item = Result<Fragment, Status>> + Unpin,
{
    type Item = Result<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();

        loop {
            if let Some(event) = me.events.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            match mem::replace(&mut me.phase, Phase::Done) {
                Phase::Init | Phase::Retrying => me.issue(),
                Phase::Streaming(mut call) => match Pin::new(&mut call).poll_next(cx) {
                    Poll::Pending => {
                        me.phase = Phase::Streaming(call);
                        return Poll::Pending;
                    }
                    Poll::Ready(Some(Ok(fragment))) => {
                        me.phase = Phase::Streaming(call);
                        me.on_fragment(fragment);
                    }
                    Poll::Ready(Some(Err(status))) => {
                        // teardown the failed call before any reissue
                        drop(call);
                        me.on_error(status);

                        // yield before reissuing, a call failing immediately must not spin
                        if let Phase::Retrying = me.phase {
                            cx.waker().wake_by_ref();
                            return Poll::Pending;
                        }
                    }
                    Poll::Ready(None) => {
                        drop(call);
                        me.on_end();
                    }
                },
                Phase::Failed(err) => return Poll::Ready(Some(Err(err))),
                Phase::Done => return Poll::Ready(None),
            }
        }
    }
}

impl<F, S> FusedStream for PartialResultStream<F, S>
where
    F: FnMut(Bytes) -> S + Unpin,
    S: Stream<Item = Result<Fragment, Status>> + Unpin,
{
    fn is_terminated(&self) -> bool {
        matches!(self.phase, Phase::Done) && self.events.is_empty()
    }
}

impl<F, S> fmt::Debug for PartialResultStream<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Init => "Init",
            Phase::Streaming(_) => "Streaming",
            Phase::Retrying => "Retrying",
            Phase::Failed(_) => "Failed",
            Phase::Done => "Done",
        };
        f.debug_struct("PartialResultStream")
            .field("phase", &phase)
            .field("resume_token", &self.resume_token)
            .field("buffered", &self.buffer.len())
            .field("events", &self.events.len())
            .field("retries", &self.retries)
            .finish()
    }
}

/// [`Stream`] returned from [`PartialResultStream::rows`].
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct Rows<F, S> {
    inner: PartialResultStream<F, S>,
}

impl<F, S> Rows<F, S> {
    /// Returns the underlying stream.
    pub fn inner_mut(&mut self) -> &mut PartialResultStream<F, S> {
        &mut self.inner
    }
}

impl<F, S> Stream for Rows<F, S>
where
    F: FnMut(Bytes) -> S + Unpin,
    S: Stream<Item = Result<Fragment, Status>> + Unpin,
{
    type Item = Result<Row>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();

        while let Some(event) = ready!(Pin::new(&mut me.inner).poll_next(cx)?) {
            if let Event::Row(row) = event {
                return Poll::Ready(Some(Ok(row)));
            }
        }

        Poll::Ready(None)
    }
}

/// [`Stream`] returned from [`PartialResultStream::json`].
#[cfg(feature = "json")]
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct JsonRows<F, S> {
    inner: PartialResultStream<F, S>,
    options: crate::json::JsonOptions,
}

#[cfg(feature = "json")]
impl<F, S> Stream for JsonRows<F, S>
where
    F: FnMut(Bytes) -> S + Unpin,
    S: Stream<Item = Result<Fragment, Status>> + Unpin,
{
    type Item = Result<crate::json::JsonRow>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();

        while let Some(event) = ready!(Pin::new(&mut me.inner).poll_next(cx)?) {
            let Event::Row(row) = event else { continue };
            return Poll::Ready(Some(match row.to_json(&me.options) {
                Ok(json) => Ok(json),
                Err(err) => {
                    me.inner.destroy(None);
                    Err(err.into())
                }
            }));
        }

        Poll::Ready(None)
    }
}

/// Future returned from [`PartialResultStream::fetch_all`].
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct FetchAll<F, S> {
    rows: Rows<F, S>,
    output: Vec<Row>,
}

impl<F, S> Future for FetchAll<F, S>
where
    F: FnMut(Bytes) -> S + Unpin,
    S: Stream<Item = Result<Fragment, Status>> + Unpin,
{
    type Output = Result<Vec<Row>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let me = self.get_mut();

        while let Some(r) = ready!(Pin::new(&mut me.rows).poll_next(cx)?) {
            me.output.push(r);
        }

        Poll::Ready(Ok(mem::take(&mut me.output)))
    }
}
