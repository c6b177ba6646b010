//! The connection engine: one task that owns the transport, drains a
//! bounded request queue, and pairs pipelined responses with their callers
//! in FIFO order.

use std::collections::VecDeque;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::error::{Error, ShutdownCause};
use crate::parser::{parse_meta_response, Response};
use crate::proto::{encode_request, Request, RequestKind};

const READ_RESERVE: usize = 1024;

/// A request paired with the completion its caller is awaiting.
pub(crate) struct Exchange {
    pub(crate) request: Request,
    pub(crate) completion: oneshot::Sender<Result<Response, Error>>,
}

struct Pending {
    kind: RequestKind,
    completion: oneshot::Sender<Result<Response, Error>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Initial,
    Running,
    Terminated,
}

/// Drives one connection until the last [`Client`](crate::Client) handle is
/// dropped, the transport fails, or the task is cancelled.
pub struct Pipeline<T> {
    transport: T,
    requests: mpsc::Receiver<Exchange>,
    pending: VecDeque<Pending>,
    wbuf: BytesMut,
    rbuf: BytesMut,
    state: State,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Pipeline<T> {
    pub(crate) fn new(transport: T, requests: mpsc::Receiver<Exchange>) -> Pipeline<T> {
        Pipeline {
            transport,
            requests,
            pending: VecDeque::new(),
            wbuf: BytesMut::new(),
            rbuf: BytesMut::new(),
            state: State::Initial,
        }
    }

    /// Runs the engine to completion.
    ///
    /// Returns `Ok(())` once every client handle is gone and the last
    /// in-flight response has been delivered. On transport failure or a
    /// malformed frame the engine terminates, failing every outstanding
    /// caller with [`Error::ConnectionShutdown`], and returns the cause.
    ///
    /// May be invoked exactly once; later calls fail with
    /// [`Error::AlreadyRunning`].
    pub async fn run(&mut self) -> Result<(), Error> {
        if self.state != State::Initial {
            return Err(Error::AlreadyRunning);
        }
        self.state = State::Running;

        let result = self.drive().await;
        self.state = State::Terminated;

        let cause = match &result {
            Ok(()) => ShutdownCause::Terminated,
            Err(e) => ShutdownCause::from_error(e),
        };
        self.fail_outstanding(cause);
        result
    }

    async fn drive(&mut self) -> Result<(), Error> {
        let mut accepting = true;
        loop {
            self.rbuf.reserve(READ_RESERVE);
            tokio::select! {
                next = self.requests.recv(), if accepting => match next {
                    Some(exchange) => self.submit(exchange).await?,
                    None => {
                        accepting = false;
                        if self.pending.is_empty() {
                            return Ok(());
                        }
                    }
                },
                read = self.transport.read_buf(&mut self.rbuf) => {
                    if read? == 0 {
                        return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
                    }
                    self.dispatch_responses()?;
                    if !accepting && self.pending.is_empty() {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn submit(&mut self, exchange: Exchange) -> Result<(), Error> {
        let Exchange {
            request,
            completion,
        } = exchange;
        let kind = request.kind();

        self.wbuf.clear();
        encode_request(&request, &mut self.wbuf);
        trace!(?kind, bytes = self.wbuf.len(), "writing request");

        // The entry joins the FIFO before the first write: a mid-write
        // transport failure must still fail this caller on shutdown.
        self.pending.push_back(Pending { kind, completion });
        self.transport.write_all(&self.wbuf).await?;
        self.transport.flush().await?;
        Ok(())
    }

    fn dispatch_responses(&mut self) -> Result<(), Error> {
        while let Some((consumed, response)) = parse_meta_response(&self.rbuf)? {
            let _ = self.rbuf.split_to(consumed);
            let entry = self.pending.pop_front().ok_or_else(|| {
                Error::MalformedFrame("response without a matching in-flight request".to_string())
            })?;
            trace!(kind = ?entry.kind, code = ?response.code, "pairing response");
            // The caller may have been cancelled; a dropped receiver is fine.
            let _ = entry.completion.send(Ok(response));
        }
        Ok(())
    }

    fn fail_outstanding(&mut self, cause: ShutdownCause) {
        self.requests.close();

        let mut failed = self.pending.len();
        for entry in self.pending.drain(..) {
            let _ = entry
                .completion
                .send(Err(Error::ConnectionShutdown(cause.clone())));
        }
        while let Ok(exchange) = self.requests.try_recv() {
            failed += 1;
            let _ = exchange
                .completion
                .send(Err(Error::ConnectionShutdown(cause.clone())));
        }

        if failed > 0 {
            debug!(%cause, failed, "failed outstanding requests on shutdown");
        }
    }
}
