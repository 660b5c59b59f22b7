use std::time::{Duration, Instant};

use crate::logging;
use crate::net::buffer::{Buffer, READ_BUF_SIZE};
use crate::net::codec;
use crate::net::connection::Connection;
use crate::net::message::{self, CommandType, Event};
use crate::shared::{ClientError, ClientResult, ErrorType, ErrorUtils};

/// Receives every inbound chat event, synchronously, in wire order. The
/// connection handle accepts outbound commands; the poll loop itself is
/// not reachable from a callback.
pub trait EventHandler {
    fn on_event(&mut self, connection: &mut Connection, event: &Event<'_>);
}

impl<F> EventHandler for F
where
    F: FnMut(&mut Connection, &Event<'_>),
{
    #[inline]
    fn on_event(&mut self, connection: &mut Connection, event: &Event<'_>) {
        self(connection, event)
    }
}

/// A single chat connection driven by readiness polling. `poll_once`
/// performs all I/O for one pass and hands finished events to the handler.
pub struct Client<H> {
    connection: Connection,
    buffer: Buffer,
    handler: H,
}

impl<H: EventHandler> Client<H> {
    /// Inbound silence tolerated before the link is declared dead. Sits
    /// slightly above the server's five-minute ping interval so scheduling
    /// jitter does not kill healthy connections.
    const TIMEOUT_INTERVAL: Duration = Duration::from_secs(5 * 60 + 15);

    pub fn new<'a, L: Into<Option<&'a logging::Logger>>>(handler: H, log: L) -> Client<H> {
        Client {
            connection: Connection::new(log),
            buffer: Buffer::new(READ_BUF_SIZE),
            handler,
        }
    }

    #[inline]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    #[inline]
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Connects to the default chat endpoint.
    #[inline]
    pub fn connect(&mut self, nickname: &str, password: &str) -> ClientResult<()> {
        self.connect_to(nickname, password, crate::DEFAULT_HOST, crate::DEFAULT_PORT)
    }

    pub fn connect_to(&mut self, nickname: &str, password: &str, host: &str, port: u16) -> ClientResult<()> {
        self.connection.connect_to(nickname, password, host, port)?;
        self.buffer.clear();
        Ok(())
    }

    /// Sends QUIT, then tears down regardless of the send outcome.
    pub fn quit_and_disconnect(&mut self) -> ClientResult<()> {
        self.connection.quit_and_disconnect()
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    /// Waits up to `timeout` for socket readiness and processes whatever
    /// arrived. `None` waits indefinitely; a zero duration polls without
    /// blocking. Any error tears the connection down before returning;
    /// the caller inspects `connection().last_error()` and decides whether
    /// to reconnect.
    pub fn poll_once(&mut self, timeout: Option<Duration>) -> ClientResult<()> {
        let readiness = match self.connection.poll_wait(timeout) {
            Ok(readiness) => readiness,
            Err(error) => {
                self.connection.disconnect();
                return Err(error);
            }
        };

        if readiness.error {
            let result = self.connection.fail(ErrorType::Socket);
            self.connection.disconnect();
            return result;
        }

        if readiness.readable {
            if let Err(error) = self.handle_readable() {
                self.connection.disconnect();
                return Err(error);
            }
        } else if readiness.closed {
            let result = self.connection.fail(ErrorType::Hangup);
            self.connection.disconnect();
            return result;
        }

        if readiness.writable && self.connection.is_connecting() {
            if let Err(error) = self.connection.complete_connect() {
                self.connection.disconnect();
                return Err(error);
            }
        }

        // Liveness: a link that has gone quiet past the deadline is dead
        // even if it never signalled EOF, e.g. after a resume from sleep.
        if !self.connection.status().is_empty()
            && self.connection.last_message_elapsed(Instant::now()) > Self::TIMEOUT_INTERVAL
        {
            let result = self.connection.fail(ErrorType::Timeout);
            self.connection.disconnect();
            return result;
        }

        Ok(())
    }

    /// Reads until the kernel is drained, framing and dispatching complete
    /// lines as they appear. Buffered lines are delivered even when the
    /// same pass observes the peer closing.
    fn handle_readable(&mut self) -> ClientResult<()> {
        loop {
            let received = self.connection.receive(&mut self.buffer);
            let filled = self.buffer.free_capacity() == 0;
            let consumed = self.dispatch_lines();

            match received {
                Ok(_) => {}
                Err(ClientError::Wait) => return Ok(()),
                Err(error) => return Err(error),
            }

            // A full buffer without a single complete line cannot make
            // progress; a full buffer that produced lines may hide more
            // inbound data behind the edge-triggered event.
            if filled && consumed == 0 {
                return self.connection.fail(ErrorType::LineTooLong);
            }

            if !filled {
                return Ok(());
            }
        }
    }

    /// Frames, parses and dispatches every complete line in the buffer.
    /// Returns the number of bytes released. Malformed lines are logged
    /// and skipped.
    fn dispatch_lines(&mut self) -> usize {
        let mut consumed = 0;

        loop {
            let Client {
                connection,
                buffer,
                handler,
            } = self;

            let data = &mut buffer.data_mut()[consumed..];
            let length = match codec::find_message(data) {
                Some(length) => length,
                None => break,
            };

            let (line, _) = data.split_at_mut(length);

            match codec::parse(&mut *line) {
                Ok(line) => dispatch(connection, handler, line),
                Err(_) => {
                    logging::warn!(connection.log(), "skipping malformed line";
                                   "line" => String::from_utf8_lossy(line).into_owned());
                }
            }

            consumed += length + 2;
        }

        if consumed > 0 {
            self.buffer.consume(consumed);
        }

        consumed
    }
}

/// Applies the automatic reactions, then hands the event to the handler.
/// The PONG reply goes out before the callback sees the PING, so the
/// server is answered promptly even when the callback is slow.
fn dispatch<H: EventHandler>(connection: &mut Connection, handler: &mut H, line: codec::Line<'_>) {
    let event = Event::classify(line);

    match event.kind {
        CommandType::Authenticated => connection.note_authenticated(),
        CommandType::GlobalUserState => {
            connection.note_authenticated();
            connection.cache_identity(
                message::get_tag_value(&event.tags, "display-name"),
                message::get_tag_value(&event.tags, "user-id"),
            );
        }
        CommandType::Ping => {
            let parameter = event.parameter.or_else(|| event.args.first().copied());
            if connection.pong(parameter).has_failed() {
                logging::warn!(connection.log(), "pong reply failed");
            }
        }
        _ => {}
    }

    handler.on_event(connection, &event);
}
