use std::fmt;
use std::io::{self, Write};
use std::net::ToSocketAddrs;
use std::time::{Duration, Instant};

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};

use crate::logging::{self, Logger};
use crate::net::buffer::Buffer;
use crate::shared::{ClientError, ClientResult, ErrorType};
use crate::{DEFAULT_HOST, DEFAULT_PORT};

/// Readiness token for the single chat socket.
const SOCKET_TOKEN: Token = Token(0);

/// Connection lifecycle flags. Each flag is set at most once per connection
/// attempt and only `disconnect` clears them, so composed states such as
/// connected-while-authenticating occur naturally during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status(u8);

impl Status {
    pub const CONNECTING: Status = Status(1);
    pub const CONNECTED: Status = Status(1 << 1);
    pub const AUTHENTICATING: Status = Status(1 << 2);
    pub const AUTHENTICATED: Status = Status(1 << 3);

    #[inline]
    pub fn contains(self, flags: Status) -> bool {
        self.0 & flags.0 == flags.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub(crate) fn insert(&mut self, flags: Status) {
        self.0 |= flags.0;
    }

    #[inline]
    pub(crate) fn remove(&mut self, flags: Status) {
        self.0 &= !flags.0;
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Credentials and identity owned by the connection. The password is a
/// secret and never reaches the log (see `Connection::redact`). Display
/// name and user id are filled in from the server's GLOBALUSERSTATE.
#[derive(Default)]
pub struct Login {
    pub nickname: String,
    pub(crate) password: String,
    pub display_name: String,
    pub user_id: String,
}

// The password stays out of any formatted output.
impl fmt::Debug for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Login")
            .field("nickname", &self.nickname)
            .field("display_name", &self.display_name)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Socket readiness observed by one poll pass, folded over all events for
/// the connection's token.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Readiness {
    pub readable: bool,
    pub writable: bool,
    pub closed: bool,
    pub error: bool,
}

/// A single chat connection: the socket, the readiness queue, the status
/// flag set and the owned login. All handles are reset to `None` on
/// disconnect, regardless of the path that got there.
pub struct Connection {
    stream: Option<TcpStream>,
    poll: Option<Poll>,
    events: Events,

    status: Status,
    login: Login,
    last_error: Option<ErrorType>,
    last_message: Instant,

    log: Logger,
}

impl Connection {
    #[inline]
    pub fn new<'a, L: Into<Option<&'a Logger>>>(log: L) -> Connection {
        let log = match log.into() {
            Some(log) => log.new(logging::o!()),
            _ => Logger::root(logging::Discard, logging::o!()),
        };

        Connection {
            stream: None,
            poll: None,
            events: Events::with_capacity(8),
            status: Status::default(),
            login: Login::default(),
            last_error: None,
            last_message: Instant::now(),
            log,
        }
    }

    /// Connects to the default chat endpoint.
    #[inline]
    pub fn connect(&mut self, nickname: &str, password: &str) -> ClientResult<()> {
        self.connect_to(nickname, password, DEFAULT_HOST, DEFAULT_PORT)
    }

    /// Resolves `host:port`, initiates a non-blocking connect and registers
    /// the socket for read and write readiness. The TCP handshake finishes
    /// asynchronously; the first write readiness completes it.
    pub fn connect_to(&mut self, nickname: &str, password: &str, host: &str, port: u16) -> ClientResult<()> {
        if !self.status.is_empty() || self.stream.is_some() {
            return self.fail(ErrorType::AlreadyConnected);
        }

        logging::debug!(self.log, "connecting"; "host" => host, "port" => port, "nickname" => nickname);

        let address = match (host, port).to_socket_addrs() {
            Ok(mut addresses) => match addresses.next() {
                Some(address) => address,
                None => return self.fail(ErrorType::AddrResolve),
            },
            Err(_) => return self.fail(ErrorType::AddrResolve),
        };

        let mut stream = match TcpStream::connect(address) {
            Ok(stream) => stream,
            Err(_) => return self.fail(ErrorType::SocketConnect),
        };

        let poll = match Poll::new() {
            Ok(poll) => poll,
            Err(_) => return self.fail(ErrorType::PollCreate),
        };

        if poll
            .registry()
            .register(&mut stream, SOCKET_TOKEN, Interest::READABLE | Interest::WRITABLE)
            .is_err()
        {
            return self.fail(ErrorType::PollRegister);
        }

        self.stream = Some(stream);
        self.poll = Some(poll);
        self.status.insert(Status::CONNECTING);
        self.login = Login {
            nickname: nickname.to_owned(),
            password: password.to_owned(),
            ..Login::default()
        };
        self.last_error = None;
        self.last_message = Instant::now();

        Ok(())
    }

    /// Waits up to `timeout` for readiness on the socket. `None` waits
    /// indefinitely. Interruption by a signal is reported as no readiness
    /// at all so the caller's loop survives harmless signals.
    pub(crate) fn poll_wait(&mut self, timeout: Option<Duration>) -> ClientResult<Readiness> {
        if self.poll.is_none() {
            return self.fail(ErrorType::Socket);
        }

        let wait = {
            let Connection { poll, events, .. } = self;
            poll.as_mut()
                .expect("Connection must have a valid poll")
                .poll(events, timeout)
        };

        match wait {
            Ok(()) => {}
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => return Ok(Readiness::default()),
            Err(_) => return self.fail(ErrorType::PollWait),
        }

        let mut readiness = Readiness::default();

        for event in self.events.iter() {
            if event.token() != SOCKET_TOKEN {
                continue;
            }

            readiness.readable |= event.is_readable();
            readiness.writable |= event.is_writable();
            readiness.closed |= event.is_read_closed() || event.is_write_closed();
            readiness.error |= event.is_error();
        }

        Ok(readiness)
    }

    /// First write readiness after `connect_to` marks the TCP handshake
    /// done. Verifies the socket, advances the state machine, performs the
    /// capability request and authentication, and drops write interest.
    pub(crate) fn complete_connect(&mut self) -> ClientResult<()> {
        enum Probe {
            Ready,
            Pending,
            Failed,
        }

        let probe = {
            let stream = self.stream.as_ref().expect("Connection must have a valid stream");

            match stream.take_error() {
                Ok(None) => match stream.peer_addr() {
                    Ok(_) => Probe::Ready,
                    Err(ref err) if err.kind() == io::ErrorKind::NotConnected => Probe::Pending,
                    Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => Probe::Pending,
                    Err(_) => Probe::Failed,
                },
                Ok(Some(_)) | Err(_) => Probe::Failed,
            }
        };

        match probe {
            Probe::Pending => return Ok(()),
            Probe::Failed => return self.fail(ErrorType::SocketConnect),
            Probe::Ready => {}
        }

        logging::debug!(self.log, "connection established"; "nickname" => self.login.nickname.as_str());

        self.status.remove(Status::CONNECTING);
        self.status.insert(Status::CONNECTED);

        // Capability request first, then authentication.
        self.cap_req_all()?;
        let password = self.login.password.clone();
        let nickname = self.login.nickname.clone();
        self.pass(&password)?;
        self.nick(&nickname)?;
        self.status.insert(Status::AUTHENTICATING);

        // Sends are attempted eagerly from here on; write readiness is no
        // longer interesting.
        let reregister = {
            let Connection { poll, stream, .. } = self;
            poll.as_ref()
                .expect("Connection must have a valid poll")
                .registry()
                .reregister(
                    stream.as_mut().expect("Connection must have a valid stream"),
                    SOCKET_TOKEN,
                    Interest::READABLE,
                )
        };

        if reregister.is_err() {
            return self.fail(ErrorType::PollRegister);
        }

        Ok(())
    }

    /// Drains the socket into `buffer`. Updates the inbound liveness clock
    /// on any successful read; a zero-length read is the peer closing and
    /// a kernel that came up dry is `Wait`.
    pub(crate) fn receive(&mut self, buffer: &mut Buffer) -> ClientResult<usize> {
        if self.stream.is_none() {
            return self.fail(ErrorType::Socket);
        }

        let outcome = {
            let stream = self.stream.as_mut().expect("Connection must have a valid stream");
            buffer.ingress(stream)
        };

        match outcome {
            Ok((count, eof)) => {
                if count > 0 {
                    self.last_message = Instant::now();
                    logging::trace!(self.log, "received data"; "count" => count);
                }

                if eof {
                    return self.fail(ErrorType::Closed);
                }

                if count == 0 {
                    return Err(ClientError::Wait);
                }

                Ok(count)
            }
            Err(_) => self.fail(ErrorType::SocketRecv),
        }
    }

    /// Sends one line, appending the CRLF terminator and blocking until the
    /// kernel has accepted the whole message. The logged copy has the
    /// password replaced by an equal-length run of `*`.
    pub(crate) fn send_line(&mut self, line: &str) -> ClientResult<()> {
        if self.stream.is_none() {
            return self.fail(ErrorType::Socket);
        }

        let redacted = self.redact(line);
        logging::debug!(self.log, "sending message"; "message" => redacted);

        let mut message = String::with_capacity(line.len() + 2);
        message.push_str(line);
        message.push_str("\r\n");

        let stream = self.stream.as_mut().expect("Connection must have a valid stream");
        let mut remaining = message.as_bytes();

        let outcome = loop {
            if remaining.is_empty() {
                break Ok(());
            }

            match stream.write(remaining) {
                Ok(0) => break Err(()),
                Ok(count) => remaining = &remaining[count..],
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break Err(()),
            }
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(()) => self.fail(ErrorType::SocketSend),
        }
    }

    /// Sends QUIT, then tears down regardless of the send outcome.
    pub fn quit_and_disconnect(&mut self) -> ClientResult<()> {
        let result = self.quit();
        self.disconnect();
        result
    }

    /// Tears the connection down: closes the socket and the readiness
    /// queue, clears the status flags and frees the owned login. Calling
    /// this on an already-disconnected instance is a no-op.
    pub fn disconnect(&mut self) {
        if self.stream.is_none() && self.poll.is_none() && self.status.is_empty() {
            return;
        }

        logging::debug!(self.log, "disconnecting"; "status" => ?self.status, "last_error" => ?self.last_error);

        if let (Some(poll), Some(stream)) = (self.poll.as_ref(), self.stream.as_mut()) {
            drop(poll.registry().deregister(stream));
        }

        // Dropping the handles closes the socket and the readiness queue.
        self.stream = None;
        self.poll = None;
        self.status.clear();
        self.login = Login::default();
    }

    #[inline]
    pub fn is_connecting(&self) -> bool {
        self.status.contains(Status::CONNECTING)
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.status.contains(Status::CONNECTED)
    }

    #[inline]
    pub fn is_logging_in(&self) -> bool {
        self.status.contains(Status::AUTHENTICATING)
    }

    #[inline]
    pub fn is_logged_in(&self) -> bool {
        self.status.contains(Status::AUTHENTICATED)
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn last_error(&self) -> Option<ErrorType> {
        self.last_error
    }

    #[inline]
    pub fn login(&self) -> &Login {
        &self.login
    }

    /// Time since the last successful inbound read.
    #[inline]
    pub(crate) fn last_message_elapsed(&self, now: Instant) -> Duration {
        now.duration_since(self.last_message)
    }

    #[inline]
    pub(crate) fn note_authenticated(&mut self) {
        self.status.insert(Status::AUTHENTICATED);
    }

    /// Caches the identity the server reports for the logged-in user.
    pub(crate) fn cache_identity(&mut self, display_name: Option<&str>, user_id: Option<&str>) {
        if let Some(display_name) = display_name {
            self.login.display_name = display_name.to_owned();
        }

        if let Some(user_id) = user_id {
            self.login.user_id = user_id.to_owned();
        }
    }

    #[inline]
    pub(crate) fn log(&self) -> &Logger {
        &self.log
    }

    /// Records `error` as the connection's last error and fails with it.
    #[inline]
    pub(crate) fn fail<T>(&mut self, error: ErrorType) -> ClientResult<T> {
        self.last_error = Some(error);
        Err(crate::shared::ClientError::Fatal(error))
    }

    /// Replaces the password substring with an equal-length run of `*`.
    fn redact(&self, line: &str) -> String {
        let password = self.login.password.as_str();

        if password.is_empty() || !line.contains(password) {
            return line.to_owned();
        }

        line.replace(password, &"*".repeat(password.len()))
    }
}
