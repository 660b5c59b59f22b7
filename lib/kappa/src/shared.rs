use std::io;

pub type ClientResult<T> = Result<T, ClientError>;

/// Outcome of a client operation. `Wait` means the kernel had no more
/// progress to offer and the caller should poll again; `Fatal` carries a
/// condition that ends the connection attempt.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ClientError {
    Wait,
    Fatal(ErrorType),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorType {
    SocketConnect,
    SocketSend,
    SocketRecv,
    PollCreate,
    PollRegister,
    PollWait,
    Closed,
    Hangup,
    Socket,
    AddrResolve,
    AlreadyConnected,
    Timeout,
    LineTooLong,
    Malformed,
    Io(io::ErrorKind),
}

impl From<io::Error> for ClientError {
    #[inline]
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            io::ErrorKind::WouldBlock => ClientError::Wait,
            kind => ClientError::Fatal(ErrorType::Io(kind)),
        }
    }
}

pub trait ErrorUtils {
    fn has_failed(&self) -> bool;
}

impl<T> ErrorUtils for ClientResult<T> {
    fn has_failed(&self) -> bool {
        match self {
            Ok(_) => false,
            Err(ClientError::Wait) => false,
            _ => true,
        }
    }
}
