pub use crate::net::client::{Client, EventHandler};
pub use crate::net::connection::{Connection, Login, Status};
pub use crate::net::message::{get_tag, get_tag_value, CommandType, Event};
pub use crate::shared::{ClientError, ClientResult, ErrorType};
pub use crate::{DEFAULT_HOST, DEFAULT_PORT};
