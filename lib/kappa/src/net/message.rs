//! Semantic event model. A parsed line is classified into a `CommandType`
//! and the channel/target/message fields the handler actually wants.

use crate::net::codec::{Line, Tag};

/// Semantic classification of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Unknown,
    Cap,
    Authenticated,
    GlobalUserState,
    Join,
    Part,
    ClearChat,
    RoomState,
    UserState,
    Moderator,
    HostTarget,
    Privmsg,
    ClearMsg,
    Notice,
    UserNotice,
    Whisper,
    Ping,
    Names,
    EndOfNames,
    Reconnect,
    InvalidCommand,
    CtcpAction,
}

/// One inbound chat event. Every view borrows the connection's read
/// buffer and is valid for the duration of the callback only.
#[derive(Debug)]
pub struct Event<'a> {
    pub raw: &'a str,
    pub tags: Vec<Tag<'a>>,
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub args: Vec<&'a str>,
    pub parameter: Option<&'a str>,
    pub ctcp: Option<&'a str>,

    pub kind: CommandType,
    pub origin: Option<&'a str>,
    pub channel: Option<&'a str>,
    pub target: Option<&'a str>,
    pub message: Option<&'a str>,
}

impl<'a> Event<'a> {
    /// Derives the semantic fields from the syntactic line. Side effects
    /// (status flags, automatic replies) are the dispatcher's business.
    pub fn classify(line: Line<'a>) -> Event<'a> {
        let Line {
            raw,
            tags,
            prefix,
            command,
            args,
            parameter,
            ctcp,
        } = line;

        let origin = prefix.and_then(|prefix| prefix.split_once('!')).map(|(nick, _)| nick);

        let mut event = Event {
            raw,
            tags,
            prefix,
            command,
            args,
            parameter,
            ctcp,
            kind: CommandType::Unknown,
            origin,
            channel: None,
            target: None,
            message: None,
        };

        // A CTCP envelope takes precedence; only ACTION is understood.
        if let Some(ctcp) = event.ctcp {
            if ctcp == "ACTION" {
                event.kind = CommandType::CtcpAction;
                event.channel = event.args.first().copied();
                event.message = event.parameter;
            }
            return event;
        }

        match event.command {
            "CAP" => event.kind = CommandType::Cap,
            "001" => event.kind = CommandType::Authenticated,
            "GLOBALUSERSTATE" => event.kind = CommandType::GlobalUserState,
            "JOIN" => {
                event.kind = CommandType::Join;
                event.channel = event.args.first().copied();
            }
            "PART" => {
                event.kind = CommandType::Part;
                event.channel = event.args.first().copied();
            }
            "CLEARCHAT" => {
                event.kind = CommandType::ClearChat;
                event.channel = event.args.first().copied();
            }
            "ROOMSTATE" => {
                event.kind = CommandType::RoomState;
                event.channel = event.args.first().copied();
            }
            "USERSTATE" => {
                event.kind = CommandType::UserState;
                event.channel = event.args.first().copied();
            }
            "MODE" => {
                event.kind = CommandType::Moderator;
                event.channel = event.args.first().copied();
            }
            "HOSTTARGET" => {
                event.kind = CommandType::HostTarget;
                event.target = event.parameter.and_then(|parameter| parameter.split_whitespace().next());
            }
            "PRIVMSG" => {
                event.kind = CommandType::Privmsg;
                event.channel = event.args.first().copied();
                event.message = event.parameter;
            }
            "CLEARMSG" => {
                event.kind = CommandType::ClearMsg;
                event.channel = event.args.first().copied();
                event.message = event.parameter;
            }
            "NOTICE" => {
                event.kind = CommandType::Notice;
                event.channel = event.args.first().copied();
                event.message = event.parameter;
            }
            "USERNOTICE" => {
                event.kind = CommandType::UserNotice;
                event.channel = event.args.first().copied();
                event.message = event.parameter;
            }
            "WHISPER" => {
                event.kind = CommandType::Whisper;
                event.channel = event.args.first().copied();
                event.message = event.parameter;
            }
            "PING" => event.kind = CommandType::Ping,
            "353" => {
                event.kind = CommandType::Names;
                event.channel = event.args.get(2).copied();
            }
            "366" => {
                event.kind = CommandType::EndOfNames;
                event.channel = event.args.get(1).copied();
            }
            "421" => event.kind = CommandType::InvalidCommand,
            "RECONNECT" => event.kind = CommandType::Reconnect,
            _ => {}
        }

        event
    }
}

/// Linear lookup of a tag by key. Tag counts per message are small.
#[inline]
pub fn get_tag<'a, 'b>(tags: &'b [Tag<'a>], key: &str) -> Option<&'b Tag<'a>> {
    tags.iter().find(|tag| tag.key == key)
}

/// The decoded value of the tag under `key`, if present.
#[inline]
pub fn get_tag_value<'a>(tags: &[Tag<'a>], key: &str) -> Option<&'a str> {
    get_tag(tags, key).map(|tag| tag.value)
}
