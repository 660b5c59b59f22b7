//! Outbound chat directives. Every operation formats one CRLF-terminated
//! line and pushes it through the send path. Moderation verbs ride inside
//! a PRIVMSG; the server interprets the leading slash.

use crate::net::connection::Connection;
use crate::shared::ClientResult;

impl Connection {
    /// `PASS <password>`. Must precede `NICK`.
    pub fn pass(&mut self, password: &str) -> ClientResult<()> {
        let line = format!("PASS {}", password);
        self.send_line(&line)
    }

    pub fn nick(&mut self, nickname: &str) -> ClientResult<()> {
        let line = format!("NICK {}", nickname);
        self.send_line(&line)
    }

    pub fn join(&mut self, channel: &str) -> ClientResult<()> {
        let line = format!("JOIN {}", channel);
        self.send_line(&line)
    }

    pub fn part(&mut self, channel: &str) -> ClientResult<()> {
        let line = format!("PART {}", channel);
        self.send_line(&line)
    }

    pub fn quit(&mut self) -> ClientResult<()> {
        self.send_line("QUIT")
    }

    pub fn privmsg(&mut self, channel: &str, message: &str) -> ClientResult<()> {
        let line = format!("PRIVMSG {} :{}", channel, message);
        self.send_line(&line)
    }

    /// `/me`: the message renders as an action, via a CTCP envelope.
    pub fn me(&mut self, channel: &str, message: &str) -> ClientResult<()> {
        let line = format!("PRIVMSG {} :\x01ACTION {}\x01", channel, message);
        self.send_line(&line)
    }

    /// Whispers ride through the sender's own channel.
    pub fn whisper(&mut self, target: &str, message: &str) -> ClientResult<()> {
        let line = format!("PRIVMSG #{} :/w {} {}", self.login().nickname, target, message);
        self.send_line(&line)
    }

    /// The reply parameter gets a leading `:` unless the caller already
    /// supplied one.
    pub fn pong(&mut self, parameter: Option<&str>) -> ClientResult<()> {
        let line = match parameter {
            Some(parameter) if parameter.starts_with(':') => format!("PONG {}", parameter),
            Some(parameter) => format!("PONG :{}", parameter),
            None => "PONG".to_owned(),
        };
        self.send_line(&line)
    }

    pub fn ping(&mut self, parameter: Option<&str>) -> ClientResult<()> {
        let line = match parameter {
            Some(parameter) => format!("PING {}", parameter),
            None => "PING".to_owned(),
        };
        self.send_line(&line)
    }

    pub fn cap_req_tags(&mut self) -> ClientResult<()> {
        self.send_line("CAP REQ :twitch.tv/tags")
    }

    pub fn cap_req_commands(&mut self) -> ClientResult<()> {
        self.send_line("CAP REQ :twitch.tv/commands")
    }

    pub fn cap_req_membership(&mut self) -> ClientResult<()> {
        self.send_line("CAP REQ :twitch.tv/membership")
    }

    pub fn cap_req_all(&mut self) -> ClientResult<()> {
        self.send_line("CAP REQ :twitch.tv/tags twitch.tv/commands twitch.tv/membership")
    }

    fn chat_command(&mut self, channel: &str, command: &str) -> ClientResult<()> {
        let line = format!("PRIVMSG {} :/{}", channel, command);
        self.send_line(&line)
    }

    pub fn timeout(&mut self, channel: &str, nickname: &str, seconds: u32) -> ClientResult<()> {
        self.chat_command(channel, &format!("timeout {} {}", nickname, seconds))
    }

    pub fn untimeout(&mut self, channel: &str, nickname: &str) -> ClientResult<()> {
        self.chat_command(channel, &format!("untimeout {}", nickname))
    }

    pub fn ban(&mut self, channel: &str, nickname: &str) -> ClientResult<()> {
        self.chat_command(channel, &format!("ban {}", nickname))
    }

    pub fn unban(&mut self, channel: &str, nickname: &str) -> ClientResult<()> {
        self.chat_command(channel, &format!("unban {}", nickname))
    }

    pub fn slow(&mut self, channel: &str, seconds: Option<u32>) -> ClientResult<()> {
        match seconds {
            Some(seconds) => self.chat_command(channel, &format!("slow {}", seconds)),
            None => self.chat_command(channel, "slow"),
        }
    }

    pub fn slow_off(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "slowoff")
    }

    pub fn followers(&mut self, channel: &str, duration: Option<&str>) -> ClientResult<()> {
        match duration {
            Some(duration) => self.chat_command(channel, &format!("followers {}", duration)),
            None => self.chat_command(channel, "followers"),
        }
    }

    pub fn followers_off(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "followersoff")
    }

    pub fn subscribers(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "subscribers")
    }

    pub fn subscribers_off(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "subscribersoff")
    }

    pub fn clear(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "clear")
    }

    pub fn r9k_beta(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "r9kbeta")
    }

    pub fn r9k_beta_off(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "r9kbetaoff")
    }

    pub fn emote_only(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "emoteonly")
    }

    pub fn emote_only_off(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "emoteonlyoff")
    }

    pub fn commercial(&mut self, channel: &str, seconds: Option<u32>) -> ClientResult<()> {
        match seconds {
            Some(seconds) => self.chat_command(channel, &format!("commercial {}", seconds)),
            None => self.chat_command(channel, "commercial"),
        }
    }

    pub fn host(&mut self, channel: &str, target: &str) -> ClientResult<()> {
        self.chat_command(channel, &format!("host {}", target))
    }

    pub fn unhost(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "unhost")
    }

    pub fn mod_user(&mut self, channel: &str, nickname: &str) -> ClientResult<()> {
        self.chat_command(channel, &format!("mod {}", nickname))
    }

    pub fn unmod_user(&mut self, channel: &str, nickname: &str) -> ClientResult<()> {
        self.chat_command(channel, &format!("unmod {}", nickname))
    }

    pub fn vip(&mut self, channel: &str, nickname: &str) -> ClientResult<()> {
        self.chat_command(channel, &format!("vip {}", nickname))
    }

    pub fn unvip(&mut self, channel: &str, nickname: &str) -> ClientResult<()> {
        self.chat_command(channel, &format!("unvip {}", nickname))
    }

    pub fn delete_message(&mut self, channel: &str, message_id: &str) -> ClientResult<()> {
        self.chat_command(channel, &format!("delete {}", message_id))
    }

    pub fn mods(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "mods")
    }

    pub fn vips(&mut self, channel: &str) -> ClientResult<()> {
        self.chat_command(channel, "vips")
    }

    pub fn color(&mut self, channel: &str, color: &str) -> ClientResult<()> {
        self.chat_command(channel, &format!("color {}", color))
    }

    pub fn marker(&mut self, channel: &str, comment: Option<&str>) -> ClientResult<()> {
        match comment {
            Some(comment) => self.chat_command(channel, &format!("marker {}", comment)),
            None => self.chat_command(channel, "marker"),
        }
    }
}
