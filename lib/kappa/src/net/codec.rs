//! Wire-level parsing for the tagged IRC dialect spoken by the chat
//! service: CRLF framing, message tags with their escape scheme, prefix
//! and command tokenization, and CTCP envelope stripping.

use std::ops::Range;
use std::str;

use crate::shared::{ClientError, ClientResult, ErrorType};

const CTCP_MARKER: u8 = 0x01;

/// A single message tag in decoded form. A key-only tag carries an empty
/// value. Order within a message is preserved as parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// Syntactic form of one inbound message. All views borrow the line the
/// message was parsed from.
#[derive(Debug)]
pub struct Line<'a> {
    pub raw: &'a str,
    pub tags: Vec<Tag<'a>>,
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub args: Vec<&'a str>,
    pub parameter: Option<&'a str>,
    pub ctcp: Option<&'a str>,
}

/// Finds the first CRLF in `data` and returns the message length without
/// the delimiter. The caller consumes `length + 2` bytes per message.
#[inline]
pub fn find_message(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|pair| pair == b"\r\n")
}

/// Decodes the tag-value escapes in place and returns the decoded length.
/// The write index never overtakes the read index, so decoding within the
/// original span is safe.
pub fn unescape_in_place(value: &mut [u8]) -> usize {
    let mut write = 0;
    let mut read = 0;

    while read < value.len() {
        let byte = value[read];

        if byte != b'\\' {
            value[write] = byte;
            write += 1;
            read += 1;
            continue;
        }

        // A lone backslash at the end of the value is dropped.
        if read + 1 == value.len() {
            break;
        }

        value[write] = match value[read + 1] {
            b':' => b';',
            b's' => b' ',
            b'r' => b'\r',
            b'n' => b'\n',
            other => other,
        };
        write += 1;
        read += 2;
    }

    write
}

#[inline]
fn position(data: &[u8], range: Range<usize>, byte: u8) -> Option<usize> {
    data[range.clone()].iter().position(|&b| b == byte).map(|p| range.start + p)
}

#[inline]
fn malformed<T>() -> ClientResult<T> {
    Err(ClientError::Fatal(ErrorType::Malformed))
}

/// Parses one complete message, the CRLF delimiter already stripped. Tag
/// values are decoded destructively inside `line` and the tag block is
/// compacted, so the returned `raw` view shows decoded values.
pub fn parse(line: &mut [u8]) -> ClientResult<Line<'_>> {
    let mut len = line.len();
    let mut tag_spans: Vec<(Range<usize>, Range<usize>)> = Vec::new();
    let mut cursor = 0;

    // Tag block: "@k=v;k2=v2 " ahead of the rest of the message. Values
    // are decoded in place; the block is compacted so the line stays
    // contiguous for the raw view.
    if line.first() == Some(&b'@') {
        let space = match position(line, 0..len, b' ') {
            Some(space) => space,
            None => return malformed(),
        };

        let mut write = 1;
        let mut token = 1;

        while token < space {
            let token_end = position(line, token..space, b';').unwrap_or(space);

            if token_end > token {
                // Decoded values only shrink, so the write index trails the
                // read index and the separators can be rewritten in place.
                if write > 1 {
                    line[write] = b';';
                    write += 1;
                }

                let eq = position(line, token..token_end, b'=');

                let key_len = eq.unwrap_or(token_end) - token;
                line.copy_within(token..token + key_len, write);
                let key_span = write..write + key_len;
                write += key_len;

                let value_span = match eq {
                    Some(eq) => {
                        line[write] = b'=';
                        write += 1;

                        let value_len = token_end - (eq + 1);
                        line.copy_within(eq + 1..token_end, write);
                        let decoded = unescape_in_place(&mut line[write..write + value_len]);
                        let span = write..write + decoded;
                        write += decoded;
                        span
                    }
                    None => write..write,
                };

                tag_spans.push((key_span, value_span));
            }

            token = token_end + 1;
        }

        line[write] = b' ';
        let shift = space - write;
        line.copy_within(space + 1..len, write + 1);
        len -= shift;
        cursor = write + 1;
    }

    // Source prefix. A message that opens with ':' but has no space after
    // the prefix cannot carry a command and fails to parse.
    let mut prefix_span = None;
    if line.get(cursor) == Some(&b':') {
        let space = match position(line, cursor..len, b' ') {
            Some(space) => space,
            None => return malformed(),
        };
        prefix_span = Some(cursor + 1..space);
        cursor = space + 1;
    }

    // Command and arguments ahead of the first ':'; everything after it is
    // the trailing parameter.
    let colon = position(line, cursor..len, b':');
    let (head_span, mut parameter_span) = match colon {
        Some(colon) => (cursor..colon, Some(colon + 1..len)),
        None => (cursor..len, None),
    };

    // CTCP envelope: a parameter bracketed by 0x01 bytes carries a
    // sub-command and its own payload, separated by the first space.
    let mut ctcp_span = None;
    if let Some(param) = parameter_span.clone() {
        if param.len() >= 2 && line[param.start] == CTCP_MARKER && line[param.end - 1] == CTCP_MARKER {
            let inner = param.start + 1..param.end - 1;
            let space = match position(line, inner.clone(), b' ') {
                Some(space) => space,
                None => return malformed(),
            };
            ctcp_span = Some(inner.start..space);
            parameter_span = Some(space + 1..inner.end);
        }
    }

    // Mutation is done; reborrow the line as text and cut the views.
    let bytes: &[u8] = line;
    let raw = match str::from_utf8(&bytes[..len]) {
        Ok(raw) => raw,
        Err(_) => return malformed(),
    };

    let mut words = raw[head_span].trim().split(' ').filter(|word| !word.is_empty());
    let command = match words.next() {
        Some(command) => command,
        None => return malformed(),
    };
    let args: Vec<&str> = words.collect();

    Ok(Line {
        raw,
        tags: tag_spans
            .into_iter()
            .map(|(key, value)| Tag {
                key: &raw[key],
                value: &raw[value],
            })
            .collect(),
        prefix: prefix_span.map(|span| &raw[span]),
        command,
        args,
        parameter: parameter_span.map(|span| &raw[span]),
        ctcp: ctcp_span.map(|span| &raw[span]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unescape(value: &str) -> String {
        let mut bytes = value.as_bytes().to_vec();
        let len = unescape_in_place(&mut bytes);
        String::from_utf8(bytes[..len].to_vec()).unwrap()
    }

    fn escape(value: &str) -> String {
        let mut out = String::new();
        for ch in value.chars() {
            match ch {
                ';' => out.push_str("\\:"),
                ' ' => out.push_str("\\s"),
                '\\' => out.push_str("\\\\"),
                '\r' => out.push_str("\\r"),
                '\n' => out.push_str("\\n"),
                other => out.push(other),
            }
        }
        out
    }

    #[test]
    fn test_find_message() {
        assert_eq!(find_message(b"PING :x\r\nrest"), Some(7));
        assert_eq!(find_message(b"\r\n"), Some(0));
        assert_eq!(find_message(b"partial line"), None);
        assert_eq!(find_message(b"split\rhere"), None);
    }

    #[test]
    fn test_unescape_rules() {
        assert_eq!(unescape(r"Hello\sworld\:\\"), "Hello world;\\");
        assert_eq!(unescape(r"\r\n"), "\r\n");
        assert_eq!(unescape(r"\q"), "q");
        assert_eq!(unescape("trailing\\"), "trailing");
        assert_eq!(unescape("plain"), "plain");
        assert_eq!(unescape(""), "");
    }

    #[test]
    fn test_unescape_roundtrip() {
        for value in &["Hello world;\\", "a;b c", "line\r\nbreak", "émoji ok"] {
            let mut encoded = escape(value).into_bytes();
            let len = unescape_in_place(&mut encoded);
            assert_eq!(&encoded[..len], value.as_bytes());
        }
    }

    #[test]
    fn test_parse_tagged_privmsg() {
        let mut line =
            b"@display-name=Alice;user-id=42 :alice!alice@alice.tmi.twitch.tv PRIVMSG #foo :hello world"
                .to_vec();
        let message = parse(&mut line).unwrap();

        assert_eq!(message.command, "PRIVMSG");
        assert_eq!(message.args, vec!["#foo"]);
        assert_eq!(message.parameter, Some("hello world"));
        assert_eq!(message.prefix, Some("alice!alice@alice.tmi.twitch.tv"));
        assert_eq!(message.ctcp, None);
        assert_eq!(
            message.tags,
            vec![
                Tag { key: "display-name", value: "Alice" },
                Tag { key: "user-id", value: "42" },
            ]
        );
    }

    #[test]
    fn test_parse_decodes_tag_values_in_place() {
        let mut line = b"@system-msg=Hello\\sworld\\:\\\\ PING".to_vec();
        let message = parse(&mut line).unwrap();

        assert_eq!(message.command, "PING");
        assert_eq!(message.tags.len(), 1);
        assert_eq!(message.tags[0].key, "system-msg");
        assert_eq!(message.tags[0].value, "Hello world;\\");
        // The whole line was compacted around the decoded value.
        assert_eq!(message.raw, "@system-msg=Hello world;\\ PING");
    }

    #[test]
    fn test_parse_key_only_tag() {
        let mut line = b"@r9k;slow=0 ROOMSTATE #foo".to_vec();
        let message = parse(&mut line).unwrap();

        assert_eq!(
            message.tags,
            vec![Tag { key: "r9k", value: "" }, Tag { key: "slow", value: "0" }]
        );
        assert_eq!(message.command, "ROOMSTATE");
        assert_eq!(message.args, vec!["#foo"]);
    }

    #[test]
    fn test_parse_ping() {
        let mut line = b"PING :tmi.twitch.tv".to_vec();
        let message = parse(&mut line).unwrap();

        assert_eq!(message.command, "PING");
        assert!(message.args.is_empty());
        assert_eq!(message.parameter, Some("tmi.twitch.tv"));
        assert_eq!(message.prefix, None);
    }

    #[test]
    fn test_parse_numeric_with_args() {
        let mut line = b":tmi.twitch.tv 353 alice = #foo :alice bob".to_vec();
        let message = parse(&mut line).unwrap();

        assert_eq!(message.command, "353");
        assert_eq!(message.args, vec!["alice", "=", "#foo"]);
        assert_eq!(message.parameter, Some("alice bob"));
        assert_eq!(message.prefix, Some("tmi.twitch.tv"));
    }

    #[test]
    fn test_parse_without_trailing() {
        let mut line = b"JOIN #foo".to_vec();
        let message = parse(&mut line).unwrap();

        assert_eq!(message.command, "JOIN");
        assert_eq!(message.args, vec!["#foo"]);
        assert_eq!(message.parameter, None);
    }

    #[test]
    fn test_parse_ctcp_action() {
        let mut line = b":alice!alice@tmi PRIVMSG #foo :\x01ACTION waves\x01".to_vec();
        let message = parse(&mut line).unwrap();

        assert_eq!(message.ctcp, Some("ACTION"));
        assert_eq!(message.parameter, Some("waves"));
        assert_eq!(message.command, "PRIVMSG");
        assert_eq!(message.args, vec!["#foo"]);
    }

    #[test]
    fn test_parse_ctcp_without_space_fails() {
        let mut line = b"PRIVMSG #foo :\x01VERSION\x01".to_vec();

        assert_eq!(parse(&mut line).unwrap_err(), ClientError::Fatal(ErrorType::Malformed));
    }

    #[test]
    fn test_parse_prefix_without_space_fails() {
        let mut line = b":lonely.prefix".to_vec();

        assert_eq!(parse(&mut line).unwrap_err(), ClientError::Fatal(ErrorType::Malformed));
    }

    #[test]
    fn test_parse_empty_line_fails() {
        let mut line = Vec::new();

        assert_eq!(parse(&mut line).unwrap_err(), ClientError::Fatal(ErrorType::Malformed));
    }

    #[test]
    fn test_parse_invalid_utf8_fails() {
        let mut line = b"PING :\xff\xfe".to_vec();

        assert_eq!(parse(&mut line).unwrap_err(), ClientError::Fatal(ErrorType::Malformed));
    }
}
