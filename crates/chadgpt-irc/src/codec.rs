use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

use crate::error::IrcError;
use crate::message::Message;

/// Servers may send up to 8191 bytes of tags plus a 512-byte message.
pub const MAX_LINE_BYTES: usize = 8191 + 512;

/// Line codec for IRC.
///
/// Lines end in `\n` (optionally preceded by `\r`). Invalid UTF-8 is decoded
/// lossily because many networks still carry legacy encodings. Unparseable
/// lines are skipped rather than ending the stream.
#[derive(Debug, Default)]
pub struct IrcCodec {
    next_index: usize,
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = IrcError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Message>, IrcError> {
        loop {
            let Some(offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') else {
                if buf.len() > MAX_LINE_BYTES {
                    return Err(IrcError::LineTooLong {
                        max: MAX_LINE_BYTES,
                    });
                }
                self.next_index = buf.len();
                return Ok(None);
            };

            let line_end = self.next_index + offset;
            self.next_index = 0;
            let raw = buf.split_to(line_end + 1);
            let line = String::from_utf8_lossy(&raw[..line_end]);
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            trace!(line = %line, "<<");
            match Message::parse(line) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => {
                    warn!(error = %e, "skipping unparseable line");
                    continue;
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Message>, IrcError> {
        match self.decode(buf)? {
            Some(msg) => Ok(Some(msg)),
            None => {
                // A final line without a terminator is discarded.
                buf.advance(buf.len());
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = IrcError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), IrcError> {
        let line = msg.to_string();
        if line.contains(['\r', '\n']) {
            return Err(IrcError::Parse(format!(
                "refusing to send line with embedded line break: {line:?}"
            )));
        }
        trace!(line = %line, ">>");
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_multiple_lines_and_partial_tail() {
        let mut codec = IrcCodec::default();
        let mut buf = BytesMut::from(&b"PING :a\r\n:x!y@z QUIT :bye\r\nPRIV"[..]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.command, "PING");
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.command, "QUIT");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"MSG #c :hi\n");
        let third = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(third.params, vec!["#c", "hi"]);
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let mut codec = IrcCodec::default();
        let mut buf = BytesMut::from(&b":a!b@c PRIVMSG #c :caf\xe9\r\n"[..]);
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert!(msg.params[1].starts_with("caf"));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut codec = IrcCodec::default();
        let mut buf = BytesMut::from(&b"\r\n\r\nPING x\r\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().command, "PING");
    }

    #[test]
    fn encodes_with_crlf() {
        let mut codec = IrcCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(Message::join("#rust"), &mut buf).unwrap();
        assert_eq!(&buf[..], b"JOIN #rust\r\n");
    }

    #[test]
    fn refuses_embedded_newlines() {
        let mut codec = IrcCodec::default();
        let mut buf = BytesMut::new();
        let err = codec.encode(Message::privmsg("#c", "a\r\nQUIT"), &mut buf);
        assert!(err.is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn overlong_line_is_an_error() {
        let mut codec = IrcCodec::default();
        let mut buf = BytesMut::from(vec![b'a'; MAX_LINE_BYTES + 1].as_slice());
        assert!(matches!(
            codec.decode(&mut buf),
            Err(IrcError::LineTooLong { .. })
        ));
    }
}
