//! Newline-delimited frame codec.
//!
//! Works like `LinesCodec` but never fails the stream over a single bad
//! line: oversized lines are discarded up to the next newline, and lines
//! that are not UTF-8 or not JSON come out as per-item errors. Only socket
//! I/O errors end the stream.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;
use crate::frame::Frame;

/// Decodes into `Result<Frame, Error>` so frame-local failures reach the
/// reader without tripping `FramedRead`'s stop-after-error behaviour.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_len: usize,
    /// Bytes already scanned for a newline.
    next_index: usize,
    /// Inside an oversized line, dropping bytes until its newline.
    discarding: bool,
}

impl FrameCodec {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            next_index: 0,
            discarding: false,
        }
    }
}

fn decode_line(line: &[u8]) -> Result<Frame, Error> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = std::str::from_utf8(line)
        .map_err(|e| Error::Framing(format!("frame is not valid UTF-8: {e}")))?;
    Frame::decode(text)
}

impl Decoder for FrameCodec {
    type Item = Result<Frame, Error>;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Error> {
        loop {
            let read_to = buf.len().min(self.max_len.saturating_add(1));
            let newline = buf
                .get(self.next_index..read_to)
                .and_then(|window| window.iter().position(|b| *b == b'\n'));

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    buf.advance(self.next_index + offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let mut line = buf.split_to(end + 1);
                    line.truncate(end);
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Ok(Some(decode_line(&line)));
                }
                (false, None) if buf.len() > self.max_len => {
                    self.discarding = true;
                    return Ok(Some(Err(Error::Framing(format!(
                        "frame longer than {} bytes",
                        self.max_len
                    )))));
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Error> {
        if let Some(item) = self.decode(buf)? {
            return Ok(Some(item));
        }
        self.next_index = 0;
        if self.discarding || buf.iter().all(u8::is_ascii_whitespace) {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }
        let line = buf.split();
        Ok(Some(decode_line(&line)))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Error> {
        let line = frame.encode()?;
        dst.reserve(line.len() + 1);
        dst.put(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
