//! Fragment sources for the stream renderer.

use std::io::{ErrorKind, Read};
use std::thread;
use std::time::Duration;

use crate::error::{LbqError, Result};

pub const DEFAULT_CAPACITY: usize = 8192;

/// Decodes a byte stream into UTF-8 text fragments as the bytes arrive.
///
/// Each successful read yields one fragment. A character split across two
/// reads is held back until its remaining bytes arrive. On an invalid byte the
/// whole pending read is rejected, including any valid text before it, and
/// iteration stops.
pub struct Utf8Chunks<R> {
    reader: R,
    buf: Vec<u8>,
    pending: Vec<u8>,
    done: bool,
}

impl<R: Read> Utf8Chunks<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, reader)
    }

    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            reader,
            buf: vec![0; capacity.max(1)],
            pending: Vec::new(),
            done: false,
        }
    }

    fn fail(&mut self, err: LbqError) -> Option<Result<String>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<R: Read> Iterator for Utf8Chunks<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let read = match self.reader.read(&mut self.buf) {
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return self.fail(err.into()),
            };
            if read == 0 {
                self.done = true;
                if self.pending.is_empty() {
                    return None;
                }
                return Some(Err(LbqError::Message(
                    "stream ended inside a UTF-8 sequence".to_string(),
                )));
            }

            self.pending.extend_from_slice(&self.buf[..read]);
            let valid = match std::str::from_utf8(&self.pending) {
                Ok(_) => self.pending.len(),
                Err(err) if err.error_len().is_some() => {
                    return self.fail(LbqError::Message(format!(
                        "stream is not valid UTF-8: {}",
                        err
                    )));
                }
                Err(err) => err.valid_up_to(),
            };
            if valid == 0 {
                continue;
            }
            let rest = self.pending.split_off(valid);
            let decoded = std::mem::replace(&mut self.pending, rest);
            return Some(String::from_utf8(decoded).map_err(|err| {
                self.done = true;
                LbqError::Message(format!("stream is not valid UTF-8: {}", err))
            }));
        }
    }
}

/// Splits `text` into fragments of at most `size` characters.
pub fn split_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Delays every fragment after the first by a fixed interval.
pub struct Paced<I> {
    inner: I,
    delay: Duration,
    started: bool,
}

pub fn paced<I: IntoIterator>(fragments: I, delay: Duration) -> Paced<I::IntoIter> {
    Paced {
        inner: fragments.into_iter(),
        delay,
        started: false,
    }
}

impl<I: Iterator> Iterator for Paced<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        if self.started && !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.started = true;
        Some(item)
    }
}
