//! Pull-style body reader fed by the curl transfer thread.

use std::io::{self, Read};
use std::sync::mpsc::Receiver;

/// Adapts a channel of body chunks into `Read`. A closed channel is end of body;
/// an `Err` item is a transfer failure after the headers arrived.
/// Dropping the reader makes the sending side abort its transfer.
pub struct ChannelReader {
    rx: Receiver<io::Result<Vec<u8>>>,
    buf: Vec<u8>,
    pos: usize,
    done: bool,
}

impl ChannelReader {
    pub fn new(rx: Receiver<io::Result<Vec<u8>>>) -> Self {
        Self {
            rx,
            buf: Vec::new(),
            pos: 0,
            done: false,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.buf.len() {
            if self.done {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                Ok(Err(e)) => {
                    self.done = true;
                    return Err(e);
                }
                Err(_) => {
                    self.done = true;
                    return Ok(0);
                }
            }
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn reads_chunks_across_boundaries_then_eof() {
        let (tx, rx) = mpsc::sync_channel(4);
        tx.send(Ok(b"hello ".to_vec())).unwrap();
        tx.send(Ok(Vec::new())).unwrap();
        tx.send(Ok(b"world".to_vec())).unwrap();
        drop(tx);
        let mut reader = ChannelReader::new(rx);
        let mut small = [0u8; 4];
        assert_eq!(reader.read(&mut small).unwrap(), 4);
        assert_eq!(&small, b"hell");
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"o world");
        assert_eq!(reader.read(&mut small).unwrap(), 0);
    }

    #[test]
    fn error_item_surfaces_once() {
        let (tx, rx) = mpsc::sync_channel(2);
        tx.send(Ok(b"ab".to_vec())).unwrap();
        tx.send(Err(io::Error::new(io::ErrorKind::TimedOut, "stall")))
            .unwrap();
        let mut reader = ChannelReader::new(rx);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }
}
