use std::io;

/// Size of the inbound buffer. A single message that exceeds this without a
/// line terminator cannot be framed and is surfaced as an error upstream.
pub const READ_BUF_SIZE: usize = 2048;

/// Fixed-size FIFO byte buffer for inbound data. Bytes are appended at the
/// tail by `ingress` and released from the front by `consume`, which moves
/// the remainder back to offset zero in one block.
pub struct Buffer {
    data: Box<[u8]>,
    len: usize,
}

impl Buffer {
    #[inline]
    pub fn new(size: usize) -> Buffer {
        Buffer {
            data: vec![0; size].into_boxed_slice(),
            len: 0,
        }
    }

    /// The number of unconsumed bytes in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remaining free capacity in the buffer.
    #[inline]
    pub fn free_capacity(&self) -> usize {
        self.data.len() - self.len
    }

    /// Unconsumed bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Unconsumed bytes, mutable. Tag values are decoded in place here.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// Releases `count` bytes from the front and compacts the remainder.
    #[inline]
    pub fn consume(&mut self, count: usize) {
        assert!(count <= self.len, "consumed more than the buffer holds");
        self.data.copy_within(count..self.len, 0);
        self.len -= count;
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Reads from `reader` into the free tail until the reader would block
    /// or the buffer is full. Returns the number of bytes added and whether
    /// the reader reported end-of-stream.
    pub fn ingress<R: io::Read>(&mut self, reader: &mut R) -> io::Result<(usize, bool)> {
        let mut total = 0;

        while self.len < self.data.len() {
            match reader.read(&mut self.data[self.len..]) {
                Ok(0) => return Ok((total, true)),
                Ok(count) => {
                    self.len += count;
                    total += count;
                }
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        Ok((total, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::min;

    struct MockChannel {
        data: Vec<u8>,
        cursor: usize,
        chunk: usize,
        eof: bool,
        interruptions: usize,
    }

    impl MockChannel {
        fn new(data: Vec<u8>, chunk: usize) -> MockChannel {
            MockChannel {
                data,
                cursor: 0,
                chunk,
                eof: false,
                interruptions: 0,
            }
        }
    }

    impl io::Read for MockChannel {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interruptions > 0 {
                self.interruptions -= 1;
                return Err(io::ErrorKind::Interrupted.into());
            }

            if self.cursor == self.data.len() {
                if self.eof {
                    return Ok(0);
                }
                return Err(io::ErrorKind::WouldBlock.into());
            }

            let offset = min(min(self.chunk, buf.len()), self.data.len() - self.cursor);
            buf[..offset].copy_from_slice(&self.data[self.cursor..(self.cursor + offset)]);
            self.cursor += offset;
            Ok(offset)
        }
    }

    #[test]
    fn test_ingress_chunked() {
        let payload: Vec<_> = (0..600).map(|item| item as u8).collect();
        let mut channel = MockChannel::new(payload.clone(), 64);
        let mut buffer = Buffer::new(READ_BUF_SIZE);

        let (count, eof) = buffer.ingress(&mut channel).unwrap();

        assert_eq!(count, payload.len());
        assert!(!eof);
        assert_eq!(buffer.data(), &payload[..]);
    }

    #[test]
    fn test_ingress_reports_eof() {
        let mut channel = MockChannel::new(vec![1, 2, 3], 16);
        channel.eof = true;

        let mut buffer = Buffer::new(READ_BUF_SIZE);

        let (count, eof) = buffer.ingress(&mut channel).unwrap();

        assert_eq!(count, 3);
        assert!(eof);
        assert_eq!(buffer.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_ingress_stops_when_full() {
        let payload = vec![7u8; READ_BUF_SIZE * 2];
        let mut channel = MockChannel::new(payload, 500);
        let mut buffer = Buffer::new(READ_BUF_SIZE);

        let (count, eof) = buffer.ingress(&mut channel).unwrap();

        assert_eq!(count, READ_BUF_SIZE);
        assert!(!eof);
        assert_eq!(buffer.free_capacity(), 0);
    }

    #[test]
    fn test_ingress_retries_after_interruption() {
        let mut channel = MockChannel::new(vec![9; 10], 10);
        channel.interruptions = 2;

        let mut buffer = Buffer::new(READ_BUF_SIZE);

        let (count, _) = buffer.ingress(&mut channel).unwrap();

        assert_eq!(count, 10);
    }

    #[test]
    fn test_consume_compacts_to_front() {
        let mut channel = MockChannel::new(b"abcdef".to_vec(), 6);
        let mut buffer = Buffer::new(READ_BUF_SIZE);
        buffer.ingress(&mut channel).unwrap();

        buffer.consume(2);

        assert_eq!(buffer.data(), b"cdef");
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.free_capacity(), READ_BUF_SIZE - 4);

        buffer.consume(4);

        assert!(buffer.is_empty());
    }

    #[test]
    #[should_panic(expected = "consumed more than the buffer holds")]
    fn test_consume_beyond_len_panics() {
        let mut buffer = Buffer::new(READ_BUF_SIZE);
        buffer.consume(1);
    }
}
