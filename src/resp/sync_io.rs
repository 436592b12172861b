//! RESP 协议阻塞读写器（客户端使用）

use std::io::{self, BufRead, BufReader, Read, Write};

use super::{
    DEFAULT_MAX_FRAME_SIZE, Header, RespError, RespValue, encode_into, parse_header,
    strip_line_ending,
};

/// RESP 协议阻塞读取器
pub struct RespReader<R: Read> {
    reader: BufReader<R>,
    max_bytes: usize,
    bytes_read: usize,
}

impl<R: Read> RespReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_bytes(reader, DEFAULT_MAX_FRAME_SIZE)
    }

    /// 指定单帧最大字节数
    pub fn with_max_bytes(reader: R, max_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_bytes,
            bytes_read: 0,
        }
    }

    /// 读取下一个完整的 RESP 值
    pub fn read_value(&mut self) -> Result<RespValue, RespError> {
        self.bytes_read = 0;
        self.read_frame()
    }

    fn check_frame_size(&mut self, additional: usize) -> Result<(), RespError> {
        self.bytes_read = self.bytes_read.saturating_add(additional);
        if self.bytes_read > self.max_bytes {
            Err(RespError::FrameTooLarge(self.bytes_read, self.max_bytes))
        } else {
            Ok(())
        }
    }

    fn read_frame(&mut self) -> Result<RespValue, RespError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Err(RespError::UnexpectedEof);
        }
        self.check_frame_size(n)?;

        match parse_header(strip_line_ending(&line)?)? {
            Header::Simple(s) => Ok(RespValue::SimpleString(s)),
            Header::Error(e) => Ok(RespValue::Error(e)),
            Header::Integer(i) => Ok(RespValue::Integer(i)),
            Header::Null => Ok(RespValue::Null),
            Header::Bulk(len) => {
                self.check_frame_size(len + 2)?;
                let mut buffer = vec![0u8; len + 2];
                self.reader.read_exact(&mut buffer)?;
                if !buffer.ends_with(b"\r\n") {
                    return Err(RespError::InvalidFormat(
                        "Expected \\r\\n after bulk string".to_string(),
                    ));
                }
                buffer.truncate(len);
                Ok(RespValue::BulkString(Some(buffer)))
            }
            Header::Array(count) => {
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_frame()?);
                }
                Ok(RespValue::Array(items))
            }
        }
    }
}

/// RESP 协议阻塞写入器
pub struct RespWriter<W: Write> {
    writer: W,
    buf: Vec<u8>,
}

impl<W: Write> RespWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buf: Vec::new(),
        }
    }

    /// 编码并写出一个 RESP 值
    pub fn write_value(&mut self, value: &RespValue) -> io::Result<()> {
        self.buf.clear();
        encode_into(value, &mut self.buf);
        self.writer.write_all(&self.buf)?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_bulk_string() {
        let mut reader = RespReader::new(Cursor::new(b"$5\r\nhello\r\n".to_vec()));
        assert_eq!(
            reader.read_value().unwrap(),
            RespValue::BulkString(Some(b"hello".to_vec()))
        );
    }

    #[test]
    fn test_read_binary_bulk_string() {
        let mut reader = RespReader::new(Cursor::new(b"$4\r\n\r\n\xff\x00\r\n".to_vec()));
        assert_eq!(
            reader.read_value().unwrap(),
            RespValue::BulkString(Some(vec![b'\r', b'\n', 0xff, 0x00]))
        );
    }

    #[test]
    fn test_read_nested_array() {
        let data = b"*2\r\n:1\r\n*2\r\n$1\r\na\r\n$-1\r\n".to_vec();
        let mut reader = RespReader::new(Cursor::new(data));
        assert_eq!(
            reader.read_value().unwrap(),
            RespValue::Array(vec![
                RespValue::Integer(1),
                RespValue::Array(vec![RespValue::bulk(b"a".to_vec()), RespValue::Null]),
            ])
        );
    }

    #[test]
    fn test_read_sequence_and_eof() {
        let mut reader = RespReader::new(Cursor::new(b"+OK\r\n-ERR bad\r\n".to_vec()));
        assert_eq!(reader.read_value().unwrap(), RespValue::ok());
        assert_eq!(
            reader.read_value().unwrap(),
            RespValue::Error("ERR bad".to_string())
        );
        assert!(matches!(reader.read_value(), Err(RespError::UnexpectedEof)));
    }

    #[test]
    fn test_missing_crlf_after_bulk() {
        let mut reader = RespReader::new(Cursor::new(b"$2\r\nhiXX".to_vec()));
        assert!(matches!(
            reader.read_value(),
            Err(RespError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_frame_too_large() {
        let mut reader = RespReader::with_max_bytes(Cursor::new(b"$9999\r\n".to_vec()), 64);
        assert!(matches!(
            reader.read_value(),
            Err(RespError::FrameTooLarge(_, 64))
        ));
    }

    #[test]
    fn test_write_value() {
        let mut out = Vec::new();
        RespWriter::new(&mut out)
            .write_value(&RespValue::command(["GET", "key"]))
            .unwrap();
        assert_eq!(out, b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n");
    }
}
