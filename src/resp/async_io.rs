//! RESP 协议异步读写器（内嵌服务器使用）

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::{
    DEFAULT_MAX_FRAME_SIZE, Header, RespError, RespValue, encode_into, parse_header,
    strip_line_ending,
};

/// RESP 协议异步读取器
pub struct AsyncRespReader<R: AsyncRead + Unpin> {
    reader: BufReader<R>,
    max_bytes: usize,
    bytes_read: usize,
}

impl<R: AsyncRead + Unpin> AsyncRespReader<R> {
    /// 创建新的异步读取器（使用默认最大帧大小）
    pub fn new(reader: R) -> Self {
        Self::with_max_bytes(reader, DEFAULT_MAX_FRAME_SIZE)
    }

    /// 创建新的异步读取器（指定最大帧大小）
    ///
    /// # Arguments
    /// * `reader` - 异步读取器
    /// * `max_bytes` - 单帧最大字节数，超出返回 [`RespError::FrameTooLarge`]
    pub fn with_max_bytes(reader: R, max_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_bytes,
            bytes_read: 0,
        }
    }

    /// 读取下一个完整的 RESP 值，连接正常关闭时返回 [`RespError::UnexpectedEof`]
    pub async fn read_value(&mut self) -> Result<RespValue, RespError> {
        self.bytes_read = 0;
        self.read_frame().await
    }

    fn check_frame_size(&mut self, additional: usize) -> Result<(), RespError> {
        self.bytes_read = self.bytes_read.saturating_add(additional);
        if self.bytes_read > self.max_bytes {
            Err(RespError::FrameTooLarge(self.bytes_read, self.max_bytes))
        } else {
            Ok(())
        }
    }

    /// 用显式栈代替递归解析嵌套数组，避免装箱递归 future
    async fn read_frame(&mut self) -> Result<RespValue, RespError> {
        // (剩余元素数, 已解析元素)
        let mut stack: Vec<(usize, Vec<RespValue>)> = Vec::new();

        loop {
            let mut value = match self.read_header().await? {
                Header::Simple(s) => RespValue::SimpleString(s),
                Header::Error(e) => RespValue::Error(e),
                Header::Integer(i) => RespValue::Integer(i),
                Header::Null => RespValue::Null,
                Header::Bulk(len) => self.read_bulk(len).await?,
                Header::Array(0) => RespValue::Array(Vec::new()),
                Header::Array(count) => {
                    stack.push((count, Vec::with_capacity(count)));
                    continue;
                }
            };

            loop {
                let Some((remaining, items)) = stack.last_mut() else {
                    return Ok(value);
                };
                items.push(value);
                *remaining -= 1;
                if *remaining > 0 {
                    break;
                }
                let done = std::mem::take(items);
                stack.pop();
                value = RespValue::Array(done);
            }
        }
    }

    async fn read_header(&mut self) -> Result<Header, RespError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(RespError::UnexpectedEof);
        }
        self.check_frame_size(n)?;
        parse_header(strip_line_ending(&line)?)
    }

    async fn read_bulk(&mut self, len: usize) -> Result<RespValue, RespError> {
        self.check_frame_size(len + 2)?;
        let mut buffer = vec![0u8; len + 2];
        self.reader.read_exact(&mut buffer).await?;
        if !buffer.ends_with(b"\r\n") {
            return Err(RespError::InvalidFormat(
                "Expected \\r\\n after bulk string".to_string(),
            ));
        }
        buffer.truncate(len);
        Ok(RespValue::BulkString(Some(buffer)))
    }
}

/// RESP 协议异步写入器
pub struct AsyncRespWriter<W: AsyncWrite + Unpin> {
    writer: W,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> AsyncRespWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buf: Vec::new(),
        }
    }

    /// 编码并写出一个 RESP 值
    pub async fn write_value(&mut self, value: &RespValue) -> std::io::Result<()> {
        self.buf.clear();
        encode_into(value, &mut self.buf);
        self.writer.write_all(&self.buf).await?;
        self.writer.flush().await
    }
}
