//! Redis 协议 (RESP2) 支持
//!
//! 客户端 ([`crate::store::RemoteStore`]) 使用阻塞读写器，
//! 内嵌服务器 ([`crate::server`]) 使用异步读写器，两者共享帧头解析与编码逻辑。

mod async_io;
mod sync_io;

pub use async_io::{AsyncRespReader, AsyncRespWriter};
pub use sync_io::{RespReader, RespWriter};

use std::io;

/// 默认最大帧大小：512MB
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// 单个数组允许的最大元素个数
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// RESP 数据类型
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// 简单字符串: +OK\r\n
    SimpleString(String),
    /// 错误: -ERR message\r\n
    Error(String),
    /// 整数: :123\r\n
    Integer(i64),
    /// 批量字符串: $5\r\nhello\r\n
    BulkString(Option<Vec<u8>>),
    /// 数组: *2\r\n$3\r\nGET\r\n$3\r\nkey\r\n
    Array(Vec<RespValue>),
    /// Null: $-1\r\n
    Null,
}

impl RespValue {
    /// 由命令各部分构造请求数组（全部编码为批量字符串）
    pub fn command<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        RespValue::Array(
            parts
                .into_iter()
                .map(|p| RespValue::BulkString(Some(p.as_ref().to_vec())))
                .collect(),
        )
    }

    /// 将请求数组拆成命令参数，非数组或含非字符串元素时返回 None
    pub fn into_command(self) -> Option<Vec<Vec<u8>>> {
        match self {
            RespValue::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    RespValue::BulkString(Some(bytes)) => Some(bytes),
                    RespValue::SimpleString(s) => Some(s.into_bytes()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn bulk(bytes: Vec<u8>) -> Self {
        RespValue::BulkString(Some(bytes))
    }
}

/// RESP 解析错误
#[derive(Debug, thiserror::Error)]
pub enum RespError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid RESP format: {0}")]
    InvalidFormat(String),
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Integer overflow")]
    IntegerOverflow,
    #[error("Frame too large: {0} bytes (max: {1} bytes)")]
    FrameTooLarge(usize, usize),
}

/// 帧头：一行 RESP 数据解析出的类型与长度信息
#[derive(Debug, PartialEq)]
pub(crate) enum Header {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(usize),
    Array(usize),
    Null,
}

/// 去掉行尾的 CRLF（兼容单独的 LF），没有换行符说明输入被截断
pub(crate) fn strip_line_ending(line: &str) -> Result<&str, RespError> {
    line.strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .ok_or(RespError::UnexpectedEof)
}

/// 解析帧头行（不含 CRLF）
pub(crate) fn parse_header(line: &str) -> Result<Header, RespError> {
    let mut chars = line.chars();
    let prefix = chars
        .next()
        .ok_or_else(|| RespError::InvalidFormat("Empty line".to_string()))?;
    let body = chars.as_str();

    match prefix {
        '+' => {
            if body.contains('\r') || body.contains('\n') {
                return Err(RespError::InvalidFormat(
                    "Simple string cannot contain CR or LF".to_string(),
                ));
            }
            Ok(Header::Simple(body.to_string()))
        }
        '-' => Ok(Header::Error(body.to_string())),
        ':' => {
            // 先按 i128 解析以区分溢出和格式错误
            let num = body
                .parse::<i128>()
                .map_err(|_| RespError::InvalidFormat(format!("Invalid integer: {}", body)))?;
            i64::try_from(num)
                .map(Header::Integer)
                .map_err(|_| RespError::IntegerOverflow)
        }
        '$' => match parse_length(body, "bulk string")? {
            None => Ok(Header::Null),
            Some(len) => Ok(Header::Bulk(len)),
        },
        '*' => match parse_length(body, "array")? {
            None => Ok(Header::Null),
            Some(count) if count > MAX_ARRAY_LEN => Err(RespError::InvalidFormat(format!(
                "Array too large: {} elements",
                count
            ))),
            Some(count) => Ok(Header::Array(count)),
        },
        _ => Err(RespError::InvalidFormat(format!(
            "Unknown RESP type: {}",
            prefix
        ))),
    }
}

/// 解析长度字段，-1 表示 Null
fn parse_length(body: &str, what: &str) -> Result<Option<usize>, RespError> {
    let len = body
        .parse::<i64>()
        .map_err(|_| RespError::InvalidFormat(format!("Invalid {} length: {}", what, body)))?;
    match len {
        -1 => Ok(None),
        l if l < 0 => Err(RespError::InvalidFormat(format!(
            "Invalid {} length: {}",
            what, l
        ))),
        l => Ok(Some(l as usize)),
    }
}

/// 将 RESP 值追加编码到缓冲区
pub fn encode_into(value: &RespValue, buf: &mut Vec<u8>) {
    match value {
        RespValue::SimpleString(s) => {
            buf.push(b'+');
            buf.extend_from_slice(s.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        RespValue::Error(e) => {
            buf.push(b'-');
            buf.extend_from_slice(e.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        RespValue::Integer(i) => {
            buf.extend_from_slice(format!(":{}\r\n", i).as_bytes());
        }
        RespValue::BulkString(Some(bytes)) => {
            buf.extend_from_slice(format!("${}\r\n", bytes.len()).as_bytes());
            buf.extend_from_slice(bytes);
            buf.extend_from_slice(b"\r\n");
        }
        RespValue::BulkString(None) | RespValue::Null => {
            buf.extend_from_slice(b"$-1\r\n");
        }
        RespValue::Array(items) => {
            buf.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode_into(item, buf);
            }
        }
    }
}

/// 编码 RESP 值并返回字节向量
pub fn encode_to_vec(value: &RespValue) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_into(value, &mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        let value = RespValue::command(["SET", "key", "value"]);
        assert_eq!(
            String::from_utf8_lossy(&encode_to_vec(&value)),
            "*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n"
        );
    }

    #[test]
    fn test_encode_null_and_error() {
        assert_eq!(encode_to_vec(&RespValue::Null), b"$-1\r\n");
        assert_eq!(
            encode_to_vec(&RespValue::Error("ERR boom".to_string())),
            b"-ERR boom\r\n"
        );
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("+OK").unwrap(), Header::Simple("OK".to_string()));
        assert_eq!(parse_header(":-7").unwrap(), Header::Integer(-7));
        assert_eq!(parse_header("$5").unwrap(), Header::Bulk(5));
        assert_eq!(parse_header("$-1").unwrap(), Header::Null);
        assert_eq!(parse_header("*-1").unwrap(), Header::Null);
        assert!(parse_header("$-2").is_err());
        assert!(parse_header("?x").is_err());
        assert!(parse_header("").is_err());
    }

    #[test]
    fn test_integer_overflow() {
        let line = format!(":{}", i64::MAX as i128 + 1);
        assert!(matches!(parse_header(&line), Err(RespError::IntegerOverflow)));
        let line = format!(":{}", i64::MIN);
        assert_eq!(parse_header(&line).unwrap(), Header::Integer(i64::MIN));
    }

    #[test]
    fn test_into_command() {
        let value = RespValue::command(["GET", "k"]);
        assert_eq!(
            value.into_command(),
            Some(vec![b"GET".to_vec(), b"k".to_vec()])
        );
        assert_eq!(RespValue::Integer(1).into_command(), None);
        assert_eq!(
            RespValue::Array(vec![RespValue::Integer(1)]).into_command(),
            None
        );
    }
}
