//! 可存入缓存的标量值及其编解码

use std::fmt::Write as _;

use crate::error::DecodeError;

/// 缓存支持的值类型
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
}

impl Value {
    /// 写入存储时的字节表示：字符串按 UTF-8，整数和浮点数按十进制文本
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Value::Str(s) => s.as_bytes().to_vec(),
            Value::Bytes(b) => b.clone(),
            Value::Int(i) => i.to_string().into_bytes(),
            Value::Float(f) => float_repr(*f).into_bytes(),
        }
    }

    /// 调用历史里使用的字面量形式，如 `'hello'`、`b'\x00'`、`42`、`1.5`
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => str_repr(s),
            Value::Bytes(b) => bytes_repr(b),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => float_repr(*f),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// 按 UTF-8 解码
pub fn decode_utf8(bytes: Vec<u8>) -> Result<String, DecodeError> {
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
}

/// 按十进制解析整数，允许首尾空白
pub fn parse_int(bytes: Vec<u8>) -> Result<i64, DecodeError> {
    let text = String::from_utf8_lossy(&bytes);
    text.trim()
        .parse::<i64>()
        .map_err(|_| DecodeError::InvalidInteger(text.into_owned()))
}

/// 解析浮点数，允许首尾空白以及 inf / nan
pub fn parse_float(bytes: Vec<u8>) -> Result<f64, DecodeError> {
    let text = String::from_utf8_lossy(&bytes);
    text.trim()
        .parse::<f64>()
        .map_err(|_| DecodeError::InvalidFloat(text.into_owned()))
}

fn str_repr(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn bytes_repr(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push_str("b'");
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", b);
            }
        }
    }
    out.push('\'');
    out
}

/// 最短可往返的浮点文本，指数部分写成 `e+20` / `e-07` 的形式
fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // Debug 输出保留 `.0` 且在极大/极小值时切换为科学计数法
    let text = format!("{:?}", f);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}
