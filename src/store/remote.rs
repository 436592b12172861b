//! 通过 RESP 协议访问真实 Redis 的阻塞客户端

use parking_lot::Mutex;
use std::net::TcpStream;
use tracing::{debug, info};

use super::{RedisStore, StoreError, StoreResult};
use crate::config::ConnectionOptions;
use crate::resp::{RespReader, RespValue, RespWriter};

struct Connection {
    reader: RespReader<TcpStream>,
    writer: RespWriter<TcpStream>,
}

/// 单连接的远程存储，请求在互斥锁内串行发送
pub struct RemoteStore {
    conn: Mutex<Connection>,
    addr: String,
}

impl RemoteStore {
    /// 建立连接，必要时切换逻辑库，并用 PING 确认服务可用
    pub fn connect(options: &ConnectionOptions) -> StoreResult<Self> {
        let addr = options.addr();
        let stream = TcpStream::connect(&addr)?;
        stream.set_nodelay(true)?;
        let reader = RespReader::new(stream.try_clone()?);
        let writer = RespWriter::new(stream);

        let store = Self {
            conn: Mutex::new(Connection { reader, writer }),
            addr,
        };

        if options.db != 0 {
            let db = options.db.to_string();
            store.expect_ok(store.request(&[b"SELECT", db.as_bytes()])?)?;
        }
        store.ping()?;

        info!("Connected to {} (db {})", store.addr, options.db);
        Ok(store)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// 发送一条命令并读取回复，错误回复转换为 [`StoreError`]
    fn request(&self, parts: &[&[u8]]) -> StoreResult<RespValue> {
        let mut conn = self.conn.lock();
        conn.writer.write_value(&RespValue::command(parts))?;
        let reply = conn.reader.read_value()?;
        drop(conn);

        match reply {
            RespValue::Error(msg) => Err(Self::map_error(msg)),
            other => Ok(other),
        }
    }

    fn map_error(msg: String) -> StoreError {
        if msg.starts_with("WRONGTYPE") {
            StoreError::WrongType
        } else if msg.contains("not an integer") {
            StoreError::NotAnInteger
        } else {
            StoreError::Server(msg)
        }
    }

    fn expect_ok(&self, reply: RespValue) -> StoreResult<()> {
        match reply {
            RespValue::SimpleString(_) => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    fn expect_integer(&self, reply: RespValue) -> StoreResult<i64> {
        match reply {
            RespValue::Integer(i) => Ok(i),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(reply: &RespValue) -> StoreError {
    StoreError::UnexpectedReply(format!("{:?}", reply))
}

impl RedisStore for RemoteStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.request(&[b"GET", key])? {
            RespValue::BulkString(value) => Ok(value),
            RespValue::Null => Ok(None),
            other => Err(unexpected(&other)),
        }
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let reply = self.request(&[b"SET", key, value])?;
        self.expect_ok(reply)
    }

    fn incr(&self, key: &[u8]) -> StoreResult<i64> {
        let reply = self.request(&[b"INCR", key])?;
        self.expect_integer(reply)
    }

    fn rpush(&self, key: &[u8], values: Vec<Vec<u8>>) -> StoreResult<usize> {
        let mut parts: Vec<&[u8]> = Vec::with_capacity(values.len() + 2);
        parts.push(b"RPUSH");
        parts.push(key);
        parts.extend(values.iter().map(Vec::as_slice));

        let reply = self.request(&parts)?;
        let len = self.expect_integer(reply)?;
        usize::try_from(len).map_err(|_| StoreError::UnexpectedReply(len.to_string()))
    }

    fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>> {
        let (start, stop) = (start.to_string(), stop.to_string());
        match self.request(&[b"LRANGE", key, start.as_bytes(), stop.as_bytes()])? {
            RespValue::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    RespValue::BulkString(Some(bytes)) => Ok(bytes),
                    other => Err(unexpected(&other)),
                })
                .collect(),
            RespValue::Null => Ok(vec![]),
            other => Err(unexpected(&other)),
        }
    }

    fn flushdb(&self) -> StoreResult<()> {
        let reply = self.request(&[b"FLUSHDB"])?;
        self.expect_ok(reply)?;
        debug!("Flushed db on {}", self.addr);
        Ok(())
    }

    fn ping(&self) -> StoreResult<()> {
        match self.request(&[b"PING"])? {
            RespValue::SimpleString(s) if s == "PONG" => Ok(()),
            other => Err(unexpected(&other)),
        }
    }
}
