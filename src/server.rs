//! 内嵌的 Redis 协议服务器
//!
//! 以 [`MemoryStore`] 为后端，支持缓存用到的命令子集：
//! PING, SELECT, FLUSHDB, GET, SET, INCR, RPUSH, LRANGE, LLEN, QUIT。
//! 用于在没有外部 Redis 的环境下运行演示程序和集成测试。

use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, error, info, warn};

use crate::resp::{AsyncRespReader, AsyncRespWriter, RespError, RespValue};
use crate::store::{MemoryStore, RedisStore, StoreError, StoreResult};

/// 可选的逻辑库数量，与 Redis 默认配置一致
pub const DATABASES: i64 = 16;

/// 按库编号懒创建的内存存储集合
#[derive(Clone, Default)]
struct Databases {
    inner: Arc<RwLock<HashMap<i64, MemoryStore>>>,
}

impl Databases {
    fn select(&self, index: i64) -> MemoryStore {
        if let Some(store) = self.inner.read().get(&index) {
            return store.clone();
        }
        self.inner.write().entry(index).or_default().clone()
    }
}

/// Redis 协议服务器
pub struct RespServer {
    listener: TcpListener,
    databases: Databases,
}

impl RespServer {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            databases: Databases::default(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 接受连接直到监听出错，每个客户端一个任务
    pub async fn run(self) -> io::Result<()> {
        info!("Redis server listening on {}", self.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New client connection from {}", addr);
                    let databases = self.databases.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, databases).await {
                            warn!("Error handling client {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// 在独立线程和运行时上启动服务器，返回实际监听地址（端口 0 时由系统分配）
pub fn spawn(addr: SocketAddr) -> io::Result<SocketAddr> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    let server = runtime.block_on(RespServer::bind(addr))?;
    let local_addr = server.local_addr()?;

    std::thread::Builder::new()
        .name("resp-server".to_string())
        .spawn(move || {
            if let Err(e) = runtime.block_on(server.run()) {
                error!("Redis server stopped: {}", e);
            }
        })?;

    Ok(local_addr)
}

/// 处理客户端连接
async fn handle_client(stream: TcpStream, databases: Databases) -> Result<(), RespError> {
    let (reader, writer) = stream.into_split();
    let mut parser = AsyncRespReader::new(reader);
    let mut encoder = AsyncRespWriter::new(writer);
    let mut session = Session::new(databases);

    loop {
        let request = match parser.read_value().await {
            Ok(v) => v,
            Err(RespError::UnexpectedEof) => break,
            Err(e) => {
                encoder
                    .write_value(&RespValue::Error(format!("ERR {}", e)))
                    .await?;
                break;
            }
        };

        let Some(command) = request.into_command() else {
            encoder
                .write_value(&RespValue::Error("ERR invalid command format".to_string()))
                .await?;
            continue;
        };
        let Some((name, args)) = command.split_first() else {
            continue;
        };

        let name = String::from_utf8_lossy(name).to_ascii_uppercase();
        if name == "QUIT" {
            encoder.write_value(&RespValue::ok()).await?;
            break;
        }

        let reply = session.execute(&name, args);
        encoder.write_value(&reply).await?;
    }

    Ok(())
}

/// 单个连接的状态：当前选中的库
struct Session {
    databases: Databases,
    store: MemoryStore,
}

impl Session {
    fn new(databases: Databases) -> Self {
        let store = databases.select(0);
        Self { databases, store }
    }

    fn execute(&mut self, name: &str, args: &[Vec<u8>]) -> RespValue {
        let arity_ok = match name {
            "PING" => args.len() <= 1,
            "FLUSHDB" => args.is_empty(),
            "SELECT" | "GET" | "INCR" | "LLEN" => args.len() == 1,
            "SET" => args.len() == 2,
            "RPUSH" => args.len() >= 2,
            "LRANGE" => args.len() == 3,
            _ => {
                return RespValue::Error(format!(
                    "ERR unknown command '{}'",
                    name.to_ascii_lowercase()
                ));
            }
        };
        if !arity_ok {
            return RespValue::Error(format!(
                "ERR wrong number of arguments for '{}' command",
                name.to_ascii_lowercase()
            ));
        }

        match self.dispatch(name, args) {
            Ok(reply) => reply,
            Err(e) => error_reply(e),
        }
    }

    fn dispatch(&mut self, name: &str, args: &[Vec<u8>]) -> StoreResult<RespValue> {
        let reply = match name {
            "PING" => match args.first() {
                Some(msg) => RespValue::bulk(msg.clone()),
                None => RespValue::SimpleString("PONG".to_string()),
            },
            "SELECT" => {
                let index = parse_i64(&args[0])?;
                if !(0..DATABASES).contains(&index) {
                    return Ok(RespValue::Error("ERR DB index is out of range".to_string()));
                }
                self.store = self.databases.select(index);
                RespValue::ok()
            }
            "FLUSHDB" => {
                self.store.flushdb()?;
                RespValue::ok()
            }
            "GET" => match self.store.get(&args[0])? {
                Some(value) => RespValue::bulk(value),
                None => RespValue::Null,
            },
            "SET" => {
                self.store.set(&args[0], &args[1])?;
                RespValue::ok()
            }
            "INCR" => RespValue::Integer(self.store.incr(&args[0])?),
            "RPUSH" => {
                let len = self.store.rpush(&args[0], args[1..].to_vec())?;
                RespValue::Integer(len as i64)
            }
            "LRANGE" => {
                let start = parse_i64(&args[1])?;
                let stop = parse_i64(&args[2])?;
                RespValue::Array(
                    self.store
                        .lrange(&args[0], start, stop)?
                        .into_iter()
                        .map(RespValue::bulk)
                        .collect(),
                )
            }
            "LLEN" => RespValue::Integer(self.store.llen(&args[0])? as i64),
            _ => unreachable!("arity check rejects unknown commands"),
        };
        Ok(reply)
    }
}

fn parse_i64(raw: &[u8]) -> StoreResult<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(StoreError::NotAnInteger)
}

fn error_reply(e: StoreError) -> RespValue {
    match e {
        StoreError::WrongType => RespValue::Error(e.to_string()),
        other => RespValue::Error(format!("ERR {}", other)),
    }
}
