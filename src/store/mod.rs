//! 键值存储抽象层
//!
//! 缓存只依赖 Redis 的少量原语：
//! - String: GET, SET, INCR
//! - List: RPUSH, LRANGE
//! - 通用: FLUSHDB, PING
//!
//! 提供两种实现：进程内的 [`MemoryStore`] 和通过 RESP 连接真实 Redis 的 [`RemoteStore`]。

mod memory;
mod remote;

pub use memory::{MemoryStore, RedisValue};
pub use remote::RemoteStore;

use crate::resp::RespError;

/// 存储错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 连接失败或读写中断
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),
    /// 服务器返回了无法解析的数据
    #[error("protocol error: {0}")]
    Protocol(RespError),
    /// 类型不匹配（如对 String 执行 List 操作）
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    /// 值不是整数或自增溢出
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    /// 服务器返回的错误回复
    #[error("server error: {0}")]
    Server(String),
    /// 回复类型与命令不符
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl From<RespError> for StoreError {
    fn from(e: RespError) -> Self {
        match e {
            RespError::Io(io) => StoreError::Connection(io),
            other => StoreError::Protocol(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Redis 存储抽象 trait
///
/// 所有操作都是阻塞调用，错误直接返回给调用方，不做重试。
pub trait RedisStore: Send + Sync {
    /// GET: 获取字符串值，键不存在返回 None
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// SET: 设置字符串值
    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// INCR: 整数自增 1，键不存在时从 0 开始
    fn incr(&self, key: &[u8]) -> StoreResult<i64>;

    /// RPUSH: 从右侧追加元素，返回追加后的列表长度
    fn rpush(&self, key: &[u8], values: Vec<Vec<u8>>) -> StoreResult<usize>;

    /// LRANGE: 获取列表范围，支持负数下标
    fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>>;

    /// FLUSHDB: 清空当前库
    fn flushdb(&self) -> StoreResult<()>;

    /// PING: 检查连接是否可用
    fn ping(&self) -> StoreResult<()>;
}
