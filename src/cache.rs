//! 带调用计数与历史记录的缓存
//!
//! 以随机 UUID 为键存入标量值，读取时可选地做类型转换。
//! [`Cache::store`] 经 [`instrument`] 包装：每次调用都会递增 `Cache.store` 计数器，
//! 并把参数和返回的键追加到 `Cache.store:inputs` / `Cache.store:outputs`。

use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ConnectionOptions;
use crate::error::{CacheResult, DecodeError};
use crate::instrument::instrument;
use crate::replay::{self, CallHistory};
use crate::store::{RedisStore, RemoteStore};
use crate::value::{self, Value};

/// 缓存
pub struct Cache {
    store: Arc<dyn RedisStore>,
}

impl Cache {
    /// [`Cache::store`] 的限定名，计数器与历史列表以它为键前缀
    pub const STORE_QUALNAME: &'static str = "Cache.store";

    /// 使用已有的存储句柄创建缓存，并清空当前库
    pub fn new(store: Arc<dyn RedisStore>) -> CacheResult<Self> {
        store.flushdb()?;
        info!("Cache initialized, database flushed");
        Ok(Self { store })
    }

    /// 连接远程 Redis 并创建缓存
    pub fn connect(options: &ConnectionOptions) -> CacheResult<Self> {
        let store = RemoteStore::connect(options)?;
        Self::new(Arc::new(store))
    }

    /// 底层存储句柄
    pub fn backend(&self) -> &Arc<dyn RedisStore> {
        &self.store
    }

    /// 以新生成的随机键存入值，返回该键
    pub fn store(&self, value: impl Into<Value>) -> CacheResult<String> {
        let op = instrument(self.store.clone(), Self::STORE_QUALNAME, |v: Value| {
            self.insert(v)
        });
        op(value.into())
    }

    fn insert(&self, value: Value) -> CacheResult<String> {
        let key = Uuid::new_v4().to_string();
        self.store.set(key.as_bytes(), &value.encode())?;
        debug!("Stored {} under {}", value.repr(), key);
        Ok(key)
    }

    /// 读取原始字节，键不存在返回 None
    pub fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.store.get(key.as_bytes())?)
    }

    /// 读取并用 `transform` 转换；键不存在时不调用 `transform`
    pub fn get_with<T, F>(&self, key: &str, transform: F) -> CacheResult<Option<T>>
    where
        F: FnOnce(Vec<u8>) -> Result<T, DecodeError>,
    {
        match self.get(key)? {
            Some(raw) => Ok(Some(transform(raw)?)),
            None => Ok(None),
        }
    }

    /// 按 UTF-8 字符串读取
    pub fn get_str(&self, key: &str) -> CacheResult<Option<String>> {
        self.get_with(key, value::decode_utf8)
    }

    /// 按十进制整数读取
    pub fn get_int(&self, key: &str) -> CacheResult<Option<i64>> {
        self.get_with(key, value::parse_int)
    }

    /// 按浮点数读取
    pub fn get_float(&self, key: &str) -> CacheResult<Option<f64>> {
        self.get_with(key, value::parse_float)
    }

    /// 操作被调用的次数
    pub fn call_count(&self, qualname: &str) -> CacheResult<i64> {
        Ok(self.get_int(qualname)?.unwrap_or(0))
    }

    pub fn history(&self, qualname: &str) -> CacheResult<CallHistory> {
        CallHistory::load(self.store.as_ref(), qualname)
    }

    /// 把调用历史打印到标准输出
    pub fn replay(&self, qualname: &str) -> CacheResult<()> {
        let stdout = std::io::stdout();
        self.replay_to(qualname, &mut stdout.lock())
    }

    pub fn replay_to<W: Write>(&self, qualname: &str, out: &mut W) -> CacheResult<()> {
        replay::replay(self.store.as_ref(), qualname, out)
    }
}
