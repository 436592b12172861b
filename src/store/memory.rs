//! 内存存储实现
//!
//! 使用 HashMap 实现的内存存储，覆盖缓存用到的 String 和 List 两种类型，
//! 类型冲突时与 Redis 一样返回 WRONGTYPE。

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

use super::{RedisStore, StoreError, StoreResult};

/// Redis 值类型
#[derive(Debug, Clone, PartialEq)]
pub enum RedisValue {
    String(Vec<u8>),
    List(VecDeque<Vec<u8>>),
}

/// 内存存储实现，克隆后共享同一份数据
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<Vec<u8>, RedisValue>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// LLEN: 获取列表长度
    pub fn llen(&self, key: &[u8]) -> StoreResult<usize> {
        match self.data.read().get(key) {
            Some(RedisValue::List(list)) => Ok(list.len()),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(0),
        }
    }

    /// 键值对数量
    pub fn dbsize(&self) -> usize {
        self.data.read().len()
    }

    /// 解析整数
    fn parse_int(value: &[u8]) -> StoreResult<i64> {
        std::str::from_utf8(value)
            .map_err(|_| StoreError::NotAnInteger)?
            .parse::<i64>()
            .map_err(|_| StoreError::NotAnInteger)
    }

    /// 把 Redis 风格的闭区间下标换算成 [start, stop)
    fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
        let len = len as i64;
        let start = if start < 0 { (len + start).max(0) } else { start.min(len) };
        let stop = if stop < 0 {
            (len + stop + 1).max(0)
        } else {
            (stop + 1).min(len)
        };
        (start < stop).then_some((start as usize, stop as usize))
    }
}

impl RedisStore for MemoryStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.data.read().get(key) {
            Some(RedisValue::String(v)) => Ok(Some(v.clone())),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        // SET 无视旧值类型直接覆盖
        self.data
            .write()
            .insert(key.to_vec(), RedisValue::String(value.to_vec()));
        Ok(())
    }

    fn incr(&self, key: &[u8]) -> StoreResult<i64> {
        let mut data = self.data.write();

        let current = match data.get(key) {
            Some(RedisValue::String(v)) => Self::parse_int(v)?,
            Some(_) => return Err(StoreError::WrongType),
            None => 0,
        };

        let new_value = current.checked_add(1).ok_or(StoreError::NotAnInteger)?;
        data.insert(
            key.to_vec(),
            RedisValue::String(new_value.to_string().into_bytes()),
        );
        Ok(new_value)
    }

    fn rpush(&self, key: &[u8], values: Vec<Vec<u8>>) -> StoreResult<usize> {
        let mut data = self.data.write();

        let entry = data
            .entry(key.to_vec())
            .or_insert_with(|| RedisValue::List(VecDeque::new()));

        match entry {
            RedisValue::List(list) => {
                list.extend(values);
                Ok(list.len())
            }
            _ => Err(StoreError::WrongType),
        }
    }

    fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>> {
        let data = self.data.read();

        match data.get(key) {
            Some(RedisValue::List(list)) => Ok(Self::normalize_range(list.len(), start, stop)
                .map(|(start, stop)| list.range(start..stop).cloned().collect())
                .unwrap_or_default()),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(vec![]),
        }
    }

    fn flushdb(&self) -> StoreResult<()> {
        let mut data = self.data.write();
        debug!("Flushing memory store, {} keys", data.len());
        data.clear();
        Ok(())
    }

    fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_operations() {
        let store = MemoryStore::new();

        store.set(b"key1", b"value1").unwrap();
        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get(b"missing").unwrap(), None);

        assert_eq!(store.incr(b"counter").unwrap(), 1);
        assert_eq!(store.incr(b"counter").unwrap(), 2);
        assert_eq!(store.get(b"counter").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_incr_errors() {
        let store = MemoryStore::new();

        store.set(b"text", b"abc").unwrap();
        assert!(matches!(store.incr(b"text"), Err(StoreError::NotAnInteger)));

        store.set(b"max", i64::MAX.to_string().as_bytes()).unwrap();
        assert!(matches!(store.incr(b"max"), Err(StoreError::NotAnInteger)));

        store.rpush(b"list", vec![b"a".to_vec()]).unwrap();
        assert!(matches!(store.incr(b"list"), Err(StoreError::WrongType)));
    }

    #[test]
    fn test_list_operations() {
        let store = MemoryStore::new();

        assert_eq!(store.rpush(b"list", vec![b"a".to_vec(), b"b".to_vec()]).unwrap(), 2);
        assert_eq!(store.rpush(b"list", vec![b"c".to_vec()]).unwrap(), 3);

        assert_eq!(
            store.lrange(b"list", 0, -1).unwrap(),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
        assert_eq!(store.lrange(b"list", -2, -1).unwrap(), vec![b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(store.lrange(b"list", 1, 1).unwrap(), vec![b"b".to_vec()]);
        assert!(store.lrange(b"list", 2, 1).unwrap().is_empty());
        assert!(store.lrange(b"list", 5, 10).unwrap().is_empty());
        assert!(store.lrange(b"missing", 0, -1).unwrap().is_empty());
        assert_eq!(store.llen(b"list").unwrap(), 3);
    }

    #[test]
    fn test_wrong_type() {
        let store = MemoryStore::new();

        store.set(b"str", b"v").unwrap();
        assert!(matches!(
            store.rpush(b"str", vec![b"x".to_vec()]),
            Err(StoreError::WrongType)
        ));
        assert!(matches!(store.lrange(b"str", 0, -1), Err(StoreError::WrongType)));

        store.rpush(b"list", vec![b"x".to_vec()]).unwrap();
        assert!(matches!(store.get(b"list"), Err(StoreError::WrongType)));

        // SET 覆盖任意类型
        store.set(b"list", b"now a string").unwrap();
        assert_eq!(store.get(b"list").unwrap(), Some(b"now a string".to_vec()));
    }

    #[test]
    fn test_flushdb_and_clone_share_data() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set(b"a", b"1").unwrap();
        other.rpush(b"b", vec![b"x".to_vec()]).unwrap();
        assert_eq!(store.dbsize(), 2);

        other.flushdb().unwrap();
        assert_eq!(store.dbsize(), 0);
        assert_eq!(store.get(b"a").unwrap(), None);
    }
}
