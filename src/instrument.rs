//! 调用计数与调用历史
//!
//! 以高阶函数的形式包装任意操作：
//! - [`count_calls`]: 每次调用前对计数键 `Q` 执行 INCR
//! - [`record_history`]: 调用前把参数元组追加到 `Q:inputs`，调用后把结果追加到 `Q:outputs`
//!
//! 其中 `Q` 是操作的限定名，例如 `Cache.store`。

use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::CacheResult;
use crate::store::RedisStore;
use crate::value::Value;

/// 操作失败时写入 outputs 列表的占位内容前缀
pub const ERROR_OUTPUT_PREFIX: &str = "<error: ";

/// 输入历史列表的键名
pub fn inputs_key(qualname: &str) -> String {
    format!("{}:inputs", qualname)
}

/// 输出历史列表的键名
pub fn outputs_key(qualname: &str) -> String {
    format!("{}:outputs", qualname)
}

/// 参数元组的文本形式，写入调用历史
pub trait CallArgs {
    fn render(&self) -> String;
}

impl CallArgs for Value {
    fn render(&self) -> String {
        render_tuple(std::slice::from_ref(self))
    }
}

impl CallArgs for Vec<Value> {
    fn render(&self) -> String {
        render_tuple(self)
    }
}

impl CallArgs for (Value, Value) {
    fn render(&self) -> String {
        format!("({}, {})", self.0.repr(), self.1.repr())
    }
}

/// 单元素元组带尾随逗号：`('a',)`，多元素：`('a', 1)`
fn render_tuple(values: &[Value]) -> String {
    match values {
        [single] => format!("({},)", single.repr()),
        _ => {
            let items: Vec<String> = values.iter().map(Value::repr).collect();
            format!("({})", items.join(", "))
        }
    }
}

/// 每次调用前递增以 `qualname` 为键的计数器，结果原样返回
pub fn count_calls<A, R, F>(
    store: Arc<dyn RedisStore>,
    qualname: impl Into<String>,
    op: F,
) -> impl Fn(A) -> CacheResult<R>
where
    F: Fn(A) -> CacheResult<R>,
{
    let qualname = qualname.into();
    move |args| {
        let count = store.incr(qualname.as_bytes())?;
        debug!("{} call #{}", qualname, count);
        op(args)
    }
}

/// 记录每次调用的参数和结果
///
/// 操作失败时在 outputs 中写入 `<error: ...>` 占位，保证两个列表等长；
/// 写入占位本身失败只记录警告，返回的仍是操作的原始错误。
pub fn record_history<A, R, F>(
    store: Arc<dyn RedisStore>,
    qualname: impl Into<String>,
    op: F,
) -> impl Fn(A) -> CacheResult<R>
where
    A: CallArgs,
    R: Display,
    F: Fn(A) -> CacheResult<R>,
{
    let qualname = qualname.into();
    let inputs = inputs_key(&qualname);
    let outputs = outputs_key(&qualname);

    move |args| {
        store.rpush(inputs.as_bytes(), vec![args.render().into_bytes()])?;

        match op(args) {
            Ok(result) => {
                store.rpush(outputs.as_bytes(), vec![result.to_string().into_bytes()])?;
                Ok(result)
            }
            Err(e) => {
                let placeholder = format!("{}{}>", ERROR_OUTPUT_PREFIX, e);
                if let Err(push_err) = store.rpush(outputs.as_bytes(), vec![placeholder.into_bytes()])
                {
                    warn!(
                        "Failed to record error output for {}: {}",
                        qualname, push_err
                    );
                }
                Err(e)
            }
        }
    }
}

/// `count_calls(record_history(op))`：先计数，再记录历史，最后执行操作
pub fn instrument<A, R, F>(
    store: Arc<dyn RedisStore>,
    qualname: impl Into<String>,
    op: F,
) -> impl Fn(A) -> CacheResult<R>
where
    A: CallArgs,
    R: Display,
    F: Fn(A) -> CacheResult<R>,
{
    let qualname = qualname.into();
    let recorded = record_history(store.clone(), qualname.clone(), op);
    count_calls(store, qualname, recorded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CacheError, DecodeError};
    use crate::store::MemoryStore;

    fn lists(store: &MemoryStore, qualname: &str) -> (Vec<String>, Vec<String>) {
        let read = |key: String| {
            store
                .lrange(key.as_bytes(), 0, -1)
                .unwrap()
                .into_iter()
                .map(|b| String::from_utf8(b).unwrap())
                .collect::<Vec<_>>()
        };
        (read(inputs_key(qualname)), read(outputs_key(qualname)))
    }

    #[test]
    fn test_render_args() {
        assert_eq!(Value::from("foo").render(), "('foo',)");
        assert_eq!(vec![Value::from("a"), Value::from(1)].render(), "('a', 1)");
        assert_eq!(Vec::<Value>::new().render(), "()");
        assert_eq!((Value::from(1), Value::from(2.5)).render(), "(1, 2.5)");
    }

    #[test]
    fn test_count_calls() {
        let store = MemoryStore::new();
        let shared: Arc<dyn RedisStore> = Arc::new(store.clone());

        let double = count_calls(shared, "math.double", |x: i64| Ok(x * 2));
        assert_eq!(double(2).unwrap(), 4);
        assert_eq!(double(5).unwrap(), 10);

        assert_eq!(store.get(b"math.double").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_record_history() {
        let store = MemoryStore::new();
        let shared: Arc<dyn RedisStore> = Arc::new(store.clone());

        let echo = record_history(shared, "Echo.call", |v: Value| Ok(v.repr().len()));
        echo(Value::from("ab")).unwrap();
        echo(Value::from(7)).unwrap();

        let (inputs, outputs) = lists(&store, "Echo.call");
        assert_eq!(inputs, vec!["('ab',)", "(7,)"]);
        assert_eq!(outputs, vec!["4", "1"]);
    }

    #[test]
    fn test_record_history_keeps_lists_aligned_on_failure() {
        let store = MemoryStore::new();
        let shared: Arc<dyn RedisStore> = Arc::new(store.clone());

        let fail = record_history(shared, "Broken.op", |_: Value| -> CacheResult<String> {
            Err(CacheError::Decode(DecodeError::InvalidUtf8))
        });
        assert!(fail(Value::from("x")).is_err());

        let (inputs, outputs) = lists(&store, "Broken.op");
        assert_eq!(inputs, vec!["('x',)"]);
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].starts_with(ERROR_OUTPUT_PREFIX));
        assert!(outputs[0].contains("not valid UTF-8"));
    }

    #[test]
    fn test_instrument_counts_before_recording() {
        let store = MemoryStore::new();
        let shared: Arc<dyn RedisStore> = Arc::new(store.clone());

        let op = instrument(shared, "Svc.run", |v: Value| Ok(v.repr()));
        for i in 0..3 {
            op(Value::from(i)).unwrap();
        }

        assert_eq!(store.get(b"Svc.run").unwrap(), Some(b"3".to_vec()));
        let (inputs, outputs) = lists(&store, "Svc.run");
        assert_eq!(inputs, vec!["(0,)", "(1,)", "(2,)"]);
        assert_eq!(outputs, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_count_failure_skips_operation() {
        let store = MemoryStore::new();
        store.rpush(b"Bad.counter", vec![b"x".to_vec()]).unwrap();
        let shared: Arc<dyn RedisStore> = Arc::new(store.clone());

        let called = std::cell::Cell::new(false);
        let op = count_calls(shared, "Bad.counter", |_: ()| {
            called.set(true);
            Ok(())
        });
        assert!(op(()).is_err());
        assert!(!called.get());
    }
}
