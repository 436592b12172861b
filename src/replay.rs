//! 调用历史回放

use std::io::Write;

use crate::error::CacheResult;
use crate::instrument::{inputs_key, outputs_key};
use crate::store::RedisStore;
use crate::value::parse_int;

/// 某个操作的完整调用记录
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallHistory {
    pub qualname: String,
    /// 计数器的值，键不存在时为 0
    pub count: i64,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl CallHistory {
    /// 从存储中读出计数器和两条历史列表
    pub fn load(store: &dyn RedisStore, qualname: &str) -> CacheResult<Self> {
        let count = match store.get(qualname.as_bytes())? {
            Some(raw) => parse_int(raw)?,
            None => 0,
        };

        let read = |key: String| -> CacheResult<Vec<String>> {
            Ok(store
                .lrange(key.as_bytes(), 0, -1)?
                .into_iter()
                .map(|item| String::from_utf8_lossy(&item).into_owned())
                .collect())
        };

        Ok(Self {
            qualname: qualname.to_string(),
            count,
            inputs: read(inputs_key(qualname))?,
            outputs: read(outputs_key(qualname))?,
        })
    }

    /// 按下标配对输入与输出，较长列表多出的部分被丢弃
    pub fn calls(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inputs
            .iter()
            .zip(self.outputs.iter())
            .map(|(input, output)| (input.as_str(), output.as_str()))
    }

    /// 回放文本：一行调用次数，随后每次调用一行 `Q(*args) -> result`
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.inputs.len() + 1);
        lines.push(format!("{} was called {} times:", self.qualname, self.count));
        lines.extend(
            self.calls()
                .map(|(input, output)| format!("{}(*{}) -> {}", self.qualname, input, output)),
        );
        lines
    }
}

/// 把 `qualname` 的调用历史写到 `out`
pub fn replay<W: Write>(store: &dyn RedisStore, qualname: &str, out: &mut W) -> CacheResult<()> {
    let history = CallHistory::load(store, qualname)?;
    for line in history.lines() {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
