//! 连接配置

use crate::error::{CacheError, CacheResult};

/// Redis 默认端口
pub const DEFAULT_PORT: u16 = 6379;

/// 连接外部存储所需的参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub host: String,
    pub port: u16,
    /// 逻辑库编号，0 时不发送 SELECT
    pub db: i64,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            db: 0,
        }
    }
}

impl ConnectionOptions {
    /// 从 socket 地址构造，使用 0 号库
    pub fn with_addr(addr: std::net::SocketAddr) -> Self {
        let host = match addr {
            std::net::SocketAddr::V4(v4) => v4.ip().to_string(),
            std::net::SocketAddr::V6(v6) => format!("[{}]", v6.ip()),
        };
        Self {
            host,
            port: addr.port(),
            ..Default::default()
        }
    }

    /// 解析 `redis://host[:port][/db]`，省略部分取默认值
    pub fn from_url(url: &str) -> CacheResult<Self> {
        let invalid = || CacheError::InvalidUrl(url.to_string());
        let rest = url.strip_prefix("redis://").ok_or_else(invalid)?;

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, path),
            None => (rest, ""),
        };

        let mut options = Self::default();
        if !authority.is_empty() {
            match authority.rsplit_once(':') {
                Some((host, port)) => {
                    options.port = port.parse().map_err(|_| invalid())?;
                    if !host.is_empty() {
                        options.host = host.to_string();
                    }
                }
                None => options.host = authority.to_string(),
            }
        }
        if !path.is_empty() {
            options.db = path.parse().map_err(|_| invalid())?;
            if options.db < 0 {
                return Err(invalid());
            }
        }
        Ok(options)
    }

    /// 用于 TCP 连接的地址字符串
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let options = ConnectionOptions::default();
        assert_eq!(options.addr(), "127.0.0.1:6379");
        assert_eq!(options.db, 0);
    }

    #[test]
    fn test_from_url() {
        let options = ConnectionOptions::from_url("redis://cache.local:6380/2").unwrap();
        assert_eq!(options.host, "cache.local");
        assert_eq!(options.port, 6380);
        assert_eq!(options.db, 2);

        let options = ConnectionOptions::from_url("redis://example").unwrap();
        assert_eq!(options.addr(), "example:6379");
        assert_eq!(options.db, 0);

        assert_eq!(
            ConnectionOptions::from_url("redis://").unwrap(),
            ConnectionOptions::default()
        );
    }

    #[test]
    fn test_from_url_invalid() {
        assert!(ConnectionOptions::from_url("http://localhost").is_err());
        assert!(ConnectionOptions::from_url("redis://localhost:port").is_err());
        assert!(ConnectionOptions::from_url("redis://localhost/x").is_err());
        assert!(ConnectionOptions::from_url("redis://localhost/-1").is_err());
    }
}
