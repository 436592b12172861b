use thiserror::Error;

use crate::store::StoreError;

/// 缓存层顶层错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid connection url: {0}")]
    InvalidUrl(String),
}

/// 读取值时类型转换失败
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("value is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid integer literal: {0:?}")]
    InvalidInteger(String),

    #[error("invalid float literal: {0:?}")]
    InvalidFloat(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
