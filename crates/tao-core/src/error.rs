//! 统一错误类型定义.
//!
//! 所有 Tao crate 共用的错误类型, 支持跨模块传播.
//!
//! 探测器内部的 "数据不足" 与 "候选头无效" 都在探测器内消化,
//! 只有注册表构建, 数据源打开与底层字段解码会把错误交给调用方.

use thiserror::Error;

/// Tao 框架统一错误类型
#[derive(Debug, Error)]
pub enum TaoError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 无效数据 (损坏的字段, 保留值等)
    #[error("无效数据: {0}")]
    InvalidData(String),
}

/// Tao 框架统一 Result 类型
pub type TaoResult<T> = Result<T, TaoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_错误自动转换() {
        fn open() -> TaoResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))?;
            Ok(())
        }
        let err = open().unwrap_err();
        assert!(matches!(err, TaoError::Io(_)));
        assert!(err.to_string().starts_with("I/O 错误"));
    }

    #[test]
    fn test_错误信息格式() {
        let err = TaoError::InvalidData("保留的采样率索引".into());
        assert_eq!(err.to_string(), "无效数据: 保留的采样率索引");
        assert_eq!(TaoError::NeedMoreData.to_string(), "数据不足, 需要更多输入");
    }
}
