//! 链路层错误类型定义

use armlink_protocol::ProtocolError;
use std::io;
use std::net::SocketAddrV4;
use thiserror::Error;

/// 链路层错误类型
///
/// 注意：接收超时不是错误，而是 `Ok(None)`。
#[derive(Error, Debug)]
pub enum LinkError {
    /// socket IO 错误
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// 协议编解码错误（指令越界、遥测解析失败）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 绑定本地地址失败（启动阶段的致命错误）
    #[error("Failed to bind UDP socket to {addr}: {source}")]
    Bind {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    /// 地址无法解析为 IPv4
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// 配置错误
    #[error("Invalid config: {0}")]
    Config(String),
}

impl LinkError {
    /// 是否是遥测解析错误（控制循环应记录后跳过本周期）
    pub fn is_parse_error(&self) -> bool {
        matches!(self, LinkError::Protocol(ProtocolError::ParseError(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_display() {
        let err = LinkError::InvalidAddress("nowhere:1".to_string());
        assert_eq!(format!("{}", err), "Invalid address: nowhere:1");

        let err = LinkError::Bind {
            addr: "127.0.0.1:60000".parse().unwrap(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("127.0.0.1:60000"), "Bind error message: {}", msg);
    }

    #[test]
    fn test_from_protocol_error() {
        let err: LinkError = ProtocolError::ParseError("bad".to_string()).into();
        assert!(err.is_parse_error());

        let err: LinkError = ProtocolError::InvalidArgument {
            field: "mode",
            value: 4,
            max: 3,
        }
        .into();
        assert!(!err.is_parse_error());
        assert!(matches!(
            err,
            LinkError::Protocol(ProtocolError::InvalidArgument { field: "mode", .. })
        ));
    }

    #[test]
    fn test_from_io_error() {
        let err: LinkError = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, LinkError::Io(_)));
    }
}
