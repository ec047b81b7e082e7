//! 链路配置
//!
//! 配置文件示例（TOML）：
//!
//! ```toml
//! recv_timeout_ms = 10
//! recv_buffer_size = 1024
//!
//! [local]
//! host = "127.0.0.1"
//! port = 60000
//!
//! [peer]
//! host = "127.0.0.1"
//! port = 50000
//! ```

use crate::LinkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// opstn 默认端口
pub const DEFAULT_OPSTN_PORT: u16 = 60000;

/// mbed 默认端口
pub const DEFAULT_MBED_PORT: u16 = 50000;

/// 默认接收超时（10ms）
pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 10;

/// 默认接收缓冲区大小（超过该长度的数据报会被截断）
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 1024;

/// 网络端点（host + port）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// 回环地址上的端点
    pub fn loopback(port: u16) -> Self {
        Self::new(Ipv4Addr::LOCALHOST.to_string(), port)
    }

    /// 解析为 IPv4 socket 地址（只使用第一个 IPv4 结果）
    pub fn resolve(&self) -> Result<SocketAddrV4, LinkError> {
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| LinkError::InvalidAddress(format!("{}: {}", self, e)))?;

        addrs
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(v4),
                SocketAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| LinkError::InvalidAddress(format!("{}: no IPv4 address", self)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = LinkError;

    /// 解析 `HOST:PORT`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| LinkError::InvalidAddress(format!("expected HOST:PORT, got '{}'", s)))?;

        if host.is_empty() {
            return Err(LinkError::InvalidAddress(format!("missing host in '{}'", s)));
        }

        let port = port
            .parse::<u16>()
            .map_err(|e| LinkError::InvalidAddress(format!("invalid port in '{}': {}", s, e)))?;

        Ok(Self::new(host, port))
    }
}

/// 链路配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// 本地绑定地址
    pub local: Endpoint,

    /// 对端地址（指令发送目标）
    pub peer: Endpoint,

    /// 单次接收的最长等待时间（毫秒）
    pub recv_timeout_ms: u64,

    /// 单次读取的最大字节数
    pub recv_buffer_size: usize,
}

impl Default for LinkConfig {
    /// opstn 侧默认配置：本地 127.0.0.1:60000，对端 127.0.0.1:50000
    fn default() -> Self {
        Self {
            local: Endpoint::loopback(DEFAULT_OPSTN_PORT),
            peer: Endpoint::loopback(DEFAULT_MBED_PORT),
            recv_timeout_ms: DEFAULT_RECV_TIMEOUT_MS,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl LinkConfig {
    pub fn new(local: Endpoint, peer: Endpoint) -> Self {
        Self {
            local,
            peer,
            ..Self::default()
        }
    }

    /// 接收超时
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    /// 检查配置
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.recv_buffer_size == 0 {
            return Err(LinkError::Config(
                "recv_buffer_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str) -> Result<Self, LinkError> {
        let config: LinkConfig =
            toml::from_str(content).map_err(|e| LinkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, LinkError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LinkError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, LinkError> {
        toml::to_string_pretty(self).map_err(|e| LinkError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = LinkConfig::default();
        assert_eq!(config.local, Endpoint::loopback(60000));
        assert_eq!(config.peer, Endpoint::loopback(50000));
        assert_eq!(config.recv_timeout(), Duration::from_millis(10));
        assert_eq!(config.recv_buffer_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_from_str() {
        let ep: Endpoint = "127.0.0.1:50000".parse().unwrap();
        assert_eq!(ep, Endpoint::new("127.0.0.1", 50000));
        assert_eq!(ep.to_string(), "127.0.0.1:50000");

        assert!("127.0.0.1".parse::<Endpoint>().is_err());
        assert!(":50000".parse::<Endpoint>().is_err());
        assert!("127.0.0.1:70000".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_endpoint_resolve() {
        let addr = Endpoint::loopback(50000).resolve().unwrap();
        assert_eq!(addr, SocketAddrV4::new(Ipv4Addr::LOCALHOST, 50000));
    }

    #[test]
    fn test_from_toml_partial() {
        // 未给出的字段使用默认值
        let config = LinkConfig::from_toml_str(
            r#"
recv_timeout_ms = 25

[peer]
host = "10.0.0.2"
port = 51000
"#,
        )
        .unwrap();

        assert_eq!(config.recv_timeout(), Duration::from_millis(25));
        assert_eq!(config.peer, Endpoint::new("10.0.0.2", 51000));
        assert_eq!(config.local, Endpoint::loopback(DEFAULT_OPSTN_PORT));
        assert_eq!(config.recv_buffer_size, DEFAULT_RECV_BUFFER_SIZE);
    }

    #[test]
    fn test_from_toml_rejects_zero_buffer() {
        let err = LinkConfig::from_toml_str("recv_buffer_size = 0").unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        let err = LinkConfig::from_toml_str("recv_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }

    #[test]
    fn test_toml_roundtrip_via_file() {
        let config = LinkConfig::new(Endpoint::loopback(61000), Endpoint::loopback(51000));
        let content = config.to_toml_string().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let loaded = LinkConfig::load_from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = LinkConfig::load_from_file("/nonexistent/armlink.toml").unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }
}
