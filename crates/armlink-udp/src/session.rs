//! Type State 链路会话
//!
//! 使用零大小类型（ZST）标记实现状态机，在编译期防止非法操作：
//!
//! ```text
//! ArmLink::bind(config)  ──▶  ArmLink<Bound>  ──activate()──▶  ArmLink<Active>
//!                                  │                                 │
//!                               close()                           close()
//! ```
//!
//! `close(self)` 消耗会话，关闭之后不存在任何可调用的方法。

use crate::poller::poll_and_read;
use crate::socket::bind_reusable;
use crate::{LinkConfig, LinkError};
use armlink_protocol::{ArmMode, Command, TelemetryFrame, parse_telemetry};
use std::net::{SocketAddrV4, UdpSocket};
use std::time::Duration;
use tracing::{info, trace, warn};

// ==================== 状态类型（零大小类型）====================

/// 已绑定状态
///
/// socket 已绑定本地地址，但还没有向对端发送握手。
pub struct Bound;

/// 活动状态
///
/// 握手已发送，可以收发指令与遥测。
pub struct Active;

// ==================== 统计 ====================

/// 会话统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// 已发送的指令数（不含握手）
    pub commands_sent: u64,
    /// 成功解析的遥测帧数
    pub frames_received: u64,
    /// 超时内没有数据的接收次数
    pub empty_polls: u64,
    /// 遥测解析失败次数
    pub parse_errors: u64,
}

// ==================== 会话 ====================

/// opstn ↔ mbed 链路会话
///
/// 独占一个 UDP socket。
///
/// # 类型参数
///
/// - `State`: 当前状态（`Bound`, `Active`）
pub struct ArmLink<State = Bound> {
    socket: UdpSocket,
    local: SocketAddrV4,
    peer: SocketAddrV4,
    recv_timeout: Duration,
    recv_buffer_size: usize,
    stats: LinkStats,
    _state: State,
}

// ==================== Bound 状态 ====================

impl ArmLink<Bound> {
    /// 绑定本地地址
    ///
    /// socket 在绑定前开启 `SO_REUSEADDR`，并设为非阻塞
    /// （读取只在 `poll` 报告就绪后进行）。
    ///
    /// # 错误
    ///
    /// - `LinkError::Config`: 配置非法
    /// - `LinkError::InvalidAddress`: 地址无法解析
    /// - `LinkError::Bind`: 绑定失败（端口被占用等）
    pub fn bind(config: LinkConfig) -> Result<Self, LinkError> {
        config.validate()?;

        let local = config.local.resolve()?;
        let peer = config.peer.resolve()?;

        let socket = bind_reusable(local)?;
        socket.set_nonblocking(true)?;

        // 绑定端口 0 时取实际端口
        let local = match socket.local_addr()? {
            std::net::SocketAddr::V4(addr) => addr,
            std::net::SocketAddr::V6(_) => local,
        };

        info!("Link bound to {}, peer {}", local, peer);

        Ok(ArmLink {
            socket,
            local,
            peer,
            recv_timeout: config.recv_timeout(),
            recv_buffer_size: config.recv_buffer_size,
            stats: LinkStats::default(),
            _state: Bound,
        })
    }

    /// 绑定并激活
    pub fn connect(config: LinkConfig) -> Result<ArmLink<Active>, LinkError> {
        Self::bind(config)?.activate()
    }

    /// 向对端发送握手（`mode = 1` 的单字节指令）
    ///
    /// 发送失败时 socket 随 `self` 一起释放。
    pub fn activate(self) -> Result<ArmLink<Active>, LinkError> {
        let handshake = Command::with_mode(ArmMode::StartPosition).encode()?;
        self.socket.send_to(&[handshake], self.peer)?;
        info!("Handshake sent to {}", self.peer);

        let ArmLink {
            socket,
            local,
            peer,
            recv_timeout,
            recv_buffer_size,
            stats,
            _state: Bound,
        } = self;

        Ok(ArmLink {
            socket,
            local,
            peer,
            recv_timeout,
            recv_buffer_size,
            stats,
            _state: Active,
        })
    }
}

// ==================== Active 状态 ====================

impl ArmLink<Active> {
    /// 编码并发送一条指令
    ///
    /// 返回实际发送的字节。越界字段返回 `ProtocolError::InvalidArgument`，不发送。
    pub fn send_command(&mut self, command: &Command) -> Result<u8, LinkError> {
        let byte = command.encode()?;
        self.socket.send_to(&[byte], self.peer)?;
        self.stats.commands_sent += 1;
        trace!("Sent command {:#010b} to {}", byte, self.peer);
        Ok(byte)
    }

    /// 在 `max_wait` 内接收最新的原始数据报
    pub fn receive_latest(&mut self, max_wait: Duration) -> Result<Option<Vec<u8>>, LinkError> {
        let payload = poll_and_read(&self.socket, max_wait, self.recv_buffer_size)?;
        if payload.is_none() {
            self.stats.empty_polls += 1;
        }
        Ok(payload)
    }

    /// 使用配置的超时接收最新的原始数据报
    pub fn receive_raw(&mut self) -> Result<Option<Vec<u8>>, LinkError> {
        self.receive_latest(self.recv_timeout)
    }

    /// 接收并解析最新的遥测帧
    ///
    /// # 返回
    ///
    /// - `Ok(Some(frame))`: 收到并解析成功
    /// - `Ok(None)`: 超时内没有数据
    /// - `Err(LinkError::Protocol(ParseError))`: 数据无法解析
    pub fn receive_telemetry(&mut self) -> Result<Option<TelemetryFrame>, LinkError> {
        let Some(payload) = self.receive_raw()? else {
            return Ok(None);
        };

        match parse_telemetry(&payload) {
            Ok(frame) => {
                self.stats.frames_received += 1;
                trace!("Telemetry frame with {} value(s)", frame.len());
                Ok(Some(frame))
            },
            Err(e) => {
                self.stats.parse_errors += 1;
                Err(e.into())
            },
        }
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}

// ==================== 通用方法 ====================

impl<State> ArmLink<State> {
    /// 实际绑定的本地地址
    pub fn local_addr(&self) -> SocketAddrV4 {
        self.local
    }

    pub fn peer_addr(&self) -> SocketAddrV4 {
        self.peer
    }

    pub fn recv_timeout(&self) -> Duration {
        self.recv_timeout
    }

    /// 关闭会话
    ///
    /// 关闭失败只记录日志，不返回错误。
    pub fn close(self) {
        let local = self.local;

        match nix::unistd::close(self.socket) {
            Ok(()) => info!("Link {} closed", local),
            Err(e) => warn!("Failed to close link socket {}: {}", local, e),
        }
    }
}

// ==================== 测试 ====================
