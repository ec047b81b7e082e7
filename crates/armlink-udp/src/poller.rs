//! 有界轮询与"只取最新"接收
//!
//! 控制循环里，过期的传感器数据比没有数据更糟糕。因此接收端：
//!
//! 1. 最多等待 `max_wait`（`poll(2)` 超时，而不是阻塞的 `recv`）
//! 2. 一旦可读，就把 socket 里积压的数据报全部读出，只保留最后一个
//!
//! 截止时间（`Deadline`）是一个普通值，随函数返回释放；
//! 不安装任何进程级的信号或定时器。

use crate::LinkError;
use crate::socket::DatagramSocket;
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::io;
use std::os::fd::AsFd;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 单次 `poll(2)` 的最长等待（`PollTimeout` 的毫秒上限）
const MAX_POLL_SLICE: Duration = Duration::from_millis(u16::MAX as u64);

/// 一次有界轮询的截止时间
///
/// `max_wait` 大到 `Instant` 无法表示时视为永不到期。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// 从现在起 `max_wait` 后到期
    pub fn after(max_wait: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(max_wait),
        }
    }

    /// 剩余时间（到期后为 0，永不到期时为 `Duration::MAX`）
    pub fn remaining(&self) -> Duration {
        match self.expires_at {
            Some(expires_at) => expires_at.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

/// 单次就绪检查的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Ready,
    NotReady,
    Interrupted,
}

/// `Duration` → `PollTimeout`（向上取整到毫秒，最大 65535ms）
///
/// 向上取整保证亚毫秒的等待不会退化成 0ms 忙轮询。
fn poll_timeout(wait: Duration) -> PollTimeout {
    let timeout_ms = wait.as_micros().div_ceil(1000).min(u16::MAX as u128) as u16;
    PollTimeout::from(timeout_ms)
}

/// 等待 socket 可读，最多 `wait`
fn wait_readable<S: AsFd>(socket: &S, wait: Duration) -> Result<Readiness, LinkError> {
    let mut fds = [PollFd::new(socket.as_fd(), PollFlags::POLLIN)];

    match poll(&mut fds, poll_timeout(wait)) {
        Ok(0) => Ok(Readiness::NotReady),
        Ok(_) => Ok(Readiness::Ready),
        Err(Errno::EINTR) => Ok(Readiness::Interrupted),
        Err(e) => Err(poll_error(e)),
    }
}

/// `poll(2)` 失败时保留 errno
fn poll_error(errno: Errno) -> LinkError {
    LinkError::Io(io::Error::from(errno))
}

/// 排空 socket 并返回最新的数据报
///
/// - 每次读取前做一次零等待的就绪检查
/// - 就绪就读取最多 `read_size` 字节，覆盖之前读到的内容
/// - 不再就绪时返回最后一次读到的内容；从未就绪则返回 `None`
///
/// 超过 `read_size` 的数据报会被截断，不做重组。
pub fn drain_latest<S: DatagramSocket>(
    socket: &S,
    read_size: usize,
) -> Result<Option<Vec<u8>>, LinkError> {
    let mut buf = vec![0u8; read_size];
    let mut latest: Option<Vec<u8>> = None;
    let mut discarded = 0usize;

    loop {
        match wait_readable(socket, Duration::ZERO)? {
            Readiness::Ready => {},
            Readiness::NotReady => break,
            Readiness::Interrupted => continue,
        }

        match socket.recv_datagram(&mut buf) {
            Ok(len) => {
                if latest.is_some() {
                    discarded += 1;
                }
                latest = Some(buf[..len].to_vec());
            },
            // 就绪检查与读取之间数据被取走（或校验失败被内核丢弃）
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(LinkError::Io(e)),
        }
    }

    if discarded > 0 {
        debug!("Discarded {} stale datagram(s), kept the latest", discarded);
    }

    Ok(latest)
}

/// 在 `max_wait` 内等待数据，并返回最新的数据报
///
/// # 返回
/// - `Ok(Some(payload))`: 截止前有数据，已排空积压，返回最新的一个
/// - `Ok(None)`: 截止前没有数据（不是错误）
/// - `Err`: socket 错误
///
/// 等待阶段不超过 `max_wait`；一旦可读，排空到 socket 不再可读为止。
pub fn poll_and_read<S: DatagramSocket>(
    socket: &S,
    max_wait: Duration,
    read_size: usize,
) -> Result<Option<Vec<u8>>, LinkError> {
    poll_in_slices(socket, max_wait, read_size, MAX_POLL_SLICE)
}

/// `poll_and_read` 的实现：每次 `poll(2)` 最多等待 `slice`，直到截止
fn poll_in_slices<S: DatagramSocket>(
    socket: &S,
    max_wait: Duration,
    read_size: usize,
    slice: Duration,
) -> Result<Option<Vec<u8>>, LinkError> {
    let deadline = Deadline::after(max_wait);

    loop {
        match wait_readable(socket, deadline.remaining().min(slice))? {
            Readiness::Ready => return drain_latest(socket, read_size),
            // 超时或被信号打断：用剩余时间重试
            Readiness::NotReady | Readiness::Interrupted if !deadline.is_expired() => continue,
            Readiness::NotReady | Readiness::Interrupted => {
                trace!("No datagram within {:?}", max_wait);
                return Ok(None);
            },
        }
    }
}
