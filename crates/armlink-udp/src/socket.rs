//! UDP socket 创建与数据报接收抽象

use crate::LinkError;
use nix::sys::socket::{AddressFamily, SockFlag, SockType, SockaddrIn, bind, setsockopt, socket, sockopt};
use std::io;
use std::net::{SocketAddrV4, UdpSocket};
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::net::UnixDatagram;
use tracing::trace;

/// 可轮询的数据报 socket
///
/// `poll_and_read` / `drain_latest` 只依赖这两个能力：
/// 拿到 fd 做就绪检查，以及读取一个数据报。
pub trait DatagramSocket: AsFd {
    /// 读取一个数据报，超出 `buf` 的部分被截断
    fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<usize>;
}

impl DatagramSocket for UdpSocket {
    fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf)
    }
}

impl DatagramSocket for UnixDatagram {
    fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf)
    }
}

/// 创建开启 `SO_REUSEADDR` 的 IPv4 UDP socket 并绑定到 `addr`
///
/// `SO_REUSEADDR` 必须在 `bind` 之前设置，所以不能直接用 `UdpSocket::bind`。
pub fn bind_reusable(addr: SocketAddrV4) -> Result<UdpSocket, LinkError> {
    let bind_error = |e: nix::errno::Errno| LinkError::Bind {
        addr,
        source: io::Error::from(e),
    };

    let fd = socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::empty(),
        None,
    )
    .map_err(bind_error)?;

    setsockopt(&fd, sockopt::ReuseAddr, &true).map_err(bind_error)?;
    bind(fd.as_raw_fd(), &SockaddrIn::from(addr)).map_err(bind_error)?;

    trace!("UDP socket bound to {} (SO_REUSEADDR)", addr);
    Ok(UdpSocket::from(fd))
}
