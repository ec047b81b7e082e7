//! # Armlink UDP
//!
//! opstn ↔ mbed 的 UDP 链路层：
//! - `poller`: 带截止时间的有界轮询 + "只取最新"的排空接收
//! - `session`: 持有唯一 socket 的会话（Type State：`Bound` → `Active` → 关闭）
//! - `socket`: 开启 `SO_REUSEADDR` 的 IPv4 UDP socket 创建
//! - `config`: 链路配置（TOML）
//!
//! # 使用场景
//!
//! ```no_run
//! use armlink_udp::{ArmLink, LinkConfig};
//! use armlink_protocol::Command;
//!
//! let mut link = ArmLink::connect(LinkConfig::default())?;
//! link.send_command(&Command::motion(0, 0, 1))?;
//! if let Some(frame) = link.receive_telemetry()? {
//!     println!("{:?}", frame.values());
//! }
//! link.close();
//! # Ok::<(), armlink_udp::LinkError>(())
//! ```
//!
//! 整个链路是单线程的：唯一可能挂起的地方是 `poll_and_read`，
//! 且挂起时间不会超过给定的超时。

pub mod config;
mod error;
pub mod poller;
pub mod session;
pub mod socket;

pub use config::{Endpoint, LinkConfig};
pub use error::LinkError;
pub use poller::{Deadline, drain_latest, poll_and_read};
pub use session::{Active, ArmLink, Bound, LinkStats};
pub use socket::{DatagramSocket, bind_reusable};
