//! # Armlink Protocol
//!
//! opstn ↔ mbed 链路的报文定义（无 socket 依赖）
//!
//! ## 模块
//!
//! - `command`: 单字节机械臂指令的位域编码/解码
//! - `telemetry`: ASCII 浮点遥测帧的编码/解码
//!
//! ## 线格式
//!
//! ```text
//! opstn ──(1 byte, bit-packed)──▶ mbed
//! opstn ◀──("1.0 2.5 3 ...")───── mbed
//! ```
//!
//! 两个方向都没有报文头、长度前缀或校验和：一个 UDP 数据报就是一个完整报文。

pub mod command;
pub mod telemetry;

// 重新导出常用类型
pub use command::*;
pub use telemetry::*;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 指令字段超出 2 bit 可表示范围
    #[error("Invalid value for field {field}: {value} (max {max})")]
    InvalidArgument {
        field: &'static str,
        value: u8,
        max: u8,
    },

    /// 遥测文本无法解析
    #[error("Parse error: {0}")]
    ParseError(String),
}
