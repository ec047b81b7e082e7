//! 机械臂指令帧
//!
//! 一条指令由 4 个离散字段组成（mode / linear / pitch / yaw），
//! 每个字段占 2 bit，打包进一个字节发送给 mbed。

use crate::ProtocolError;
use bilge::prelude::*;

/// 单个字段允许的最大值（2 bit）
pub const FIELD_MAX: u8 = 3;

// ============================================================================
// 模式枚举
// ============================================================================

/// 指令模式（Bit 0-1）
///
/// 非 `Motion` 的模式会覆盖整条指令，linear/pitch/yaw 不再编码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArmMode {
    /// 普通运动模式（使用 linear/pitch/yaw）
    #[default]
    Motion = 0x00,
    /// 回到起始位置
    StartPosition = 0x01,
    /// 复位
    Reset = 0x02,
    /// 退出
    Quit = 0x03,
}

impl TryFrom<u8> for ArmMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ArmMode::Motion),
            0x01 => Ok(ArmMode::StartPosition),
            0x02 => Ok(ArmMode::Reset),
            0x03 => Ok(ArmMode::Quit),
            _ => Err(ProtocolError::InvalidArgument {
                field: "mode",
                value,
                max: FIELD_MAX,
            }),
        }
    }
}

// ============================================================================
// 位域结构
// ============================================================================

/// 指令字节位域
///
/// 协议定义（LSB first，与 bilge 默认位序一致）：
/// - Bit 0-1: mode
/// - Bit 2-3: linear（0 停止，1 伸长，2 缩短）
/// - Bit 4-5: pitch（0 停止，1 抬起，2 放下）
/// - Bit 6-7: yaw（0 停止，1 右转，2 左转）
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandByte {
    pub mode: u2,   // Bit 0-1
    pub linear: u2, // Bit 2-3
    pub pitch: u2,  // Bit 4-5
    pub yaw: u2,    // Bit 6-7
}

// ============================================================================
// 指令结构体
// ============================================================================

/// 机械臂指令
///
/// 每个控制周期由操作员输入构造，立即编码发送，不做保留。
/// 字段使用普通整数保存，编码时才检查范围（`encode()`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Command {
    pub mode: u8,
    pub linear: u8,
    pub pitch: u8,
    pub yaw: u8,
}

impl Command {
    /// 从原始字段创建指令（不检查范围）
    pub const fn new(mode: u8, linear: u8, pitch: u8, yaw: u8) -> Self {
        Self {
            mode,
            linear,
            pitch,
            yaw,
        }
    }

    /// 运动指令（mode = 0）
    pub const fn motion(linear: u8, pitch: u8, yaw: u8) -> Self {
        Self::new(0, linear, pitch, yaw)
    }

    /// 模式指令（其余字段为 0）
    pub const fn with_mode(mode: ArmMode) -> Self {
        Self::new(mode as u8, 0, 0, 0)
    }

    /// 解析模式字段
    pub fn arm_mode(&self) -> Result<ArmMode, ProtocolError> {
        ArmMode::try_from(self.mode)
    }

    /// 是否为退出指令
    pub fn is_quit(&self) -> bool {
        self.mode == ArmMode::Quit as u8
    }

    /// 检查所有字段是否在 2 bit 范围内
    pub fn validate(&self) -> Result<(), ProtocolError> {
        for (field, value) in [
            ("mode", self.mode),
            ("linear", self.linear),
            ("pitch", self.pitch),
            ("yaw", self.yaw),
        ] {
            if value > FIELD_MAX {
                return Err(ProtocolError::InvalidArgument {
                    field,
                    value,
                    max: FIELD_MAX,
                });
            }
        }
        Ok(())
    }

    /// 编码为单字节
    ///
    /// - mode ≠ 0：结果就是 mode，linear/pitch/yaw 被忽略
    /// - mode = 0：`(linear << 2) | (pitch << 4) | (yaw << 6)`
    pub fn encode(&self) -> Result<u8, ProtocolError> {
        self.validate()?;

        let packed = if self.mode != 0 {
            CommandByte::new(u2::new(self.mode), u2::new(0), u2::new(0), u2::new(0))
        } else {
            CommandByte::new(
                u2::new(0),
                u2::new(self.linear),
                u2::new(self.pitch),
                u2::new(self.yaw),
            )
        };

        Ok(u8::from(packed))
    }

    /// 从单字节解码（按文档偏移提取 2 bit 子字段）
    pub fn decode(byte: u8) -> Self {
        let packed = CommandByte::from(byte);
        Self {
            mode: packed.mode().value(),
            linear: packed.linear().value(),
            pitch: packed.pitch().value(),
            yaw: packed.yaw().value(),
        }
    }
}

impl From<ArmMode> for Command {
    fn from(mode: ArmMode) -> Self {
        Command::with_mode(mode)
    }
}

/// 编码指令字段为单字节
pub fn encode_command(mode: u8, linear: u8, pitch: u8, yaw: u8) -> Result<u8, ProtocolError> {
    Command::new(mode, linear, pitch, yaw).encode()
}

/// 解码单字节为指令字段
pub fn decode_command(byte: u8) -> Command {
    Command::decode(byte)
}
