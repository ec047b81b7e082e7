//! 按键 → 指令映射
//!
//! | 按键 | 指令 |
//! |------|------|
//! | `w` / `s` | pitch 抬起 / 放下 |
//! | `a` / `d` | yaw 右转 / 左转 |
//! | `j` / `k` | linear 伸长 / 缩短 |
//! | `S` | 回到起始位置（mode 1） |
//! | `R` | 复位（mode 2） |
//! | `Q` | 退出（mode 3） |

use armlink_protocol::{ArmMode, Command};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Unknown key: {0:?} (expected one of w s a d j k S R Q)")]
    UnknownKey(String),
}

/// 把一行输入映射为指令
///
/// 每行只接受一个按键（首尾空白忽略）。
pub fn command_for_key(line: &str) -> Result<Command, KeyError> {
    let command = match line.trim() {
        "w" => Command::motion(0, 1, 0),
        "s" => Command::motion(0, 2, 0),
        "a" => Command::motion(0, 0, 1),
        "d" => Command::motion(0, 0, 2),
        "j" => Command::motion(1, 0, 0),
        "k" => Command::motion(2, 0, 0),
        "S" => Command::with_mode(ArmMode::StartPosition),
        "R" => Command::with_mode(ArmMode::Reset),
        "Q" => Command::with_mode(ArmMode::Quit),
        other => return Err(KeyError::UnknownKey(other.to_string())),
    };
    Ok(command)
}
