//! 遥测帧
//!
//! mbed 发回的遥测是空白分隔的 ASCII 十进制浮点数，一个数据报就是一帧。
//! 约定前 6 个值是舵机（actuator）数据，其后最多 33 个是传感器数据，
//! 但协议本身不做结构校验，只是一个扁平列表。

use crate::ProtocolError;
use std::ops::Deref;

/// 舵机数据个数（帧头部）
pub const ACTUATOR_COUNT: usize = 6;

/// 传感器数据个数（紧随舵机数据）
pub const SENSOR_COUNT: usize = 33;

/// 一帧遥测数据
///
/// 帧要么完整存在（一个数据报），要么不存在（`None`），不会拼接半帧。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryFrame {
    values: Vec<f64>,
}

impl TelemetryFrame {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// 所有值
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// 舵机数据（最多前 6 个）
    pub fn actuators(&self) -> &[f64] {
        &self.values[..self.values.len().min(ACTUATOR_COUNT)]
    }

    /// 传感器数据（舵机之后最多 33 个）
    pub fn sensors(&self) -> &[f64] {
        let start = self.values.len().min(ACTUATOR_COUNT);
        let end = self.values.len().min(ACTUATOR_COUNT + SENSOR_COUNT);
        &self.values[start..end]
    }
}

impl Deref for TelemetryFrame {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.values
    }
}

impl From<Vec<f64>> for TelemetryFrame {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// 解析一个数据报的遥测文本
///
/// 任何一个 token 不是合法浮点数都会返回 `ParseError`，不会静默丢弃。
/// 空文本得到空帧。
pub fn parse_telemetry(payload: &[u8]) -> Result<TelemetryFrame, ProtocolError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| ProtocolError::ParseError(format!("telemetry is not valid UTF-8: {}", e)))?;

    let values = text
        .split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|e| {
                ProtocolError::ParseError(format!("invalid float token '{}': {}", token, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TelemetryFrame::new(values))
}

/// 解码接收结果
///
/// - `None`（没有收到数据）→ `Ok(None)`
/// - `Some(payload)` → `Ok(Some(frame))` 或 `Err(ParseError)`
pub fn decode_telemetry(payload: Option<&[u8]>) -> Result<Option<TelemetryFrame>, ProtocolError> {
    payload.map(parse_telemetry).transpose()
}

/// 编码遥测值为空格分隔的 ASCII 文本
pub fn encode_telemetry(values: &[f64]) -> Vec<u8> {
    values
        .iter()
        .map(|v| format!("{:?}", v))
        .collect::<Vec<_>>()
        .join(" ")
        .into_bytes()
}
