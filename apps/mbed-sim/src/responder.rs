//! mbed 侧测试应答器
//!
//! 与真实指令协议相互独立，只共享传输层：
//! 收到的数据报按小端无符号整数解释（`value`）。
//!
//! | value | 动作 |
//! |-------|------|
//! | 0 或 > 3 | 回复 50 个合成遥测值（除非本次被跳过） |
//! | 1, 2 | 不回复 |
//! | 3 | 退出 |

use anyhow::Result;
use armlink_protocol::encode_telemetry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::net::{SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, trace};

/// 合成遥测的值个数
pub const SYNTHETIC_VALUE_COUNT: usize = 50;

/// 退出值
pub const QUIT_VALUE: u64 = 3;

/// 按小端无符号整数解释数据报（超出 u64 时饱和）
pub fn payload_value(payload: &[u8]) -> u64 {
    payload
        .iter()
        .rev()
        .fold(0u64, |acc, &b| acc.saturating_mul(256).saturating_add(b as u64))
}

/// 第 `iteration` 次的合成遥测：`(j + iteration) / 2`，j = 0..50
pub fn synthetic_values(iteration: u64) -> Vec<f64> {
    (0..SYNTHETIC_VALUE_COUNT as u64)
        .map(|j| (j + iteration) as f64 / 2.0)
        .collect()
}

/// 丢包策略（模拟链路丢失遥测）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkipPolicy {
    /// 每三次跳过一次（iteration % 3 == 0）
    EveryThird,
    /// 按概率跳过
    Random { probability: f64 },
}

/// 对一个数据报的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// 发送遥测
    Telemetry(Vec<u8>),
    /// 本该回复，但被丢包策略跳过
    Skipped,
    /// 不需要回复
    Silent,
    /// 退出
    Quit,
}

pub struct Responder {
    policy: SkipPolicy,
    rng: StdRng,
}

impl Responder {
    pub fn new(policy: SkipPolicy, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { policy, rng }
    }

    fn should_skip(&mut self, iteration: u64) -> bool {
        match self.policy {
            SkipPolicy::EveryThird => iteration % 3 == 0,
            SkipPolicy::Random { probability } => self.rng.gen_bool(probability.clamp(0.0, 1.0)),
        }
    }

    /// 决定第 `iteration` 个数据报的回复
    pub fn respond(&mut self, iteration: u64, payload: &[u8]) -> Reply {
        match payload_value(payload) {
            QUIT_VALUE => Reply::Quit,
            1 | 2 => Reply::Silent,
            _ if self.should_skip(iteration) => Reply::Skipped,
            _ => Reply::Telemetry(encode_telemetry(&synthetic_values(iteration))),
        }
    }
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    pub received: u64,
    pub replied: u64,
    pub skipped: u64,
    pub quit: bool,
}

/// 接收数据报并应答，直到收到退出值、达到 `max_iterations` 或 `running` 被清除
///
/// socket 需设置读超时，超时只用于检查 `running`，不计入迭代次数。
pub fn serve(
    socket: &UdpSocket,
    responder: &mut Responder,
    reply_to: SocketAddrV4,
    max_iterations: u64,
    running: &AtomicBool,
) -> Result<ServeSummary> {
    let mut buf = [0u8; 1024];
    let mut summary = ServeSummary::default();

    while summary.received < max_iterations && running.load(Ordering::Relaxed) {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            },
            Err(e) => return Err(e.into()),
        };

        let iteration = summary.received;
        summary.received += 1;
        trace!("#{} {} byte(s) from {}", iteration, len, from);

        match responder.respond(iteration, &buf[..len]) {
            Reply::Telemetry(payload) => {
                socket.send_to(&payload, reply_to)?;
                summary.replied += 1;
                debug!("#{} replied {} byte(s) to {}", iteration, payload.len(), reply_to);
            },
            Reply::Skipped => {
                summary.skipped += 1;
                debug!("#{} reply skipped", iteration);
            },
            Reply::Silent => {},
            Reply::Quit => {
                info!("Quit received");
                summary.quit = true;
                break;
            },
        }
    }

    Ok(summary)
}
