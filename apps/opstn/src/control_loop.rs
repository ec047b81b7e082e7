//! 操作员控制循环
//!
//! 每个周期读取一个按键：
//! - 运动指令（mode 0）：连续发送 `burst` 次，每次发送后读取最新遥测
//! - 起始位置 / 复位（mode 1 / 2）：发送一次
//! - 退出（mode 3）：发送一次后结束循环
//!
//! 未知按键与遥测解析失败只记录日志，不结束循环。

use crate::keymap::command_for_key;
use anyhow::Result;
use armlink_protocol::{ArmMode, Command};
use armlink_udp::{Active, ArmLink, LinkError};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 一次按键输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    /// 一行输入
    Line(String),
    /// Ctrl+C（按退出处理）
    Interrupted,
    /// Ctrl+D / 输入结束
    End,
}

/// 按键来源
pub trait KeySource {
    fn next_key(&mut self) -> KeyEvent;
}

/// 终端按键来源（rustyline）
pub struct TerminalKeys {
    editor: DefaultEditor,
}

impl TerminalKeys {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new()
            .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;
        Ok(Self { editor })
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> KeyEvent {
        match self.editor.readline("opstn> ") {
            Ok(line) => KeyEvent::Line(line),
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                KeyEvent::Interrupted
            },
            Err(ReadlineError::Eof) => KeyEvent::End,
            Err(e) => {
                warn!("Readline error: {}", e);
                KeyEvent::End
            },
        }
    }
}

/// 控制循环参数
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// 运动指令的连续发送次数
    pub burst: u32,
    /// 发送与接收之间的间隔
    pub send_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            burst: 10,
            send_interval: Duration::from_millis(50),
        }
    }
}

/// 循环结束时的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub keys: u64,
    pub unknown_keys: u64,
    pub frames: u64,
    pub missed: u64,
    pub quit_sent: bool,
}

/// 运行控制循环，直到发送退出指令、输入结束或 `running` 被清除
///
/// 只有 socket 错误会中断循环并返回错误；会话由调用方关闭。
pub fn run<K: KeySource>(
    link: &mut ArmLink<Active>,
    keys: &mut K,
    config: &LoopConfig,
    running: &AtomicBool,
) -> Result<LoopSummary, LinkError> {
    let mut summary = LoopSummary::default();

    while running.load(Ordering::Relaxed) {
        let command = match keys.next_key() {
            KeyEvent::Line(line) => match command_for_key(&line) {
                Ok(command) => command,
                Err(e) => {
                    warn!("{}", e);
                    summary.unknown_keys += 1;
                    continue;
                },
            },
            KeyEvent::Interrupted => Command::from(ArmMode::Quit),
            KeyEvent::End => {
                info!("Input closed");
                break;
            },
        };
        summary.keys += 1;

        if command.mode == 0 {
            run_burst(link, &command, config, running, &mut summary)?;
            continue;
        }

        if !send_logged(link, &command)? {
            continue;
        }

        if command.is_quit() {
            info!("Quit sent");
            summary.quit_sent = true;
            break;
        }
        thread::sleep(config.send_interval);
    }

    Ok(summary)
}

/// 连续发送运动指令，每次发送后读取一次最新遥测
fn run_burst(
    link: &mut ArmLink<Active>,
    command: &Command,
    config: &LoopConfig,
    running: &AtomicBool,
    summary: &mut LoopSummary,
) -> Result<(), LinkError> {
    for round in 0..config.burst {
        if !running.load(Ordering::Relaxed) {
            debug!("Burst stopped at round {}", round);
            break;
        }

        if !send_logged(link, command)? {
            return Ok(());
        }
        thread::sleep(config.send_interval);

        match link.receive_telemetry() {
            Ok(Some(frame)) => {
                summary.frames += 1;
                println!("telemetry: {:?}", frame.values());
            },
            Ok(None) => {
                summary.missed += 1;
                println!("no telemetry");
            },
            Err(e) if e.is_parse_error() => {
                warn!("{}", e);
                summary.missed += 1;
                println!("no telemetry");
            },
            Err(e) => return Err(e),
        }

        thread::sleep(config.send_interval);
    }
    Ok(())
}

/// 发送指令；协议错误记录后返回 `false`，socket 错误向上传递
fn send_logged(link: &mut ArmLink<Active>, command: &Command) -> Result<bool, LinkError> {
    match link.send_command(command) {
        Ok(_) => Ok(true),
        Err(LinkError::Protocol(e)) => {
            warn!("Command not sent: {}", e);
            Ok(false)
        },
        Err(e) => Err(e),
    }
}
