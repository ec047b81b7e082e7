//! # opstn
//!
//! 操作员站：从键盘读取按键，向 mbed 发送单字节指令，并显示最新遥测。
//!
//! ```bash
//! # 默认：本地 127.0.0.1:60000，mbed 127.0.0.1:50000
//! opstn
//!
//! # 使用配置文件，并覆盖接收超时
//! opstn --config armlink.toml --timeout-ms 20
//! ```

use anyhow::{Context, Result};
use armlink_udp::{ArmLink, Endpoint, LinkConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::info;

mod control_loop;
mod keymap;

use control_loop::{LoopConfig, TerminalKeys};

/// opstn - 机械臂操作员站
#[derive(Parser, Debug)]
#[command(name = "opstn")]
#[command(about = "Operator station for the UDP arm link", long_about = None)]
#[command(version)]
struct Args {
    /// 链路配置文件（TOML），命令行参数会覆盖其中的值
    #[arg(long)]
    config: Option<PathBuf>,

    /// 本地绑定地址（HOST:PORT）
    #[arg(long)]
    local: Option<Endpoint>,

    /// mbed 地址（HOST:PORT）
    #[arg(long)]
    peer: Option<Endpoint>,

    /// 遥测接收超时（毫秒）
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// 运动指令的连续发送次数
    #[arg(long, default_value_t = 10)]
    burst: u32,

    /// 发送间隔（毫秒）
    #[arg(long, default_value_t = 50)]
    send_interval_ms: u64,

    /// 握手后的等待时间（毫秒）
    #[arg(long, default_value_t = 1000)]
    settle_ms: u64,
}

impl Args {
    /// 配置文件 + 命令行覆盖
    fn link_config(&self) -> Result<LinkConfig> {
        let mut config = match &self.config {
            Some(path) => LinkConfig::load_from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => LinkConfig::default(),
        };

        if let Some(local) = &self.local {
            config.local = local.clone();
        }
        if let Some(peer) = &self.peer {
            config.peer = peer.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.recv_timeout_ms = timeout_ms;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("opstn=info".parse()?)
                .add_directive("armlink_udp=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = args.link_config()?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let mut keys = TerminalKeys::new()?;

    let mut link = ArmLink::connect(config).context("Failed to start arm link")?;
    thread::sleep(Duration::from_millis(args.settle_ms));

    let loop_config = LoopConfig {
        burst: args.burst,
        send_interval: Duration::from_millis(args.send_interval_ms),
    };
    println!("Keys: w/s pitch, a/d yaw, j/k linear, S start, R reset, Q quit");

    let result = control_loop::run(&mut link, &mut keys, &loop_config, &running);
    let stats = link.stats();
    link.close();

    let summary = result?;
    info!(
        "Session ended: {} key(s) ({} unknown), {} frame(s), {} missed, {} command(s) sent{}",
        summary.keys,
        summary.unknown_keys,
        summary.frames,
        summary.missed,
        stats.commands_sent,
        if summary.quit_sent { ", quit sent" } else { "" }
    );
    Ok(())
}
