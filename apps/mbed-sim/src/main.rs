//! # mbed-sim
//!
//! mbed 侧测试接收端：接收 opstn 的数据报，并按简单规则回复合成遥测。
//!
//! ```bash
//! # 默认：监听 127.0.0.1:50000，回复到 127.0.0.1:60000，每三次丢一次
//! mbed-sim
//!
//! # 随机丢包 20%
//! mbed-sim --drop-probability 0.2
//! ```

mod responder;

use anyhow::{Context, Result};
use armlink_udp::config::{DEFAULT_MBED_PORT, DEFAULT_OPSTN_PORT};
use armlink_udp::{Endpoint, bind_reusable};
use clap::Parser;
use responder::{Responder, SkipPolicy, serve};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

/// mbed-sim - 测试接收端
#[derive(Parser, Debug)]
#[command(name = "mbed-sim")]
#[command(about = "Embedded-side test receiver for the UDP arm link", long_about = None)]
#[command(version)]
struct Args {
    /// 监听地址（HOST:PORT）
    #[arg(long, default_value_t = Endpoint::loopback(DEFAULT_MBED_PORT))]
    listen: Endpoint,

    /// 遥测回复地址（HOST:PORT）
    #[arg(long, default_value_t = Endpoint::loopback(DEFAULT_OPSTN_PORT))]
    reply_to: Endpoint,

    /// 最多处理的数据报数
    #[arg(long, default_value_t = 256)]
    max_iterations: u64,

    /// 随机丢包概率（0.0 - 1.0）；不指定时每三次丢一次
    #[arg(long, value_parser = parse_probability)]
    drop_probability: Option<f64>,

    /// 随机数种子（配合 --drop-probability 复现丢包序列）
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_probability(s: &str) -> Result<f64, String> {
    let p: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{} is not in 0.0..=1.0", p))
    }
}

impl Args {
    fn skip_policy(&self) -> SkipPolicy {
        match self.drop_probability {
            Some(probability) => SkipPolicy::Random { probability },
            None => SkipPolicy::EveryThird,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mbed_sim=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let listen = args.listen.resolve()?;
    let reply_to = args.reply_to.resolve()?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let socket = bind_reusable(listen)?;
    // 读超时只用来定期检查 Ctrl+C
    socket.set_read_timeout(Some(Duration::from_millis(200)))?;
    info!(
        "Listening on {}, replying to {} ({:?})",
        listen,
        reply_to,
        args.skip_policy()
    );

    let mut responder = Responder::new(args.skip_policy(), args.seed);
    let result = serve(&socket, &mut responder, reply_to, args.max_iterations, &running);
    drop(socket);
    info!("Socket {} closed", listen);

    let summary = result?;
    info!(
        "Done: {} received, {} replied, {} skipped{}",
        summary.received,
        summary.replied,
        summary.skipped,
        if summary.quit { ", quit" } else { "" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["mbed-sim"]);
        assert_eq!(args.listen, Endpoint::loopback(50000));
        assert_eq!(args.reply_to, Endpoint::loopback(60000));
        assert_eq!(args.max_iterations, 256);
        assert_eq!(args.skip_policy(), SkipPolicy::EveryThird);
    }

    #[test]
    fn test_args_drop_probability() {
        let args = Args::parse_from(["mbed-sim", "--drop-probability", "0.25"]);
        assert_eq!(args.skip_policy(), SkipPolicy::Random { probability: 0.25 });

        assert!(Args::try_parse_from(["mbed-sim", "--drop-probability", "1.5"]).is_err());
        assert!(Args::try_parse_from(["mbed-sim", "--drop-probability", "x"]).is_err());
    }
}
