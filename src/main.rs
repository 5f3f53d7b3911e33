use std::io::Read;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn, Level};

use sublink::{encode, extract, ProxyNode};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 订阅文件路径，缺省时从标准输入读取
    #[arg(short, long)]
    input: Option<String>,

    /// 输出格式: yaml 或 links
    #[arg(short, long, default_value = "yaml")]
    format: String,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// 输出 YAML 时包一层 proxies 字段
#[derive(Serialize)]
struct ProxiesDocument<'a> {
    proxies: &'a [ProxyNode],
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    // 优先使用环境变量 RUST_LOG，否则使用命令行参数
    let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone());

    let log_level = match log_level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    info!("🚀 Starting subscription converter");

    let content = match &args.input {
        Some(path) => {
            info!("📄 读取订阅文件: {}", path);
            std::fs::read_to_string(path).with_context(|| format!("读取 {} 失败", path))?
        }
        None => {
            info!("📄 从标准输入读取订阅内容");
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("读取标准输入失败")?;
            buf
        }
    };

    let nodes = extract(&content)?;
    info!("✅ 提取到 {} 个节点", nodes.len());

    match args.format.as_str() {
        "yaml" => {
            let doc = serde_yaml::to_string(&ProxiesDocument { proxies: &nodes })?;
            print!("{}", doc);
        }
        "links" => {
            for node in &nodes {
                match encode(node) {
                    Ok(link) => println!("{}", link),
                    Err(err) => warn!("节点 {} 重新编码失败: {}", node.name, err),
                }
            }
        }
        other => bail!("不支持的输出格式: {}", other),
    }

    Ok(())
}
