//! redis-basic - 缓存演示程序
//!
//! 连接 Redis（或启动内嵌服务器），存入几种类型的值并读回，最后回放 `Cache.store` 的调用历史。

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use redis_basic::{server, Cache, ConnectionOptions};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "redis-basic")]
#[command(about = "Instrumented Redis cache demo")]
struct Args {
    /// Redis 地址，形如 redis://host:port/db
    #[arg(short, long, default_value = "redis://127.0.0.1:6379/0")]
    url: String,

    /// 不连接外部 Redis，启动内嵌服务器
    #[arg(short, long)]
    embedded: bool,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = if args.embedded {
        let addr = server::spawn("127.0.0.1:0".parse()?)?;
        info!("Embedded server started on {}", addr);
        ConnectionOptions::with_addr(addr)
    } else {
        ConnectionOptions::from_url(&args.url)?
    };

    let cache = Cache::connect(&options)?;

    let text_key = cache.store("hello")?;
    let int_key = cache.store(42)?;
    let float_key = cache.store(2.5)?;
    let bytes_key = cache.store(b"\x00bytes".to_vec())?;

    println!("{} -> {:?}", text_key, cache.get_str(&text_key)?);
    println!("{} -> {:?}", int_key, cache.get_int(&int_key)?);
    println!("{} -> {:?}", float_key, cache.get_float(&float_key)?);
    println!("{} -> {:?}", bytes_key, cache.get(&bytes_key)?);
    println!("nonexistent-key -> {:?}", cache.get_str("nonexistent-key")?);
    println!();

    cache.replay(Cache::STORE_QUALNAME)?;

    Ok(())
}
