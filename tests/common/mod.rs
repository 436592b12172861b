use redis_basic::{server, ConnectionOptions};

/// 启动一个内嵌服务器，返回指向它的连接参数
pub fn start_server() -> ConnectionOptions {
    let _ = tracing_subscriber::fmt::try_init();
    let addr = server::spawn("127.0.0.1:0".parse().unwrap()).expect("start embedded server");
    ConnectionOptions::with_addr(addr)
}
