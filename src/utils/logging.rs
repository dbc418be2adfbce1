//! 日志工具模块
//!
//! 提供日志初始化和输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// `RUST_LOG` 优先于配置中的日志级别；重复初始化时忽略
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 电子单据开具服务");
    info!("🌐 门户: {}", config.portal_url);
    info!("📊 最大并发数: {}", config.max_concurrent_emissions);
    info!("📁 下载目录: {}", config.download_dir.display());
    info!(
        "🖥️ 浏览器: {}",
        match config.browser_debug_port {
            Some(port) => format!("连接已有浏览器 (端口 {})", port),
            None if config.headless => "启动无头浏览器".to_string(),
            None => "启动浏览器".to_string(),
        }
    );
    info!("{}", "=".repeat(60));
}

/// 打印退出时的统计信息
pub fn log_shutdown(completed: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 服务停止统计");
    info!(
        "停止时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", completed, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
