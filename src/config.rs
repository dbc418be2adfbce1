//! 程序配置：默认值、TOML 文件与环境变量

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 税务门户入口 URL
    pub portal_url: String,
    /// 是否以无头模式启动浏览器
    pub headless: bool,
    /// 浏览器下载目录
    pub download_dir: PathBuf,
    /// 自定义浏览器可执行文件
    pub chrome_executable: Option<PathBuf>,
    /// 浏览器调试端口（设置后连接已有浏览器，而不是启动新浏览器）
    pub browser_debug_port: Option<u16>,
    /// HTTP 监听地址
    pub api_host: String,
    /// HTTP 监听端口
    pub api_port: u16,
    /// 日志级别
    pub log_level: String,
    /// 同时驱动浏览器的开票任务数量
    pub max_concurrent_emissions: usize,
    /// 金额比对容差
    pub total_tolerance: f64,
    /// 等待时间
    pub timeouts: WaitTimeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_url: "https://e-menu.sunat.gob.pe/cl-ti-itmenu/MenuInternet.htm".to_string(),
            headless: true,
            download_dir: PathBuf::from("downloads"),
            chrome_executable: None,
            browser_debug_port: None,
            api_host: "0.0.0.0".to_string(),
            api_port: 8000,
            log_level: "info".to_string(),
            max_concurrent_emissions: 4,
            total_tolerance: 0.01,
            timeouts: WaitTimeouts::default(),
        }
    }
}

/// 页面等待时间（毫秒）
///
/// 门户的界面切换远慢于网络延迟，这里的数值以界面切换为准
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WaitTimeouts {
    /// 可选控件（如关联文档确认）
    pub short_ms: u64,
    /// 读取单号、等待下载按钮
    pub lookup_ms: u64,
    /// 常规步骤
    pub standard_ms: u64,
    /// 慢步骤（单号输入框、最终确认前的遮罩）
    pub long_ms: u64,
    /// 点击下载后等待文件落盘
    pub download_settle_ms: u64,
    /// 选择退款原因后等待表单刷新
    pub motive_settle_ms: u64,
    /// 读取合计前等待门户重算
    pub total_settle_ms: u64,
    /// 条件轮询间隔
    pub poll_ms: u64,
}

impl Default for WaitTimeouts {
    fn default() -> Self {
        Self {
            short_ms: 5_000,
            lookup_ms: 10_000,
            standard_ms: 20_000,
            long_ms: 30_000,
            download_settle_ms: 5_000,
            motive_settle_ms: 2_000,
            total_settle_ms: 1_000,
            poll_ms: 250,
        }
    }
}

impl WaitTimeouts {
    pub fn short(&self) -> Duration {
        Duration::from_millis(self.short_ms)
    }

    pub fn lookup(&self) -> Duration {
        Duration::from_millis(self.lookup_ms)
    }

    pub fn standard(&self) -> Duration {
        Duration::from_millis(self.standard_ms)
    }

    pub fn long(&self) -> Duration {
        Duration::from_millis(self.long_ms)
    }

    pub fn download_settle(&self) -> Duration {
        Duration::from_millis(self.download_settle_ms)
    }

    pub fn motive_settle(&self) -> Duration {
        Duration::from_millis(self.motive_settle_ms)
    }

    pub fn total_settle(&self) -> Duration {
        Duration::from_millis(self.total_settle_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    /// 所有等待均为零，测试中使用
    pub fn immediate() -> Self {
        Self {
            short_ms: 0,
            lookup_ms: 0,
            standard_ms: 0,
            long_ms: 0,
            download_settle_ms: 0,
            motive_settle_ms: 0,
            total_settle_ms: 0,
            poll_ms: 1,
        }
    }
}

impl Config {
    /// 加载配置：先读取 `EMISSION_CONFIG` 指向的 TOML 文件（可选），再应用环境变量
    pub fn load() -> Result<Self> {
        match std::env::var("EMISSION_CONFIG") {
            Ok(path) => Ok(Self::from_toml_file(Path::new(&path))?.with_env_overrides()),
            Err(_) => Ok(Self::from_env()),
        }
    }

    /// 只从环境变量读取配置
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺失的键使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            portal_url: std::env::var("PORTAL_URL").unwrap_or(self.portal_url),
            headless: env_parse("CHROME_HEADLESS").unwrap_or(self.headless),
            download_dir: std::env::var("DOWNLOAD_DIR").map(PathBuf::from).unwrap_or(self.download_dir),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().map(PathBuf::from).or(self.chrome_executable),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(self.browser_debug_port),
            api_host: std::env::var("API_HOST").unwrap_or(self.api_host),
            api_port: env_parse("API_PORT").unwrap_or(self.api_port),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(self.log_level),
            max_concurrent_emissions: env_parse("MAX_CONCURRENT_EMISSIONS").unwrap_or(self.max_concurrent_emissions),
            total_tolerance: env_parse("TOTAL_TOLERANCE").unwrap_or(self.total_tolerance),
            timeouts: self.timeouts,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
