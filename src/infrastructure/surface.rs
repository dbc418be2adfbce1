//! 自动化能力接口
//!
//! 流程层只依赖这里的抽象操作，不关心元素定位的具体实现

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SurfaceError;

/// 元素定位方式
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(String),
    XPath(String),
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        Locator::XPath(xpath.into())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{}", id),
            Locator::XPath(xpath) => write!(f, "xpath:{}", xpath),
        }
    }
}

/// 等待条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// 元素存在
    Present,
    /// 元素可见且可点击
    Clickable,
    /// 元素不存在或不可见
    Invisible,
    /// frame 已加载完成
    FrameAvailable,
    /// 输入框的值非空（门户回填完成）
    NonEmptyValue,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Condition::Present => "present",
            Condition::Clickable => "clickable",
            Condition::Invisible => "invisible",
            Condition::FrameAvailable => "frame-available",
            Condition::NonEmptyValue => "non-empty-value",
        };
        f.write_str(name)
    }
}

/// 按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Tab,
}

/// 打开会话的参数
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    pub download_dir: PathBuf,
}

/// 一个独占的浏览器会话
///
/// 每个开票任务独占一个会话，不跨任务共享
#[async_trait]
pub trait AutomationSurface: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), SurfaceError>;

    /// 等待条件成立，超时返回 `SurfaceError::Timeout`
    async fn wait_for(&self, locator: &Locator, condition: Condition, timeout: Duration)
        -> Result<(), SurfaceError>;

    async fn click(&self, locator: &Locator) -> Result<(), SurfaceError>;

    /// 在元素现有内容后追加输入
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), SurfaceError>;

    async fn press_key(&self, locator: &Locator, key: Key) -> Result<(), SurfaceError>;

    async fn clear(&self, locator: &Locator) -> Result<(), SurfaceError>;

    /// 之后的操作都在该 frame 内执行
    async fn switch_context(&self, frame: &Locator) -> Result<(), SurfaceError>;

    /// 输入框返回 value，其他元素返回文本
    async fn read_text(&self, locator: &Locator) -> Result<String, SurfaceError>;

    async fn trigger_download(&self, locator: &Locator) -> Result<(), SurfaceError>;

    /// 从下载目录读取文件，不存在时返回 `SurfaceError::ArtifactNotFound`
    async fn fetch_artifact_bytes(&self, expected_filename: &str) -> Result<Vec<u8>, SurfaceError>;

    async fn close(&self) -> Result<(), SurfaceError>;
}

/// 会话工厂
#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    async fn open_session(&self, options: &SessionOptions) -> Result<Box<dyn AutomationSurface>, SurfaceError>;
}
