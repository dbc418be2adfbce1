//! 可编排的自动化实现
//!
//! 不启动浏览器，按预先设定的脚本应答并记录所有操作，
//! 用于在测试与演练中驱动真实流程

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SurfaceError;
use crate::infrastructure::surface::{AutomationSurface, Condition, Key, Locator, SessionOptions, SurfaceFactory};

/// 记录下来的操作
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(String),
    WaitFor(Locator, Condition),
    Click(Locator),
    Type(Locator, String),
    Press(Locator, Key),
    Clear(Locator),
    SwitchContext(Locator),
    ReadText(Locator),
    TriggerDownload(Locator),
    FetchArtifact(String),
    Close,
}

#[derive(Default)]
struct ScriptState {
    texts: HashMap<Locator, String>,
    failing: HashSet<Locator>,
    absent: HashSet<Locator>,
    panicking: HashSet<Locator>,
    artifacts: HashMap<String, Vec<u8>>,
    step_delay: Duration,
    journal: Vec<Action>,
    closes: usize,
}

/// 共享脚本：多个会话共用同一份应答与日志
#[derive(Clone, Default)]
pub struct Script {
    state: Arc<Mutex<ScriptState>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// `read_text` 对该元素返回的内容
    pub fn with_text(self, locator: Locator, text: impl Into<String>) -> Self {
        self.lock().texts.insert(locator, text.into());
        self
    }

    /// 对该元素的任何操作都返回 `ElementNotFound`
    pub fn failing(self, locator: Locator) -> Self {
        self.lock().failing.insert(locator);
        self
    }

    /// 该元素从不出现：等待超时，但 `Invisible` 立即成立
    pub fn absent(self, locator: Locator) -> Self {
        self.lock().absent.insert(locator);
        self
    }

    /// 对该元素的任何操作都会 panic
    pub fn panicking_on(self, locator: Locator) -> Self {
        self.lock().panicking.insert(locator);
        self
    }

    /// 下载目录中存在的文件
    pub fn with_artifact(self, filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.lock().artifacts.insert(filename.into(), content.into());
        self
    }

    /// 每次等待前的延迟，模拟门户响应时间
    pub fn with_step_delay(self, delay: Duration) -> Self {
        self.lock().step_delay = delay;
        self
    }

    pub fn journal(&self) -> Vec<Action> {
        self.lock().journal.clone()
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn clicked(&self, locator: &Locator) -> bool {
        self.journal()
            .iter()
            .any(|action| matches!(action, Action::Click(l) | Action::TriggerDownload(l) if l == locator))
    }

    /// 依次输入到该元素的文本
    pub fn typed_into(&self, locator: &Locator) -> Vec<String> {
        self.journal()
            .into_iter()
            .filter_map(|action| match action {
                Action::Type(l, text) if &l == locator => Some(text),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 记录操作并检查该元素是否被设定为失败
    fn record(&self, action: Action, locator: Option<&Locator>) -> Result<(), SurfaceError> {
        let mut state = self.lock();
        state.journal.push(action);
        if let Some(locator) = locator {
            if state.panicking.contains(locator) {
                drop(state);
                panic!("scripted panic on {}", locator);
            }
            if state.failing.contains(locator) {
                return Err(SurfaceError::ElementNotFound(locator.to_string()));
            }
        }
        Ok(())
    }
}

pub struct ScriptedSurface {
    script: Script,
}

impl ScriptedSurface {
    pub fn new(script: Script) -> Self {
        Self { script }
    }
}

#[async_trait]
impl AutomationSurface for ScriptedSurface {
    async fn navigate(&self, url: &str) -> Result<(), SurfaceError> {
        self.script.record(Action::Navigate(url.to_string()), None)
    }

    async fn wait_for(&self, locator: &Locator, condition: Condition, timeout: Duration) -> Result<(), SurfaceError> {
        let delay = self.script.lock().step_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.script.record(Action::WaitFor(locator.clone(), condition), Some(locator))?;
        let absent = self.script.lock().absent.contains(locator);
        if absent && condition != Condition::Invisible {
            return Err(SurfaceError::Timeout {
                locator: locator.to_string(),
                condition: condition.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), SurfaceError> {
        self.script.record(Action::Click(locator.clone()), Some(locator))
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), SurfaceError> {
        self.script.record(Action::Type(locator.clone(), text.to_string()), Some(locator))
    }

    async fn press_key(&self, locator: &Locator, key: Key) -> Result<(), SurfaceError> {
        self.script.record(Action::Press(locator.clone(), key), Some(locator))
    }

    async fn clear(&self, locator: &Locator) -> Result<(), SurfaceError> {
        self.script.record(Action::Clear(locator.clone()), Some(locator))
    }

    async fn switch_context(&self, frame: &Locator) -> Result<(), SurfaceError> {
        self.script
            .record(Action::SwitchContext(frame.clone()), Some(frame))
            .map_err(|_| SurfaceError::FrameUnavailable(frame.to_string()))
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, SurfaceError> {
        self.script.record(Action::ReadText(locator.clone()), Some(locator))?;
        Ok(self.script.lock().texts.get(locator).cloned().unwrap_or_default())
    }

    async fn trigger_download(&self, locator: &Locator) -> Result<(), SurfaceError> {
        self.script.record(Action::TriggerDownload(locator.clone()), Some(locator))
    }

    async fn fetch_artifact_bytes(&self, expected_filename: &str) -> Result<Vec<u8>, SurfaceError> {
        self.script.record(Action::FetchArtifact(expected_filename.to_string()), None)?;
        self.script
            .lock()
            .artifacts
            .get(expected_filename)
            .cloned()
            .ok_or_else(|| SurfaceError::ArtifactNotFound(expected_filename.to_string()))
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        let mut state = self.script.lock();
        state.journal.push(Action::Close);
        state.closes += 1;
        Ok(())
    }
}

/// 每次打开都返回共享同一脚本的会话
#[derive(Default)]
pub struct ScriptedFactory {
    script: Script,
    opened: AtomicUsize,
    fail_open: bool,
}

impl ScriptedFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            opened: AtomicUsize::new(0),
            fail_open: false,
        }
    }

    /// 打开会话总是失败（浏览器无法启动）
    pub fn failing_to_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurfaceFactory for ScriptedFactory {
    async fn open_session(&self, _options: &SessionOptions) -> Result<Box<dyn AutomationSurface>, SurfaceError> {
        if self.fail_open {
            return Err(SurfaceError::Browser("无法启动浏览器".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSurface::new(self.script.clone())))
    }
}
