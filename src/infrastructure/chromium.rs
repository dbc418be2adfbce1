//! 基于 chromiumoxide 的自动化实现
//!
//! 所有元素操作都通过 JS 在当前文档上下文中完成：
//! 顶层文档，或 `switch_context` 之后的 frame 文档

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Browser;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::browser::{self, LaunchOptions};
use crate::error::SurfaceError;
use crate::infrastructure::js_executor::JsExecutor;
use crate::infrastructure::surface::{AutomationSurface, Condition, Key, Locator, SessionOptions, SurfaceFactory};

/// 浏览器会话工厂
pub struct ChromiumLauncher {
    chrome_executable: Option<PathBuf>,
    /// 设置后连接已有浏览器
    debug_port: Option<u16>,
    poll_interval: Duration,
}

impl ChromiumLauncher {
    pub fn new(chrome_executable: Option<PathBuf>, debug_port: Option<u16>, poll_interval: Duration) -> Self {
        Self {
            chrome_executable,
            debug_port,
            poll_interval,
        }
    }
}

#[async_trait]
impl SurfaceFactory for ChromiumLauncher {
    async fn open_session(&self, options: &SessionOptions) -> Result<Box<dyn AutomationSurface>, SurfaceError> {
        let (browser, page, handler_task) = match self.debug_port {
            Some(port) => browser::connect_browser(port, &options.download_dir).await?,
            None => {
                let launch = LaunchOptions {
                    headless: options.headless,
                    chrome_executable: self.chrome_executable.clone(),
                    download_dir: options.download_dir.clone(),
                };
                browser::launch_browser(&launch).await?
            }
        };

        Ok(Box::new(ChromiumSurface {
            browser: Mutex::new(Some(browser)),
            owns_browser: self.debug_port.is_none(),
            handler_task,
            executor: JsExecutor::new(page),
            frame: RwLock::new(None),
            download_dir: options.download_dir.clone(),
            poll_interval: self.poll_interval,
        }))
    }
}

/// 一个浏览器会话
pub struct ChromiumSurface {
    browser: Mutex<Option<Browser>>,
    /// 连接到外部浏览器时只关闭自己的页面
    owns_browser: bool,
    handler_task: JoinHandle<()>,
    executor: JsExecutor,
    frame: RwLock<Option<Locator>>,
    download_dir: PathBuf,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct ElementReply {
    found: bool,
    #[serde(default)]
    value: Option<String>,
}

impl ChromiumSurface {
    async fn run_on_element(&self, locator: &Locator, body: &str) -> Result<ElementReply, SurfaceError> {
        let frame = self.frame.read().await.clone();
        let script = element_script(frame.as_ref(), locator, body);
        let reply: ElementReply = self.executor.eval_as(script).await?;
        if !reply.found {
            return Err(SurfaceError::ElementNotFound(locator.to_string()));
        }
        Ok(reply)
    }

    async fn check(&self, locator: &Locator, condition: Condition) -> Result<bool, SurfaceError> {
        let frame = self.frame.read().await.clone();
        let script = condition_script(frame.as_ref(), locator, condition);
        Ok(self.executor.eval_as::<bool>(script).await?)
    }

    async fn focus(&self, locator: &Locator) -> Result<(), SurfaceError> {
        self.run_on_element(locator, FOCUS_BODY).await.map(|_| ())
    }
}

#[async_trait]
impl AutomationSurface for ChromiumSurface {
    async fn navigate(&self, url: &str) -> Result<(), SurfaceError> {
        debug!("导航到: {}", url);
        *self.frame.write().await = None;
        self.executor.goto(url).await?;
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, condition: Condition, timeout: Duration) -> Result<(), SurfaceError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.check(locator, condition).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                // 页面跳转过程中执行上下文可能短暂不可用
                Err(e) => debug!("检查 {} ({}) 失败，继续等待: {}", locator, condition, e),
            }
            if Instant::now() >= deadline {
                return Err(SurfaceError::Timeout {
                    locator: locator.to_string(),
                    condition: condition.to_string(),
                    timeout,
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), SurfaceError> {
        self.run_on_element(locator, CLICK_BODY).await.map(|_| ())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), SurfaceError> {
        self.focus(locator).await?;
        self.executor.insert_text(text).await?;
        Ok(())
    }

    async fn press_key(&self, locator: &Locator, key: Key) -> Result<(), SurfaceError> {
        self.focus(locator).await?;
        self.executor.press(key).await?;
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> Result<(), SurfaceError> {
        self.run_on_element(locator, CLEAR_BODY).await.map(|_| ())
    }

    async fn switch_context(&self, frame: &Locator) -> Result<(), SurfaceError> {
        let available = self.check(frame, Condition::FrameAvailable).await?;
        if !available {
            return Err(SurfaceError::FrameUnavailable(frame.to_string()));
        }
        *self.frame.write().await = Some(frame.clone());
        debug!("切换到 frame: {}", frame);
        Ok(())
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, SurfaceError> {
        let reply = self.run_on_element(locator, READ_BODY).await?;
        Ok(reply.value.unwrap_or_default())
    }

    async fn trigger_download(&self, locator: &Locator) -> Result<(), SurfaceError> {
        self.click(locator).await
    }

    async fn fetch_artifact_bytes(&self, expected_filename: &str) -> Result<Vec<u8>, SurfaceError> {
        let path = self.download_dir.join(expected_filename);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SurfaceError::ArtifactNotFound(expected_filename.to_string()))
            }
            Err(e) => Err(SurfaceError::Io(e)),
        }
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        let browser = self.browser.lock().await.take();
        let result = match browser {
            Some(mut browser) if self.owns_browser => {
                let closed = browser.close().await;
                if let Err(e) = browser.wait().await {
                    warn!("等待浏览器进程退出失败: {}", e);
                }
                closed.map(|_| ())
            }
            Some(_) => self.executor.page().clone().close().await,
            None => Ok(()),
        };
        self.handler_task.abort();
        result.map_err(SurfaceError::from)
    }
}

const FOCUS_BODY: &str = r#"
    el.focus();
    if (typeof el.setSelectionRange === 'function') {
        const end = String(el.value || '').length;
        try { el.setSelectionRange(end, end); } catch (e) {}
    }
    return { found: true };
"#;

const CLICK_BODY: &str = r#"
    el.scrollIntoView({ block: 'center' });
    el.click();
    return { found: true };
"#;

const CLEAR_BODY: &str = r#"
    el.value = '';
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return { found: true };
"#;

const READ_BODY: &str = r#"
    const value = ('value' in el && el.value !== undefined) ? String(el.value) : (el.textContent || '');
    return { found: true, value: value };
"#;

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// 在 `doc` 中定位元素的表达式
fn lookup_expr(locator: &Locator, doc: &str) -> String {
    match locator {
        Locator::Id(id) => format!("{doc}.getElementById({})", js_string(id)),
        Locator::XPath(xpath) => format!(
            "{doc}.evaluate({}, {doc}, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
            js_string(xpath)
        ),
    }
}

/// 当前上下文文档的表达式
fn document_expr(frame: Option<&Locator>) -> String {
    match frame {
        None => "document".to_string(),
        Some(frame) => format!(
            "(() => {{ const f = {}; return f ? f.contentDocument : null; }})()",
            lookup_expr(frame, "document")
        ),
    }
}

fn prelude(frame: Option<&Locator>, locator: &Locator) -> String {
    format!(
        "const doc = {};\n    const el = doc ? {} : null;",
        document_expr(frame),
        lookup_expr(locator, "doc")
    )
}

fn element_script(frame: Option<&Locator>, locator: &Locator, body: &str) -> String {
    format!(
        "(() => {{\n    {}\n    if (!el) return {{ found: false }};\n    {}\n}})()",
        prelude(frame, locator),
        body
    )
}

fn condition_script(frame: Option<&Locator>, locator: &Locator, condition: Condition) -> String {
    let check = match condition {
        Condition::Present => "el !== null",
        Condition::Clickable => {
            "el !== null && !el.disabled && el.getClientRects().length > 0 \
             && el.ownerDocument.defaultView.getComputedStyle(el).visibility !== 'hidden'"
        }
        Condition::Invisible => {
            "el === null || el.getClientRects().length === 0 \
             || el.ownerDocument.defaultView.getComputedStyle(el).visibility === 'hidden'"
        }
        Condition::FrameAvailable => {
            "el !== null && !!el.contentDocument && el.contentDocument.readyState === 'complete'"
        }
        Condition::NonEmptyValue => "el !== null && String(el.value || '').trim() !== ''",
    };
    format!("(() => {{\n    {}\n    return {};\n}})()", prelude(frame, locator), check)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_is_escaped() {
        let expr = lookup_expr(&Locator::id("boleta.fechaEmision"), "doc");
        assert_eq!(expr, r#"doc.getElementById("boleta.fechaEmision")"#);
    }

    #[test]
    fn test_lookup_by_xpath_keeps_quotes() {
        let expr = lookup_expr(&Locator::xpath(r#"//*[@id="nivel4_11_5_4_1_2"]/span"#), "doc");
        assert!(expr.starts_with(r#"doc.evaluate("//*[@id=\"nivel4_11_5_4_1_2\"]/span", doc"#));
        assert!(expr.ends_with(".singleNodeValue"));
    }

    #[test]
    fn test_scripts_target_frame_document() {
        let frame = Locator::id("iframeApplication");
        let script = condition_script(Some(&frame), &Locator::id("inicio.razonSocial"), Condition::NonEmptyValue);
        assert!(script.contains(r#"document.getElementById("iframeApplication")"#));
        assert!(script.contains("contentDocument"));
        assert!(script.contains(r#"doc.getElementById("inicio.razonSocial")"#));
        assert!(script.contains("trim() !== ''"));
    }

    #[test]
    fn test_element_script_reports_missing_element() {
        let script = element_script(None, &Locator::id("btnAceptar"), CLICK_BODY);
        assert!(script.starts_with("(() => {"));
        assert!(script.contains("const doc = document;"));
        assert!(script.contains("if (!el) return { found: false };"));
        assert!(script.contains("el.click();"));
    }
}
