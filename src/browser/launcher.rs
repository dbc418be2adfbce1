use std::path::{Path, PathBuf};

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::browser::{SetDownloadBehaviorBehavior, SetDownloadBehaviorParams};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 启动参数
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub download_dir: PathBuf,
}

/// 启动浏览器并打开空白页面
///
/// 返回浏览器、页面以及 CDP 事件处理任务
pub async fn launch_browser(options: &LaunchOptions) -> Result<(Browser, Page, JoinHandle<()>)> {
    info!("🚀 启动浏览器 (无头模式: {})", options.headless);

    let mut builder = BrowserConfig::builder();
    builder = if options.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &options.chrome_executable {
        debug!("使用浏览器: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let config = builder
        .args(vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--window-size=1920,1080",
            "--disable-blink-features=AutomationControlled",
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            anyhow::anyhow!("配置浏览器失败: {}", e)
        })?;

    let (browser, handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    let handler_task = spawn_handler(handler);

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;
    allow_downloads(&page, &options.download_dir).await?;

    Ok((browser, page, handler_task))
}

/// 连接到已开启远程调试的浏览器，并新建一个独占页面
pub async fn connect_browser(port: u16, download_dir: &Path) -> Result<(Browser, Page, JoinHandle<()>)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

    let handler_task = spawn_handler(handler);

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        e
    })?;
    allow_downloads(&page, download_dir).await?;

    Ok((browser, page, handler_task))
}

/// 在后台处理浏览器事件
fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}

/// 下载直接落到指定目录，不弹出对话框
async fn allow_downloads(page: &Page, download_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(download_dir).await?;
    let absolute = std::path::absolute(download_dir)?;

    let params = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(absolute.to_string_lossy().to_string())
        .build()
        .map_err(|e| anyhow::anyhow!("下载配置无效: {}", e))?;
    page.execute(params).await?;

    info!("下载目录: {}", absolute.display());
    Ok(())
}
