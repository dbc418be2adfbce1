//! 会话守卫
//!
//! 打开与释放成对出现：正常路径调用 `release()`，
//! 提前返回、panic 或任务被丢弃时由 Drop 在后台关闭

use tracing::{debug, warn};

use crate::error::SurfaceError;
use crate::infrastructure::surface::{AutomationSurface, SessionOptions, SurfaceFactory};

pub struct SessionGuard {
    surface: Option<Box<dyn AutomationSurface>>,
}

impl SessionGuard {
    pub async fn open(factory: &dyn SurfaceFactory, options: &SessionOptions) -> Result<Self, SurfaceError> {
        let surface = factory.open_session(options).await?;
        debug!("浏览器会话已打开");
        Ok(Self { surface: Some(surface) })
    }

    /// 会话在释放前一直可用
    pub fn surface(&self) -> &dyn AutomationSurface {
        match &self.surface {
            Some(surface) => surface.as_ref(),
            None => unreachable!("session used after release"),
        }
    }

    /// 关闭会话，关闭失败只记录日志
    pub async fn release(mut self) {
        if let Some(surface) = self.surface.take() {
            match surface.close().await {
                Ok(()) => debug!("浏览器会话已关闭"),
                Err(e) => warn!("关闭浏览器会话失败: {}", e),
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(surface) = self.surface.take() else {
            return;
        };
        warn!("浏览器会话未正常释放，后台关闭");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = surface.close().await {
                        warn!("后台关闭浏览器会话失败: {}", e);
                    }
                });
            }
            Err(_) => warn!("没有可用的运行时，无法关闭浏览器会话"),
        }
    }
}
