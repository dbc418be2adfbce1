//! 表单操作 - 业务能力层
//!
//! 把"等待 + 操作"组合成门户表单上的常用动作

use std::time::Duration;

use crate::config::WaitTimeouts;
use crate::error::SurfaceError;
use crate::infrastructure::{AutomationSurface, Condition, Key, Locator};

/// 表单操作
///
/// 不持有会话，只借用；一次开票流程内复用
#[derive(Clone, Copy)]
pub struct FormDriver<'a> {
    surface: &'a dyn AutomationSurface,
    timeouts: &'a WaitTimeouts,
}

impl<'a> FormDriver<'a> {
    pub fn new(surface: &'a dyn AutomationSurface, timeouts: &'a WaitTimeouts) -> Self {
        Self { surface, timeouts }
    }

    pub fn surface(&self) -> &'a dyn AutomationSurface {
        self.surface
    }

    pub fn timeouts(&self) -> &'a WaitTimeouts {
        self.timeouts
    }

    /// 等待元素出现（常规时限）
    pub async fn present(&self, locator: &Locator) -> Result<(), SurfaceError> {
        self.surface
            .wait_for(locator, Condition::Present, self.timeouts.standard())
            .await
    }

    /// 等待元素可点击后点击（常规时限）
    pub async fn click(&self, locator: &Locator) -> Result<(), SurfaceError> {
        self.click_within(locator, self.timeouts.standard()).await
    }

    pub async fn click_within(&self, locator: &Locator, timeout: Duration) -> Result<(), SurfaceError> {
        self.surface.wait_for(locator, Condition::Clickable, timeout).await?;
        self.surface.click(locator).await
    }

    /// 清空后输入
    pub async fn fill(&self, locator: &Locator, text: &str) -> Result<(), SurfaceError> {
        self.surface.clear(locator).await?;
        self.surface.type_text(locator, text).await
    }

    /// 等待可点击、清空后输入
    pub async fn fill_when_ready(&self, locator: &Locator, text: &str) -> Result<(), SurfaceError> {
        self.surface
            .wait_for(locator, Condition::Clickable, self.timeouts.standard())
            .await?;
        self.fill(locator, text).await
    }

    /// 输入后按键（自动补全选择、触发门户查询）
    pub async fn type_and_press(&self, locator: &Locator, text: &str, key: Key) -> Result<(), SurfaceError> {
        self.surface.type_text(locator, text).await?;
        self.surface.press_key(locator, key).await
    }

    /// 等待门户回填该输入框
    pub async fn await_lookup(&self, locator: &Locator) -> Result<(), SurfaceError> {
        self.surface
            .wait_for(locator, Condition::NonEmptyValue, self.timeouts.standard())
            .await
    }

    /// 等待加载遮罩消失
    pub async fn overlay_gone(&self, locator: &Locator, timeout: Duration) -> Result<(), SurfaceError> {
        self.surface.wait_for(locator, Condition::Invisible, timeout).await
    }

    /// 等待 frame 可用并切换进去
    pub async fn enter_frame(&self, frame: &Locator) -> Result<(), SurfaceError> {
        self.surface
            .wait_for(frame, Condition::FrameAvailable, self.timeouts.standard())
            .await?;
        self.surface.switch_context(frame).await
    }

    /// 固定等待门户刷新
    pub async fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{Action, Script, ScriptedSurface};

    #[tokio::test]
    async fn test_fill_clears_before_typing() {
        let script = Script::new();
        let surface = ScriptedSurface::new(script.clone());
        let timeouts = WaitTimeouts::immediate();
        let form = FormDriver::new(&surface, &timeouts);
        let field = Locator::id("boleta.fechaEmision");

        form.fill_when_ready(&field, "15/10/2026").await.unwrap();

        assert_eq!(
            script.journal(),
            vec![
                Action::WaitFor(field.clone(), Condition::Clickable),
                Action::Clear(field.clone()),
                Action::Type(field, "15/10/2026".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_click_waits_for_clickable() {
        let button = Locator::id("btnAceptar");
        let script = Script::new().absent(button.clone());
        let surface = ScriptedSurface::new(script.clone());
        let timeouts = WaitTimeouts::immediate();
        let form = FormDriver::new(&surface, &timeouts);

        let err = form.click(&button).await.unwrap_err();
        assert!(matches!(err, SurfaceError::Timeout { .. }));
        assert!(!script.clicked(&button));
    }
}
