//! JS 执行器 - 基础设施层
//!
//! 持有会话的 page 资源，只暴露"执行 JS"与"发送 CDP 命令"的能力

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::infrastructure::surface::Key;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识单据与流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 向当前焦点元素插入文本（对 iframe 内的元素同样有效）
    pub async fn insert_text(&self, text: &str) -> Result<()> {
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    /// 向当前焦点元素发送一次按键
    pub async fn press(&self, key: Key) -> Result<()> {
        let (name, code, text) = match key {
            Key::Enter => ("Enter", 13, Some("\r")),
            Key::Tab => ("Tab", 9, None),
        };

        let mut down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(name)
            .code(name)
            .windows_virtual_key_code(code)
            .native_virtual_key_code(code);
        if let Some(text) = text {
            down = down.text(text);
        }
        let down = down.build().map_err(|e| anyhow::anyhow!(e))?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(name)
            .code(name)
            .windows_virtual_key_code(code)
            .native_virtual_key_code(code)
            .build()
            .map_err(|e| anyhow::anyhow!(e))?;

        self.page.execute(down).await?;
        self.page.execute(up).await?;
        Ok(())
    }
}
