//! 贷记单开具流程 - 流程层
//!
//! 流程顺序：
//! 1. 在小票菜单下进入"开具贷记单"
//! 2. 开具日期
//! 3. 原因选择（代码 → 门户显示文本）
//! 4. 被冲销小票的单号（只输入数字部分）
//! 5. 说明文字
//! 6. 继续 → 预览确认 → 等待遮罩 → 最终确认

use tracing::{info, warn};

use crate::error::{EmissionError, FlowStep, StepContext, SurfaceError};
use crate::infrastructure::{Condition, Key};
use crate::models::motive::motive_text;
use crate::models::{CreditNoteRequest, DocumentKind};
use crate::services::selectors::{self, credit_note};
use crate::services::FormDriver;
use crate::utils::logging::truncate_text;
use crate::workflow::flow_ctx::FlowCtx;

/// 从单号中取出的数字部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceNumber<'a> {
    pub value: &'a str,
    /// 没有 `-` 分隔时原样使用
    pub fell_back: bool,
}

/// `EB01-448` → `448`；没有分隔符时原样返回并标记
pub fn extract_reference_number(raw: &str) -> ReferenceNumber<'_> {
    let trimmed = raw.trim();
    match trimmed.rsplit_once('-') {
        Some((_, suffix)) if !suffix.trim().is_empty() => ReferenceNumber {
            value: suffix.trim(),
            fell_back: false,
        },
        _ => ReferenceNumber {
            value: trimmed,
            fell_back: true,
        },
    }
}

/// 贷记单流程的附加信息
#[derive(Debug, Clone, Default)]
pub struct CreditNoteReport {
    /// 实际输入门户的单号
    pub reference_entered: String,
    pub warnings: Vec<String>,
}

/// 贷记单流程
pub struct CreditNoteFlow<'a> {
    form: FormDriver<'a>,
}

impl<'a> CreditNoteFlow<'a> {
    pub fn new(form: FormDriver<'a>) -> Self {
        Self { form }
    }

    pub async fn run(&self, request: &CreditNoteRequest, ctx: &FlowCtx) -> Result<CreditNoteReport, EmissionError> {
        let mut report = CreditNoteReport::default();

        info!("{} 🔍 进入贷记单菜单", ctx);
        self.open_form().await.during(FlowStep::SearchMenu)?;

        info!("{} 📅 开具日期: {}", ctx, request.emission_date);
        self.enter_date(&request.emission_date)
            .await
            .during(FlowStep::DateEntry)?;

        let motive = motive_text(&request.motive_code);
        info!("{} 📝 原因: {} ({})", ctx, motive, request.motive_code);
        self.select_motive(motive)
            .await
            .during(FlowStep::ReasonSelection)?;

        let reference = extract_reference_number(&request.referenced_document);
        if reference.fell_back {
            warn!(
                "{} ⚠️ 单号中没有分隔符，原样使用: {}",
                ctx, request.referenced_document
            );
            report.warnings.push(format!(
                "Número de boleta sin serie, se usó sin cambios: {}",
                request.referenced_document
            ));
        }
        info!(
            "{} 🔗 关联小票: {} → {}",
            ctx, request.referenced_document, reference.value
        );
        self.enter_reference(reference.value)
            .await
            .during(FlowStep::ReferenceEntry)?;
        report.reference_entered = reference.value.to_string();

        info!(
            "{} 说明文字: {}",
            ctx,
            truncate_text(&request.sustaining_text, 40)
        );
        self.enter_sustaining_text(&request.sustaining_text)
            .await
            .during(FlowStep::SustainingText)?;

        self.commit(ctx).await.during(FlowStep::Commit)?;
        info!("{} ✓ 贷记单已确认提交", ctx);
        Ok(report)
    }

    async fn open_form(&self) -> Result<(), SurfaceError> {
        let search = selectors::id(selectors::SEARCH_FIELD);
        self.form.present(&search).await?;
        self.form
            .fill(&search, DocumentKind::CreditNote.search_term())
            .await?;
        self.form
            .click(&selectors::menu_entry(DocumentKind::CreditNote))
            .await?;
        self.form.enter_frame(&selectors::id(selectors::FRAME)).await
    }

    async fn enter_date(&self, date: &str) -> Result<(), SurfaceError> {
        let field = selectors::id(credit_note::DATE);
        self.form.fill_when_ready(&field, date).await?;
        self.form.surface().press_key(&field, Key::Tab).await
    }

    async fn select_motive(&self, motive: &str) -> Result<(), SurfaceError> {
        let field = selectors::id(credit_note::MOTIVE);
        self.form.present(&field).await?;
        self.form.surface().clear(&field).await?;
        self.form.type_and_press(&field, motive, Key::Enter).await?;
        self.form.settle(self.form.timeouts().motive_settle()).await;
        Ok(())
    }

    async fn enter_reference(&self, reference: &str) -> Result<(), SurfaceError> {
        let field = selectors::id(credit_note::REFERENCE);
        self.form
            .surface()
            .wait_for(&field, Condition::Present, self.form.timeouts().long())
            .await?;
        self.form.type_and_press(&field, reference, Key::Tab).await
    }

    async fn enter_sustaining_text(&self, text: &str) -> Result<(), SurfaceError> {
        let field = selectors::id(credit_note::SUSTAINING_TEXT);
        self.form.present(&field).await?;
        self.form.surface().type_text(&field, text).await
    }

    async fn commit(&self, ctx: &FlowCtx) -> Result<(), SurfaceError> {
        self.form
            .click(&selectors::id(credit_note::CONTINUE))
            .await?;
        self.form
            .click(&selectors::preliminary_confirm(DocumentKind::CreditNote))
            .await?;
        self.form
            .overlay_gone(
                &selectors::id(selectors::LOADING_OVERLAY),
                self.form.timeouts().long(),
            )
            .await?;
        info!("{} 预览已确认", ctx);
        self.form
            .click(&selectors::id(selectors::FINAL_CONFIRM))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WaitTimeouts;
    use crate::error::ErrorCategory;
    use crate::infrastructure::{Script, ScriptedSurface};
    use crate::models::request::fixtures;
    use crate::models::TaskId;

    async fn run(script: &Script, request: &CreditNoteRequest) -> Result<CreditNoteReport, EmissionError> {
        let surface = ScriptedSurface::new(script.clone());
        let timeouts = WaitTimeouts::immediate();
        let flow = CreditNoteFlow::new(FormDriver::new(&surface, &timeouts));
        flow.run(request, &FlowCtx::new(TaskId::new(), DocumentKind::CreditNote))
            .await
    }

    #[test]
    fn test_reference_suffix_is_extracted() {
        assert_eq!(
            extract_reference_number("EB01-448"),
            ReferenceNumber {
                value: "448",
                fell_back: false
            }
        );
    }

    #[test]
    fn test_reference_without_separator_falls_back() {
        assert_eq!(
            extract_reference_number("448"),
            ReferenceNumber {
                value: "448",
                fell_back: true
            }
        );
    }

    #[test]
    fn test_reference_uses_last_separator() {
        assert_eq!(extract_reference_number("B-EB01-0449").value, "0449");
        assert!(extract_reference_number("EB01-").fell_back);
    }

    #[tokio::test]
    async fn test_credit_note_flow_enters_motive_and_reference() {
        let script = Script::new();
        let mut request = fixtures::credit_note();
        request.motive_code = "03".to_string();

        let report = run(&script, &request).await.unwrap();

        assert_eq!(report.reference_entered, "448");
        assert!(report.warnings.is_empty());
        assert_eq!(
            script.typed_into(&selectors::id(credit_note::MOTIVE)),
            vec!["Devolucion Total".to_string()]
        );
        assert_eq!(
            script.typed_into(&selectors::id(credit_note::REFERENCE)),
            vec!["448".to_string()]
        );
        assert!(script.clicked(&selectors::xpath(credit_note::MENU_ENTRY)));
        assert!(script.clicked(&selectors::id(selectors::FINAL_CONFIRM)));
    }

    #[tokio::test]
    async fn test_unseparated_reference_is_recorded_as_warning() {
        let script = Script::new();
        let mut request = fixtures::credit_note();
        request.referenced_document = "448".to_string();

        let report = run(&script, &request).await.unwrap();
        assert_eq!(report.reference_entered, "448");
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_map_to_credit_note_steps() {
        let script = Script::new().failing(selectors::id(credit_note::MOTIVE));
        let err = run(&script, &fixtures::credit_note()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ReasonSelectionFailure);

        let script = Script::new().absent(selectors::id(credit_note::REFERENCE));
        let err = run(&script, &fixtures::credit_note()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ReferenceEntryFailure);

        let script = Script::new().failing(selectors::id(credit_note::SUSTAINING_TEXT));
        let err = run(&script, &fixtures::credit_note()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::SustainingTextFailure);
    }
}
