//! 小票 / 发票开具流程 - 流程层
//!
//! 流程顺序：
//! 1. 菜单搜索 → 进入表单 frame
//! 2. 客户信息（身份证 / 税号 / 仅姓名）
//! 3. 开具日期
//! 4. 逐个录入商品
//! 5. 核对门户合计
//! 6. 保存 → 关联文档（可选）→ 预览确认 → 最终确认

use tracing::info;

use crate::error::{EmissionError, FlowStep, StepContext, SurfaceError};
use crate::infrastructure::Key;
use crate::models::{ClientPath, DocumentKind, EmissionRequest, LineItem};
use crate::services::selectors::{self, client, item};
use crate::services::{FormDriver, Validator};
use crate::workflow::flow_ctx::FlowCtx;

/// 小票 / 发票流程
///
/// - 编排一张单据的完整录入过程
/// - 不持有会话，只借用 FormDriver
/// - 任何一步失败立即终止，不做部分回滚
pub struct DocumentFlow<'a> {
    form: FormDriver<'a>,
    validator: Validator,
}

impl<'a> DocumentFlow<'a> {
    pub fn new(form: FormDriver<'a>, validator: Validator) -> Self {
        Self { form, validator }
    }

    pub async fn run(&self, request: &EmissionRequest, ctx: &FlowCtx) -> Result<(), EmissionError> {
        let kind = request.kind;
        if kind == DocumentKind::CreditNote {
            return Err(EmissionError::UnsupportedKind(kind));
        }

        info!("{} 🔍 搜索菜单: {}", ctx, kind.search_term());
        self.open_form(kind).await.during(FlowStep::SearchMenu)?;

        self.fill_client(request, ctx).await?;

        info!("{} 📅 开具日期: {}", ctx, request.emission_date);
        self.form
            .fill_when_ready(&selectors::emission_date(kind), &request.emission_date)
            .await
            .during(FlowStep::DateEntry)?;

        let total_items = request.line_items.len();
        for (index, line_item) in request.line_items.iter().enumerate() {
            let position = index + 1;
            info!(
                "{} 📦 录入第 {}/{} 个商品: {}",
                ctx, position, total_items, line_item.description
            );
            self.add_item(kind, line_item)
                .await
                .during(FlowStep::ItemEntry(position))?;
        }

        self.check_total(kind, request.summary.total).await?;
        info!("{} ✓ 合计核对通过: S/ {:.2}", ctx, request.summary.total);

        self.commit(kind, ctx).await.during(FlowStep::Commit)?;
        info!("{} ✓ 单据已确认提交", ctx);
        Ok(())
    }

    async fn open_form(&self, kind: DocumentKind) -> Result<(), SurfaceError> {
        let search = selectors::id(selectors::SEARCH_FIELD);
        self.form.present(&search).await?;
        self.form.fill(&search, kind.search_term()).await?;
        self.form.click(&selectors::menu_entry(kind)).await?;
        self.form.enter_frame(&selectors::id(selectors::FRAME)).await
    }

    async fn fill_client(&self, request: &EmissionRequest, ctx: &FlowCtx) -> Result<(), EmissionError> {
        let kind = request.kind;
        let Some(path) = request.client.path_for(kind) else {
            let message = match kind {
                DocumentKind::Invoice => "Factura requiere RUC del cliente",
                _ => "Boleta requiere DNI o nombre del cliente",
            };
            return Err(EmissionError::Validation(vec![message.to_string()]));
        };

        self.client_steps(path, ctx).await.during(FlowStep::ClientSection)
    }

    async fn client_steps(&self, path: ClientPath<'_>, ctx: &FlowCtx) -> Result<(), SurfaceError> {
        let number_field = selectors::id(client::DOCUMENT_NUMBER);
        let name_field = selectors::id(client::NAME);

        match path {
            ClientPath::NationalId(national_id) => {
                info!("{} 👤 客户: 身份证", ctx);
                self.select_document_type(client::NATIONAL_ID_TYPE).await?;
                self.form.type_and_press(&number_field, national_id, Key::Tab).await?;
                self.form.await_lookup(&name_field).await?;
            }
            ClientPath::TaxId(tax_id) => {
                info!("{} 🏢 客户: 税号", ctx);
                self.form.present(&number_field).await?;
                self.form.type_and_press(&number_field, tax_id, Key::Tab).await?;
                self.form.await_lookup(&name_field).await?;
            }
            ClientPath::NameOnly(name) => {
                info!("{} 👤 客户: 无证件", ctx);
                self.select_document_type(client::NO_DOCUMENT_TYPE).await?;
                self.form.surface().type_text(&name_field, name).await?;
            }
        }

        self.form.click(&selectors::id(client::CONTINUE)).await
    }

    async fn select_document_type(&self, label: &str) -> Result<(), SurfaceError> {
        let field = selectors::id(client::DOCUMENT_TYPE);
        self.form.surface().clear(&field).await?;
        self.form.type_and_press(&field, label, Key::Enter).await
    }

    async fn add_item(&self, kind: DocumentKind, line_item: &LineItem) -> Result<(), SurfaceError> {
        let timeouts = self.form.timeouts();
        self.form
            .overlay_gone(&selectors::id(selectors::LOADING_OVERLAY), timeouts.standard())
            .await?;
        self.form.click(&selectors::add_item_button(kind)).await?;
        self.form.click(&selectors::xpath(item::SUB_TYPE)).await?;

        self.form
            .fill(&selectors::xpath(item::QUANTITY), &line_item.formatted_quantity())
            .await?;
        self.form
            .fill(&selectors::id(item::UNIT), &line_item.unit_of_measure)
            .await?;
        self.form
            .fill(&selectors::id(item::DESCRIPTION), &line_item.description)
            .await?;
        self.form
            .fill(&selectors::id(item::UNIT_PRICE), &line_item.formatted_unit_price())
            .await?;

        if line_item.is_tax_exempt() {
            self.form.surface().click(&selectors::id(item::TAX_EXEMPT)).await?;
        }

        self.form.surface().click(&selectors::id(item::ACCEPT)).await
    }

    async fn check_total(&self, kind: DocumentKind, expected: f64) -> Result<(), EmissionError> {
        self.form.settle(self.form.timeouts().total_settle()).await;

        let rendered = self
            .form
            .surface()
            .read_text(&selectors::total_field(kind))
            .await
            .map_err(|e| EmissionError::TotalUnreadable(e.to_string()))?;
        let actual = parse_portal_total(&rendered).ok_or_else(|| EmissionError::TotalUnreadable(rendered.clone()))?;

        if !self.validator.within_tolerance(actual, expected) {
            return Err(EmissionError::TotalMismatch { expected, actual });
        }
        Ok(())
    }

    async fn commit(&self, kind: DocumentKind, ctx: &FlowCtx) -> Result<(), SurfaceError> {
        let timeouts = self.form.timeouts();
        self.form.click(&selectors::save_button(kind)).await?;
        info!("{} 💾 单据已保存", ctx);

        // 关联文档确认一般不会出现
        match self
            .form
            .click_within(&selectors::xpath(selectors::RELATED_DOCUMENTS), timeouts.short())
            .await
        {
            Ok(()) => info!("{} 关联文档已确认", ctx),
            Err(_) => info!("{} 没有关联文档", ctx),
        }

        self.form.click(&selectors::preliminary_confirm(kind)).await?;
        info!("{} 预览已确认", ctx);
        self.form.click(&selectors::id(selectors::FINAL_CONFIRM)).await
    }
}

/// 解析门户显示的合计，如 `S/ 1,234.50`
pub fn parse_portal_total(rendered: &str) -> Option<f64> {
    let trimmed = rendered.trim();
    let number = trimmed.strip_prefix("S/").unwrap_or(trimmed).trim().replace(',', "");
    number.parse::<f64>().ok().filter(|value| value.is_finite())
}
