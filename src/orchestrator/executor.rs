//! 单个开票任务执行器 - 编排层
//!
//! ## 职责
//!
//! 1. **预检**：在打开浏览器之前运行预检，错误直接失败
//! 2. **会话管理**：打开独占会话，任何退出路径都会释放
//! 3. **登录**：使用请求中的凭据登录门户
//! 4. **流程调度**：按单据类型委托给 DocumentFlow / CreditNoteFlow
//! 5. **文件取回**：失败只记为警告，不影响任务结果
//! 6. **结果转换**：所有错误在这里转换为失败结果，不再向上抛出

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{Config, WaitTimeouts};
use crate::error::EmissionError;
use crate::infrastructure::{AutomationSurface, SessionGuard, SessionOptions, SurfaceFactory};
use crate::models::{
    BusinessOutcome, DocumentArtifact, DocumentKind, EmissionFailure, EmissionOutcome, EmissionPayload,
    EmissionSuccess,
};
use crate::models::motive::motive_text;
use crate::services::{ArtifactService, FormDriver, PortalLogin, Validator};
use crate::workflow::{CreditNoteFlow, DocumentFlow, FlowCtx};

/// 开票执行器
///
/// 在任务之间共享，本身不持有会话
pub struct EmissionExecutor {
    factory: Arc<dyn SurfaceFactory>,
    session_options: SessionOptions,
    login: PortalLogin,
    artifacts: ArtifactService,
    validator: Validator,
    timeouts: WaitTimeouts,
}

impl EmissionExecutor {
    pub fn new(factory: Arc<dyn SurfaceFactory>, config: &Config) -> Self {
        Self {
            factory,
            session_options: SessionOptions {
                headless: config.headless,
                download_dir: config.download_dir.clone(),
            },
            login: PortalLogin::new(config.portal_url.clone()),
            artifacts: ArtifactService::new(),
            validator: Validator::new(config.total_tolerance),
            timeouts: config.timeouts,
        }
    }

    pub fn validator(&self) -> Validator {
        self.validator
    }

    /// 执行一次开票，总是返回结果
    pub async fn run(&self, payload: &EmissionPayload, ctx: &FlowCtx) -> EmissionOutcome {
        match self.execute(payload, ctx).await {
            Ok(success) => {
                info!("{} ✅ {}", ctx, success.message);
                EmissionOutcome::Success(success)
            }
            Err(e) => {
                error!("{} ❌ 开票失败: {}", ctx, e);
                EmissionOutcome::Failure(EmissionFailure::new(e.category(), e.to_string()))
            }
        }
    }

    async fn execute(&self, payload: &EmissionPayload, ctx: &FlowCtx) -> Result<EmissionSuccess, EmissionError> {
        let warnings = self.preflight(payload, ctx)?;

        let session = SessionGuard::open(self.factory.as_ref(), &self.session_options)
            .await
            .map_err(EmissionError::Session)?;

        let result = self.drive(session.surface(), payload, ctx, warnings).await;

        session.release().await;
        result
    }

    /// 预检：错误直接失败，警告带入结果
    fn preflight(&self, payload: &EmissionPayload, ctx: &FlowCtx) -> Result<Vec<String>, EmissionError> {
        let report = match payload {
            EmissionPayload::Document(request) => {
                if request.kind == DocumentKind::CreditNote {
                    return Err(EmissionError::UnsupportedKind(request.kind));
                }
                self.validator.validate(request)
            }
            EmissionPayload::CreditNote(request) => self.validator.validate_credit_note(request),
        };

        for warning in &report.warnings {
            warn!("{} ⚠️ {}", ctx, warning);
        }
        if !report.valid {
            return Err(EmissionError::Validation(report.errors));
        }
        Ok(report.warnings)
    }

    async fn drive(
        &self,
        surface: &dyn AutomationSurface,
        payload: &EmissionPayload,
        ctx: &FlowCtx,
        mut warnings: Vec<String>,
    ) -> Result<EmissionSuccess, EmissionError> {
        let form = FormDriver::new(surface, &self.timeouts);
        let credentials = payload.credentials();

        info!("{} 🔐 正在登录门户...", ctx);
        self.login
            .login(&form, credentials)
            .await
            .map_err(EmissionError::Authentication)?;

        let details = match payload {
            EmissionPayload::Document(request) => {
                DocumentFlow::new(form, self.validator).run(request, ctx).await?;
                BusinessOutcome::Sale {
                    series: request.summary.series.clone(),
                    number: request.summary.number.clone(),
                    total: request.summary.total,
                }
            }
            EmissionPayload::CreditNote(request) => {
                let report = CreditNoteFlow::new(form).run(request, ctx).await?;
                // 无系列前缀时预检已给出同样的提示
                if request.reference_has_series() {
                    warnings.extend(report.warnings);
                }
                BusinessOutcome::CreditNote {
                    referenced_document: request.referenced_document.clone(),
                    emission_date: request.emission_date.clone(),
                    motive_code: request.motive_code.clone(),
                    motive: motive_text(&request.motive_code).to_string(),
                }
            }
        };

        let kind = payload.kind();
        let (document_number, artifact) = self
            .retrieve_artifact(&form, kind, &credentials.taxpayer_id, ctx, &mut warnings)
            .await;

        Ok(EmissionSuccess {
            message: success_message(kind),
            kind,
            document_number,
            details,
            artifact,
            warnings,
        })
    }

    /// 取回单号与 PDF；任何失败都降级为警告
    async fn retrieve_artifact(
        &self,
        form: &FormDriver<'_>,
        kind: DocumentKind,
        taxpayer_id: &str,
        ctx: &FlowCtx,
        warnings: &mut Vec<String>,
    ) -> (Option<String>, Option<DocumentArtifact>) {
        let document_number = match self.artifacts.read_document_number(form).await {
            Ok(number) => number,
            Err(e) => {
                let e = EmissionError::ArtifactRetrieval(e);
                warn!("{} ⚠️ {}", ctx, e);
                warnings.push(e.to_string());
                return (None, None);
            }
        };
        info!("{} 🧾 门户单号: {}", ctx, document_number);

        match self.artifacts.download(form, kind, &document_number, taxpayer_id).await {
            Ok(artifact) => (Some(document_number), Some(artifact)),
            Err(e) => {
                let e = EmissionError::ArtifactRetrieval(e);
                warn!("{} ⚠️ PDF 不可用: {}", ctx, e);
                warnings.push(e.to_string());
                (Some(document_number), None)
            }
        }
    }
}

fn success_message(kind: DocumentKind) -> String {
    match kind {
        DocumentKind::CreditNote => "Nota de crédito emitida correctamente".to_string(),
        other => format!("{} emitida correctamente", other),
    }
}
