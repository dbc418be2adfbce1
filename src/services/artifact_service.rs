//! 单据文件取回 - 业务能力层
//!
//! 读取门户分配的单号，点击下载并从下载目录读回 PDF

use tracing::{debug, info};

use crate::error::SurfaceError;
use crate::infrastructure::Condition;
use crate::models::{artifact_filename, DocumentArtifact, DocumentKind};
use crate::services::form_driver::FormDriver;
use crate::services::selectors;

pub struct ArtifactService;

impl ArtifactService {
    pub fn new() -> Self {
        Self
    }

    /// 读取结果页上的单号
    pub async fn read_document_number(&self, form: &FormDriver<'_>) -> Result<String, SurfaceError> {
        let field = selectors::id(selectors::DOCUMENT_NUMBER);
        form.surface()
            .wait_for(&field, Condition::Present, form.timeouts().lookup())
            .await?;
        let number = form.surface().read_text(&field).await?.trim().to_string();
        if number.is_empty() {
            return Err(SurfaceError::ElementNotFound(format!("{} (空)", field)));
        }
        debug!("门户单号: {}", number);
        Ok(number)
    }

    /// 下载并读回 PDF
    pub async fn download(
        &self,
        form: &FormDriver<'_>,
        kind: DocumentKind,
        document_number: &str,
        taxpayer_id: &str,
    ) -> Result<DocumentArtifact, SurfaceError> {
        let button = selectors::download_button(kind);
        form.surface()
            .wait_for(&button, Condition::Clickable, form.timeouts().lookup())
            .await?;
        form.surface().trigger_download(&button).await?;
        form.settle(form.timeouts().download_settle()).await;

        let filename = artifact_filename(kind, document_number, taxpayer_id);
        let content = form.surface().fetch_artifact_bytes(&filename).await?;
        info!("📄 PDF 已取回: {} ({} bytes)", filename, content.len());

        Ok(DocumentArtifact::pdf(filename, content, document_number.to_string()))
    }
}

impl Default for ArtifactService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WaitTimeouts;
    use crate::infrastructure::{Script, ScriptedSurface};

    #[tokio::test]
    async fn test_download_uses_filename_convention() {
        let script = Script::new()
            .with_text(selectors::id(selectors::DOCUMENT_NUMBER), " 449 ")
            .with_artifact("PDF-BOLETAEB01-44910000000000.pdf", b"%PDF-1.4".to_vec());
        let surface = ScriptedSurface::new(script.clone());
        let timeouts = WaitTimeouts::immediate();
        let form = FormDriver::new(&surface, &timeouts);
        let service = ArtifactService::new();

        let number = service.read_document_number(&form).await.unwrap();
        assert_eq!(number, "449");

        let artifact = service
            .download(&form, DocumentKind::Receipt, &number, "10000000000")
            .await
            .unwrap();
        assert_eq!(artifact.filename, "PDF-BOLETAEB01-44910000000000.pdf");
        assert_eq!(artifact.size, 8);
        assert!(script.clicked(&selectors::id("dijit_form_Button_2_label")));
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let surface = ScriptedSurface::new(Script::new());
        let timeouts = WaitTimeouts::immediate();
        let form = FormDriver::new(&surface, &timeouts);

        let err = ArtifactService::new()
            .download(&form, DocumentKind::CreditNote, "7", "1")
            .await
            .unwrap_err();
        assert!(matches!(err, SurfaceError::ArtifactNotFound(name) if name == "PDF-NOTA_CREDITOEB01-71.pdf"));
    }

    #[tokio::test]
    async fn test_blank_document_number_is_an_error() {
        let surface = ScriptedSurface::new(Script::new());
        let timeouts = WaitTimeouts::immediate();
        let form = FormDriver::new(&surface, &timeouts);
        assert!(ArtifactService::new().read_document_number(&form).await.is_err());
    }
}
