//! 单据类型与 PDF 文件名约定

use serde::{Deserialize, Serialize};

/// 单据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// 销售小票（Boleta）
    #[serde(rename = "BOLETA")]
    Receipt,
    /// 发票（Factura）
    #[serde(rename = "FACTURA")]
    Invoice,
    /// 贷记单（Nota de Crédito）
    #[serde(rename = "NOTA_CREDITO")]
    CreditNote,
}

impl DocumentKind {
    /// 门户使用的类型代码，同时用于文件名
    pub fn code(self) -> &'static str {
        match self {
            DocumentKind::Receipt => "BOLETA",
            DocumentKind::Invoice => "FACTURA",
            DocumentKind::CreditNote => "NOTA_CREDITO",
        }
    }

    /// 菜单搜索框中输入的关键字
    ///
    /// 贷记单挂在小票菜单下面
    pub fn search_term(self) -> &'static str {
        match self {
            DocumentKind::Receipt | DocumentKind::CreditNote => "BOLETA",
            DocumentKind::Invoice => "FACTURA",
        }
    }

    /// 表单字段 id 的前缀
    pub fn form_prefix(self) -> &'static str {
        match self {
            DocumentKind::Receipt => "boleta",
            DocumentKind::Invoice => "factura",
            DocumentKind::CreditNote => "notaCredito",
        }
    }

    /// 生成的 PDF 文件名前缀
    pub fn pdf_prefix(self) -> String {
        format!("PDF-{}EB01-", self.code())
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 生成的 PDF 文件名：`PDF-{KIND}EB01-{单号}{纳税人号}.pdf`
pub fn artifact_filename(kind: DocumentKind, document_number: &str, taxpayer_id: &str) -> String {
    format!("{}{}{}.pdf", kind.pdf_prefix(), document_number, taxpayer_id)
}
