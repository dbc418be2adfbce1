//! 门户页面元素
//!
//! 门户的元素 id 会随版本变化，集中放在这里

use crate::infrastructure::Locator;
use crate::models::DocumentKind;

pub const FRAME: &str = "iframeApplication";
pub const SEARCH_FIELD: &str = "txtBusca";
pub const LOADING_OVERLAY: &str = "waitMessage_underlay";
pub const FINAL_CONFIRM: &str = "dlgBtnAceptarConfirm_label";
pub const DOCUMENT_NUMBER: &str = "numeroComprobante";

/// 登录页
pub mod login {
    pub const TAXPAYER_ID: &str = "txtRuc";
    pub const USERNAME: &str = "txtUsuario";
    pub const SECRET: &str = "txtContrasena";
    pub const SUBMIT: &str = "btnAceptar";
}

/// 客户信息页（小票 / 发票共用）
pub mod client {
    pub const DOCUMENT_TYPE: &str = "inicio.tipoDocumento";
    pub const DOCUMENT_NUMBER: &str = "inicio.numeroDocumento";
    pub const NAME: &str = "inicio.razonSocial";
    pub const CONTINUE: &str = "inicio.botonGrabarDocumento_label";

    pub const NATIONAL_ID_TYPE: &str = "DOC. NACIONAL DE IDENTIDAD";
    pub const NO_DOCUMENT_TYPE: &str = "SIN DOCUMENTO";
}

/// 商品对话框
pub mod item {
    pub const SUB_TYPE: &str = "//input[@id='item.subTipoTI01']";
    pub const QUANTITY: &str = "//input[@name='cantidad']";
    pub const UNIT: &str = "item.unidadMedida";
    pub const DESCRIPTION: &str = "item.descripcion";
    pub const UNIT_PRICE: &str = "item.precioUnitario";
    pub const TAX_EXEMPT: &str = "item.subTipoTB01";
    pub const ACCEPT: &str = "item.botonAceptar_label";
}

/// 贷记单初始页
pub mod credit_note {
    pub const MENU_ENTRY: &str = r#"//*[@id="nivel4_11_5_4_1_2"]/span"#;
    pub const DATE: &str = "pantallaInicial.fechaEmision";
    pub const MOTIVE: &str = "pantallaInicial.tipoNotaCredito";
    pub const REFERENCE: &str = "pantallaInicial.numeroBVE";
    pub const SUSTAINING_TEXT: &str = "pantallaInicial.motivoEmisionNC";
    pub const CONTINUE: &str = "pantallaInicial.btnContinuar_label";
}

/// 关联文档确认（通常不出现）
pub const RELATED_DOCUMENTS: &str = "//span[@id='docsrel.botonGrabarDocumento']/span[1]";

pub fn id(value: &str) -> Locator {
    Locator::id(value)
}

pub fn xpath(value: &str) -> Locator {
    Locator::xpath(value)
}

/// 菜单中"开具"入口
pub fn menu_entry(kind: DocumentKind) -> Locator {
    match kind {
        DocumentKind::Receipt => xpath("//span[contains(text(), 'Emitir Boleta de Venta')]"),
        DocumentKind::Invoice => xpath("//span[contains(text(), 'Emitir Factura')]"),
        DocumentKind::CreditNote => xpath(credit_note::MENU_ENTRY),
    }
}

pub fn emission_date(kind: DocumentKind) -> Locator {
    id(&format!("{}.fechaEmision", kind.form_prefix()))
}

pub fn add_item_button(kind: DocumentKind) -> Locator {
    match kind {
        DocumentKind::Invoice => id("factura.addItemButton_label"),
        _ => id(&format!("{}.addItemButton", kind.form_prefix())),
    }
}

pub fn total_field(kind: DocumentKind) -> Locator {
    id(&format!("{}.totalGeneral", kind.form_prefix()))
}

pub fn save_button(kind: DocumentKind) -> Locator {
    id(&format!("{}.botonGrabarDocumento_label", kind.form_prefix()))
}

pub fn preliminary_confirm(kind: DocumentKind) -> Locator {
    id(&format!("{}-preliminar.botonGrabarDocumento_label", kind.form_prefix()))
}

/// 结果页的 PDF 下载按钮
pub fn download_button(kind: DocumentKind) -> Locator {
    match kind {
        DocumentKind::CreditNote => id("dijit_form_Button_3_label"),
        _ => id("dijit_form_Button_2_label"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_ids_follow_kind_prefix() {
        assert_eq!(emission_date(DocumentKind::Receipt), Locator::id("boleta.fechaEmision"));
        assert_eq!(total_field(DocumentKind::Invoice), Locator::id("factura.totalGeneral"));
        assert_eq!(
            preliminary_confirm(DocumentKind::CreditNote),
            Locator::id("notaCredito-preliminar.botonGrabarDocumento_label")
        );
    }

    #[test]
    fn test_add_item_button_differs_per_kind() {
        assert_eq!(add_item_button(DocumentKind::Receipt), Locator::id("boleta.addItemButton"));
        assert_eq!(add_item_button(DocumentKind::Invoice), Locator::id("factura.addItemButton_label"));
    }
}
