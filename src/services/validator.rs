//! 开票预检 - 业务能力层
//!
//! 纯函数，不访问门户；既可单独调用，也是执行器的第一步

use serde::Serialize;

use crate::models::{ClientIdentity, CreditNoteRequest, DocumentKind, EmissionRequest};

/// 默认金额容差
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// 预检结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// 预检服务
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    tolerance: f64,
}

impl Validator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// 两个金额是否在容差内
    pub fn within_tolerance(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.tolerance
    }

    /// 小票 / 发票预检
    pub fn validate(&self, request: &EmissionRequest) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for item in &request.line_items {
            if item.is_tax_exempt() {
                warnings.push(format!("El producto '{}' no tiene IGV", item.description));
            }
        }

        let computed = request.computed_total();
        if !self.within_tolerance(computed, request.summary.total) {
            errors.push(format!(
                "Total no coincide: calculado {} vs declarado {}",
                computed, request.summary.total
            ));
        }

        if let Some(message) = client_requirement(request.kind, &request.client) {
            errors.push(message.to_string());
        }

        ValidationReport::from_findings(errors, warnings)
    }

    /// 贷记单预检
    pub fn validate_credit_note(&self, request: &CreditNoteRequest) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if request.sustaining_text.trim().is_empty() {
            errors.push("Nota de crédito requiere sustento".to_string());
        }
        if !request.reference_has_series() {
            warnings.push(format!(
                "Número de boleta sin serie: {}, se enviará sin cambios",
                request.referenced_document
            ));
        }

        ValidationReport::from_findings(errors, warnings)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

fn client_requirement(kind: DocumentKind, client: &ClientIdentity) -> Option<&'static str> {
    if client.path_for(kind).is_some() {
        return None;
    }
    match kind {
        DocumentKind::Receipt => Some("Boleta requiere DNI o nombre del cliente"),
        DocumentKind::Invoice => Some("Factura requiere RUC del cliente"),
        DocumentKind::CreditNote => None,
    }
}
