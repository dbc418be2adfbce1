//! 开票请求
//!
//! 字段名沿用对外接口的西班牙语命名（`cliente`、`productos` 等）

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::models::document::DocumentKind;
use crate::models::motive;

/// 门户要求的日期格式
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// 客户信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientIdentity {
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    /// 身份证号（DNI）
    #[serde(rename = "dni", default)]
    pub national_id: Option<String>,
    /// 税号（RUC）
    #[serde(rename = "ruc", default)]
    pub tax_id: Option<String>,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// 客户信息在表单中的填写方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPath<'a> {
    /// 输入身份证号，等待门户回填姓名
    NationalId(&'a str),
    /// 输入税号，等待门户回填名称
    TaxId(&'a str),
    /// 无证件，直接输入姓名
    NameOnly(&'a str),
}

impl ClientIdentity {
    pub fn national_id(&self) -> Option<&str> {
        non_blank(&self.national_id)
    }

    pub fn tax_id(&self) -> Option<&str> {
        non_blank(&self.tax_id)
    }

    pub fn name(&self) -> Option<&str> {
        non_blank(&self.name)
    }

    /// 按单据类型选择填写方式；信息不足时返回 None
    pub fn path_for(&self, kind: DocumentKind) -> Option<ClientPath<'_>> {
        match kind {
            DocumentKind::Receipt => self
                .national_id()
                .map(ClientPath::NationalId)
                .or_else(|| self.name().map(ClientPath::NameOnly)),
            DocumentKind::Invoice => self.tax_id().map(ClientPath::TaxId),
            DocumentKind::CreditNote => None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// 商品明细
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "cantidad")]
    pub quantity: f64,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "unidad_medida")]
    pub unit_of_measure: String,
    #[serde(rename = "precio_base")]
    pub unit_price: f64,
    /// 税率百分比，0 表示免税
    #[serde(rename = "igv")]
    pub tax_rate: u8,
    #[serde(rename = "precio_total")]
    pub line_total: f64,
}

impl LineItem {
    pub fn is_tax_exempt(&self) -> bool {
        self.tax_rate == 0
    }

    /// 单价保留 4 位小数
    pub fn formatted_unit_price(&self) -> String {
        format!("{:.4}", self.unit_price)
    }

    pub fn formatted_quantity(&self) -> String {
        format!("{}", self.quantity)
    }
}

/// 汇总信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "serie")]
    pub series: String,
    #[serde(rename = "numero")]
    pub number: String,
    pub sub_total: f64,
    #[serde(rename = "igv_total")]
    pub tax_total: f64,
    pub total: f64,
}

/// 门户登录凭据
///
/// 只原样传给门户，Debug 输出与序列化都不会包含密码
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// 纳税人号（RUC）
    #[serde(rename = "ruc")]
    pub taxpayer_id: String,
    #[serde(rename = "usuario")]
    pub username: String,
    #[serde(rename = "password", skip_serializing)]
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("taxpayer_id", &self.taxpayer_id)
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}

/// 小票 / 发票开具请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionRequest {
    #[serde(rename = "tipo_documento")]
    pub kind: DocumentKind,
    #[serde(rename = "cliente")]
    pub client: ClientIdentity,
    #[serde(rename = "productos")]
    pub line_items: Vec<LineItem>,
    #[serde(rename = "resumen")]
    pub summary: Summary,
    /// 开具日期 dd/mm/yyyy
    #[serde(rename = "fecha")]
    pub emission_date: String,
    #[serde(rename = "id_remitente")]
    pub sender_id: String,
    #[serde(rename = "credenciales")]
    pub credentials: Credentials,
}

impl EmissionRequest {
    /// 提交时的结构检查，不访问门户
    pub fn check_shape(&self) -> Result<(), RequestError> {
        if self.kind == DocumentKind::CreditNote {
            return Err(RequestError::UnsupportedKind(self.kind));
        }
        if self.line_items.is_empty() {
            return Err(RequestError::NoLineItems);
        }
        for (index, item) in self.line_items.iter().enumerate() {
            let position = index + 1;
            if !(item.quantity > 0.0) {
                return Err(RequestError::invalid_item(position, "cantidad debe ser mayor que 0"));
            }
            if !(item.unit_price >= 0.0) {
                return Err(RequestError::invalid_item(position, "precio_base no puede ser negativo"));
            }
            if item.tax_rate > 100 {
                return Err(RequestError::invalid_item(position, "igv debe estar entre 0 y 100"));
            }
            if !(item.line_total >= 0.0) {
                return Err(RequestError::invalid_item(position, "precio_total no puede ser negativo"));
            }
        }
        let summary = &self.summary;
        if !(summary.sub_total >= 0.0 && summary.tax_total >= 0.0 && summary.total >= 0.0) {
            return Err(RequestError::NegativeSummary);
        }
        check_date(&self.emission_date)
    }

    /// 明细合计
    pub fn computed_total(&self) -> f64 {
        self.line_items.iter().map(|item| item.line_total).sum()
    }
}

/// 贷记单开具请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditNoteRequest {
    #[serde(rename = "fecha_emision")]
    pub emission_date: String,
    /// 原因代码 01..05
    #[serde(rename = "tipo_nota", default = "default_motive_code")]
    pub motive_code: String,
    /// 被冲销的小票编号，如 `EB01-448`
    #[serde(rename = "numero_boleta")]
    pub referenced_document: String,
    #[serde(rename = "sustento")]
    pub sustaining_text: String,
    #[serde(rename = "credenciales")]
    pub credentials: Credentials,
}

fn default_motive_code() -> String {
    motive::DEFAULT_MOTIVE_CODE.to_string()
}

impl CreditNoteRequest {
    /// 单号是否带有 `EB01-` 这样的系列前缀
    pub fn reference_has_series(&self) -> bool {
        self.referenced_document.contains('-')
    }

    pub fn check_shape(&self) -> Result<(), RequestError> {
        if !motive::is_known_code(&self.motive_code) {
            return Err(RequestError::UnknownMotive(self.motive_code.clone()));
        }
        if self.referenced_document.trim().is_empty() {
            return Err(RequestError::MissingReference);
        }
        check_date(&self.emission_date)
    }
}

fn check_date(value: &str) -> Result<(), RequestError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| RequestError::InvalidDate(value.to_string()))
}

/// 任务持有的不可变请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmissionPayload {
    Document(EmissionRequest),
    CreditNote(CreditNoteRequest),
}

impl EmissionPayload {
    pub fn kind(&self) -> DocumentKind {
        match self {
            EmissionPayload::Document(request) => request.kind,
            EmissionPayload::CreditNote(_) => DocumentKind::CreditNote,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        match self {
            EmissionPayload::Document(request) => &request.credentials,
            EmissionPayload::CreditNote(request) => &request.credentials,
        }
    }

    pub fn check_shape(&self) -> Result<(), RequestError> {
        match self {
            EmissionPayload::Document(request) => request.check_shape(),
            EmissionPayload::CreditNote(request) => request.check_shape(),
        }
    }
}
