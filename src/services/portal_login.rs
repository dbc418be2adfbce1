//! 门户登录 - 业务能力层

use tracing::debug;

use crate::error::SurfaceError;
use crate::models::Credentials;
use crate::services::form_driver::FormDriver;
use crate::services::selectors::{self, login};

/// 登录服务
///
/// 凭据只传给门户，不写入日志
pub struct PortalLogin {
    portal_url: String,
}

impl PortalLogin {
    pub fn new(portal_url: impl Into<String>) -> Self {
        Self {
            portal_url: portal_url.into(),
        }
    }

    pub async fn login(&self, form: &FormDriver<'_>, credentials: &Credentials) -> Result<(), SurfaceError> {
        let surface = form.surface();
        surface.navigate(&self.portal_url).await?;

        let taxpayer_field = selectors::id(login::TAXPAYER_ID);
        form.present(&taxpayer_field).await?;

        surface.type_text(&taxpayer_field, &credentials.taxpayer_id).await?;
        surface
            .type_text(&selectors::id(login::USERNAME), &credentials.username)
            .await?;
        surface
            .type_text(&selectors::id(login::SECRET), &credentials.secret)
            .await?;
        surface.click(&selectors::id(login::SUBMIT)).await?;

        debug!("登录表单已提交");
        Ok(())
    }
}
