//! 项目模型
//!
//! 项目拥有基础URL和认证配置，认证信息在每次探测时注入请求头。

use serde::{Deserialize, Serialize};

/// 默认的 API Key 请求头名称
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// 认证类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// 无认证
    #[default]
    None,
    /// Bearer Token
    Bearer,
    /// API Key（请求头名称可配置）
    ApiKey,
    /// Basic 认证（凭据原样注入）
    Basic,
}

/// 项目认证配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 认证类型
    #[serde(default, rename = "type")]
    pub auth_type: AuthType,
    /// 凭据值
    pub value: Option<String>,
    /// 请求头名称（仅 API Key 使用）
    pub header_name: Option<String>,
}

impl AuthConfig {
    /// 无认证配置
    pub fn none() -> Self {
        Self::default()
    }

    /// Bearer Token 配置
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Bearer,
            value: Some(token.into()),
            header_name: None,
        }
    }

    /// API Key 配置
    pub fn api_key(key: impl Into<String>, header_name: Option<String>) -> Self {
        Self {
            auth_type: AuthType::ApiKey,
            value: Some(key.into()),
            header_name,
        }
    }

    /// Basic 认证配置
    pub fn basic(credential: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Basic,
            value: Some(credential.into()),
            header_name: None,
        }
    }

    /// 计算需要注入的认证请求头
    ///
    /// 凭据为空时不注入任何请求头。
    pub fn header(&self) -> Option<(String, String)> {
        let value = self.value.as_deref()?;
        match self.auth_type {
            AuthType::None => None,
            AuthType::Bearer => Some(("Authorization".to_string(), format!("Bearer {value}"))),
            AuthType::ApiKey => Some((
                self.header_name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
                value.to_string(),
            )),
            AuthType::Basic => Some(("Authorization".to_string(), format!("Basic {value}"))),
        }
    }
}

/// 被监控的项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// 项目ID
    pub id: String,
    /// 项目名称
    pub name: String,
    /// 基础URL
    pub base_url: String,
    /// 认证配置
    #[serde(default)]
    pub auth: AuthConfig,
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let auth = AuthConfig::bearer("abc");
        assert_eq!(
            auth.header(),
            Some(("Authorization".to_string(), "Bearer abc".to_string()))
        );
    }

    #[test]
    fn test_api_key_default_header_name() {
        let auth = AuthConfig::api_key("k-1", None);
        assert_eq!(
            auth.header(),
            Some(("X-API-Key".to_string(), "k-1".to_string()))
        );

        let custom = AuthConfig::api_key("k-2", Some("X-Token".to_string()));
        assert_eq!(
            custom.header(),
            Some(("X-Token".to_string(), "k-2".to_string()))
        );
    }

    #[test]
    fn test_basic_is_not_reencoded() {
        let auth = AuthConfig::basic("dXNlcjpwYXNz");
        assert_eq!(auth.header().unwrap().1, "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_missing_value_injects_nothing() {
        let auth = AuthConfig {
            auth_type: AuthType::Bearer,
            value: None,
            header_name: None,
        };
        assert!(auth.header().is_none());
        assert!(AuthConfig::none().header().is_none());
    }
}
