//! 接口模型
//!
//! 接口记录描述一次探测的静态模板：方法、路径模板、参数结构和示例请求体。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// HTTP方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// 方法名（大写）
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(format!("无效的HTTP方法: {other}")),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// 参数的基础类型提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    /// 没有运行时取值时使用的占位值
    pub fn placeholder(&self) -> &'static str {
        match self {
            ParamType::Boolean => "true",
            ParamType::String | ParamType::Integer | ParamType::Number => "1",
        }
    }
}

/// 路径/查询参数结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// 参数名
    pub name: String,
    /// 是否必填
    #[serde(default)]
    pub required: bool,
    /// 类型提示
    #[serde(default, rename = "type")]
    pub param_type: ParamType,
}

impl ParamSpec {
    /// 创建参数结构
    pub fn new(name: impl Into<String>, required: bool, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            required,
            param_type,
        }
    }
}

/// 被探测的接口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// 接口ID
    pub id: String,
    /// 所属项目ID
    pub project_id: String,
    /// HTTP方法
    #[serde(default)]
    pub method: HttpMethod,
    /// 路径模板，可包含 `{name}` 占位符
    pub path: String,
    /// 路径参数结构
    #[serde(default)]
    pub path_params: Vec<ParamSpec>,
    /// 查询参数结构
    #[serde(default)]
    pub query_params: Vec<ParamSpec>,
    /// 静态请求头
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// 示例请求体
    pub sample_body: Option<String>,
    /// 期望的状态码
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Endpoint {
    /// 创建一个使用默认设置的接口
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            method,
            path: path.into(),
            path_params: Vec::new(),
            query_params: Vec::new(),
            headers: BTreeMap::new(),
            sample_body: None,
            expected_status: default_expected_status(),
            enabled: true,
        }
    }
}

fn default_expected_status() -> u16 {
    200
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_endpoint_defaults_from_toml() {
        let endpoint: Endpoint = toml::from_str(
            r#"
id = "e1"
project_id = "p1"
path = "/users/{id}"

[[path_params]]
name = "id"
required = true
type = "integer"
"#,
        )
        .unwrap();

        assert_eq!(endpoint.method, HttpMethod::Get);
        assert_eq!(endpoint.expected_status, 200);
        assert!(endpoint.enabled);
        assert_eq!(endpoint.path_params[0].param_type, ParamType::Integer);
    }
}
