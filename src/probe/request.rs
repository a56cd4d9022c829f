//! 请求构建器
//!
//! 根据接口的静态模板和可选的运行时覆盖值拼装一次尽力而为的合成请求。
//! 生成的请求不保证语义正确，只求能在不了解完整载荷的情况下探测接口。

use crate::model::{Endpoint, HttpMethod, ParamSpec, Project};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 查询参数缺省时使用的冒烟测试值
pub const SMOKE_QUERY_VALUE: &str = "test";

/// 运行时覆盖值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeOverrides {
    /// 路径参数
    #[serde(default)]
    pub path_params: BTreeMap<String, String>,
    /// 查询参数
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    /// 请求头
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// 请求体
    pub body: Option<String>,
}

/// 拼装完成的探测请求
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    /// HTTP方法
    pub method: HttpMethod,
    /// 完整URL
    pub url: String,
    /// 请求头，名称不区分大小写且不重复
    pub headers: Vec<(String, String)>,
    /// 请求体
    pub body: Option<String>,
}

impl ProbeRequest {
    /// 按名称查找请求头（不区分大小写）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// 构建完整的探测请求
///
/// 请求头优先级：运行时覆盖 > 静态请求头 > 默认 Content-Type，认证头最后注入且总是生效。
pub fn build_request(
    project: &Project,
    endpoint: &Endpoint,
    overrides: Option<&RuntimeOverrides>,
) -> ProbeRequest {
    let url = build_url(
        &project.base_url,
        &endpoint.path,
        &endpoint.path_params,
        &endpoint.query_params,
        overrides,
    );

    let body = overrides
        .and_then(|o| o.body.clone())
        .or_else(|| endpoint.sample_body.clone());

    let mut headers: Vec<(String, String)> = Vec::new();
    if let Some(overrides) = overrides {
        for (name, value) in &overrides.headers {
            set_header(&mut headers, name, value, false);
        }
    }
    for (name, value) in &endpoint.headers {
        set_header(&mut headers, name, value, false);
    }
    if body.is_some() {
        set_header(&mut headers, "Content-Type", "application/json", false);
    }
    if let Some((name, value)) = project.auth.header() {
        set_header(&mut headers, &name, &value, true);
    }

    ProbeRequest {
        method: endpoint.method,
        url,
        headers,
        body,
    }
}

/// 构建目标URL
pub fn build_url(
    base_url: &str,
    path: &str,
    path_params: &[ParamSpec],
    query_params: &[ParamSpec],
    overrides: Option<&RuntimeOverrides>,
) -> String {
    let mut url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );

    let runtime_path = overrides.map(|o| &o.path_params);
    for param in path_params {
        let value = runtime_path
            .and_then(|params| params.get(&param.name))
            .map(String::as_str)
            .unwrap_or_else(|| param.param_type.placeholder());
        url = url.replace(&format!("{{{}}}", param.name), &urlencoding::encode(value));
    }
    // 未在结构中声明的运行时路径参数同样替换
    if let Some(params) = runtime_path {
        for (name, value) in params {
            url = url.replace(&format!("{{{name}}}"), &urlencoding::encode(value));
        }
    }

    let query = build_query(query_params, overrides.map(|o| &o.query_params));
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }

    url
}

/// 构建查询字符串
///
/// 有运行时查询参数时只使用它们；否则为每个必填参数生成 `name=test`。
fn build_query(
    query_params: &[ParamSpec],
    runtime_query: Option<&BTreeMap<String, String>>,
) -> String {
    let parts: Vec<String> = match runtime_query.filter(|params| !params.is_empty()) {
        Some(params) => params
            .iter()
            .map(|(name, value)| {
                format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
            })
            .collect(),
        None => query_params
            .iter()
            .filter(|param| param.required)
            .map(|param| format!("{}={}", param.name, SMOKE_QUERY_VALUE))
            .collect(),
    };

    parts.join("&")
}

/// 设置请求头，`overwrite` 为 false 时保留已有值
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str, overwrite: bool) {
    match headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
    {
        Some(existing) if overwrite => {
            *existing = (name.to_string(), value.to_string());
        }
        Some(_) => {}
        None => headers.push((name.to_string(), value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthConfig, ParamType};

    fn project(auth: AuthConfig) -> Project {
        Project {
            id: "p1".to_string(),
            name: "Demo".to_string(),
            base_url: "https://api.example.com/".to_string(),
            auth,
            enabled: true,
        }
    }

    fn endpoint() -> Endpoint {
        let mut endpoint = Endpoint::new("e1", "p1", HttpMethod::Get, "/users/{id}/posts");
        endpoint.path_params = vec![ParamSpec::new("id", true, ParamType::Integer)];
        endpoint.query_params = vec![
            ParamSpec::new("page", true, ParamType::Integer),
            ParamSpec::new("sort", false, ParamType::String),
        ];
        endpoint
    }

    #[test]
    fn test_placeholder_defaults_and_smoke_query() {
        let e = endpoint();
        let url = build_url(
            "https://api.example.com/",
            &e.path,
            &e.path_params,
            &e.query_params,
            None,
        );
        assert_eq!(url, "https://api.example.com/users/1/posts?page=test");
    }

    #[test]
    fn test_runtime_overrides_replace_defaults() {
        let e = endpoint();
        let mut overrides = RuntimeOverrides::default();
        overrides.path_params.insert("id".to_string(), "42".to_string());
        overrides
            .query_params
            .insert("q".to_string(), "a b&c".to_string());

        let url = build_url(
            "https://api.example.com",
            &e.path,
            &e.path_params,
            &e.query_params,
            Some(&overrides),
        );
        assert_eq!(url, "https://api.example.com/users/42/posts?q=a%20b%26c");
    }

    #[test]
    fn test_undeclared_runtime_path_param_is_substituted() {
        let mut overrides = RuntimeOverrides::default();
        overrides
            .path_params
            .insert("slug".to_string(), "hello".to_string());

        let url = build_url("http://h", "/posts/{slug}", &[], &[], Some(&overrides));
        assert_eq!(url, "http://h/posts/hello");
    }

    #[test]
    fn test_path_values_are_percent_encoded() {
        let path_params = vec![ParamSpec::new("id", true, ParamType::String)];
        let mut overrides = RuntimeOverrides::default();
        overrides.path_params.insert("id".into(), "a/b?c d".into());

        let url = build_url(
            "https://api.example.com",
            "/items/{id}",
            &path_params,
            &[],
            Some(&overrides),
        );
        assert_eq!(url, "https://api.example.com/items/a%2Fb%3Fc%20d");
    }

    #[test]
    fn test_boolean_placeholder() {
        let params = vec![ParamSpec::new("flag", true, ParamType::Boolean)];
        let url = build_url("http://h", "/toggle/{flag}", &params, &[], None);
        assert_eq!(url, "http://h/toggle/true");
    }

    #[test]
    fn test_header_precedence_and_auth_last() {
        let mut e = endpoint();
        e.headers
            .insert("X-Trace".to_string(), "static".to_string());
        e.headers
            .insert("Accept".to_string(), "text/plain".to_string());
        e.headers
            .insert("Authorization".to_string(), "static-auth".to_string());

        let mut overrides = RuntimeOverrides::default();
        overrides
            .headers
            .insert("x-trace".to_string(), "runtime".to_string());
        overrides
            .headers
            .insert("authorization".to_string(), "runtime-auth".to_string());

        let request = build_request(&project(AuthConfig::bearer("tok")), &e, Some(&overrides));

        assert_eq!(request.header("X-Trace"), Some("runtime"));
        assert_eq!(request.header("accept"), Some("text/plain"));
        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
        assert_eq!(
            request
                .headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
                .count(),
            1
        );
    }

    #[test]
    fn test_body_precedence() {
        let mut e = endpoint();
        e.sample_body = Some(r#"{"sample":true}"#.to_string());

        let request = build_request(&project(AuthConfig::none()), &e, None);
        assert_eq!(request.body.as_deref(), Some(r#"{"sample":true}"#));
        assert_eq!(request.header("content-type"), Some("application/json"));

        let overrides = RuntimeOverrides {
            body: Some(r#"{"runtime":true}"#.to_string()),
            ..Default::default()
        };
        let request = build_request(&project(AuthConfig::none()), &e, Some(&overrides));
        assert_eq!(request.body.as_deref(), Some(r#"{"runtime":true}"#));

        e.sample_body = None;
        let request = build_request(&project(AuthConfig::none()), &e, None);
        assert!(request.body.is_none());
        assert!(request.header("content-type").is_none());
    }
}
