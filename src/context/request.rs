use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;

use http::header::ACCEPT_LANGUAGE;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;
use http::Method;
use serde_json::Value;
use tracing::warn;

use crate::utils::normalize_path;

/// Authenticated caller, as resolved by the HTTP front-end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub roles: HashSet<String>,
}

impl Principal {
    pub fn new<I, S>(
        name: impl Into<String>,
        roles: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// An incoming HTTP request as seen by the dispatcher
///
/// `path` is relative to the application's `context_path` and always starts
/// with `/`. Parameters merge the query string and url-encoded form body.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    context_path: String,
    params: BTreeMap<String, Vec<String>>,
    headers: HeaderMap,
    attributes: HashMap<String, Value>,
    principal: Option<Principal>,
    session_id: Option<String>,
}

impl Request {
    pub fn new(
        method: Method,
        path: impl AsRef<str>,
    ) -> Self {
        Self {
            method,
            path: normalize_path(path.as_ref()),
            context_path: String::new(),
            params: BTreeMap::new(),
            headers: HeaderMap::new(),
            attributes: HashMap::new(),
            principal: None,
            session_id: None,
        }
    }

    pub fn get(path: impl AsRef<str>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl AsRef<str>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.add_param(name, value);
        self
    }

    /// Adds every pair of a url-encoded string (`a=1&b=2`)
    pub fn with_query(
        mut self,
        query: &str,
    ) -> Self {
        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => {
                for (name, value) in pairs {
                    self.add_param(name, value);
                }
            }
            Err(e) => warn!(query, "ignoring malformed query string: {}", e),
        }
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    pub fn with_header(
        mut self,
        name: &str,
        value: &str,
    ) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.append(n, v);
            }
            _ => warn!(name, "ignoring invalid request header"),
        }
        self
    }

    pub fn with_headers(
        mut self,
        headers: HeaderMap,
    ) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_context_path(
        mut self,
        context_path: impl Into<String>,
    ) -> Self {
        self.context_path = context_path.into();
        self
    }

    pub fn with_principal(
        mut self,
        principal: Principal,
    ) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_session_id(
        mut self,
        session_id: impl Into<String>,
    ) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn add_param(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.params.entry(name.into()).or_default().push(value.into());
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn set_path(
        &mut self,
        path: &str,
    ) {
        self.path = normalize_path(path);
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Context path followed by the request path
    pub fn request_uri(&self) -> String {
        format!("{}{}", self.context_path, self.path)
    }

    /// First value of the named parameter
    pub fn parameter(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.params.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn parameter_values(
        &self,
        name: &str,
    ) -> &[String] {
        self.params.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_parameter(
        &self,
        name: &str,
    ) -> bool {
        self.params.contains_key(name)
    }

    /// Parameters, sorted by name
    pub fn parameters(&self) -> &BTreeMap<String, Vec<String>> {
        &self.params
    }

    pub fn header(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn attribute(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.attributes.insert(name.into(), value);
    }

    pub fn remove_attribute(
        &mut self,
        name: &str,
    ) -> Option<Value> {
        self.attributes.remove(name)
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn remote_user(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.name.as_str())
    }

    pub fn is_user_in_role(
        &self,
        role: &str,
    ) -> bool {
        self.principal.as_ref().is_some_and(|p| p.roles.contains(role))
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub(crate) fn set_session_id(
        &mut self,
        session_id: String,
    ) {
        self.session_id = Some(session_id);
    }

    /// `charset` parameter of the Content-Type header
    pub fn character_encoding(&self) -> Option<&str> {
        let content_type = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        content_type.split(';').skip(1).find_map(|part| {
            let (key, value) = part.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim().trim_matches('"'))
            } else {
                None
            }
        })
    }

    /// Language tags of the Accept-Language header, by descending quality
    pub fn accept_languages(&self) -> Vec<String> {
        let Some(header) = self.headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()) else {
            return Vec::new();
        };
        let mut tags: Vec<(String, f32)> = header
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';');
                let tag = parts.next()?.trim();
                if tag.is_empty() || tag == "*" {
                    return None;
                }
                let quality = parts
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((tag.to_string(), quality))
            })
            .collect();
        tags.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        tags.into_iter().map(|(tag, _)| tag).collect()
    }
}
