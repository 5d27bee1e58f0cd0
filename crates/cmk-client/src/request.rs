use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;

/// Ordered query parameters. A `Vec` rather than a map because CheckMK cares
/// about repetition (`columns`) and the tests care about ordering.
pub type Params = Vec<(String, Value)>;

/// One logical API request, built by a handler and consumed once.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub params: Params,
    pub body: Option<Value>,
    pub headers: HashMap<String, String>,
    /// When false the request goes to `{server_url}/cmk/{path}` instead of
    /// the detected API base URL. Only legacy view-style endpoints need this.
    pub use_api_prefix: bool,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Params::new(),
            body: None,
            headers: HashMap::new(),
            use_api_prefix: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn without_api_prefix(mut self) -> Self {
        self.use_api_prefix = false;
        self
    }
}

/// Expand parameters into wire pairs using CheckMK's encoding conventions:
/// a `columns` list becomes one `columns=value` pair per element, a `query`
/// object is JSON-serialized into a single pair, everything else is a
/// stringified singleton. Percent-encoding is left to the query serializer.
pub(crate) fn encode_query(params: &Params) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        match (key.as_str(), value) {
            ("columns", Value::Array(columns)) => {
                for column in columns {
                    pairs.push(("columns".to_string(), scalar(column)));
                }
            }
            ("query", query @ Value::Object(_)) => {
                pairs.push(("query".to_string(), query.to_string()));
            }
            (_, value) => pairs.push((key.clone(), scalar(value))),
        }
    }
    pairs
}

/// Plain string form of a scalar value, without the quotes JSON rendering
/// would add around strings.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
