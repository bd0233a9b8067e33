//! Data flowing between the pipeline stages

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

/// A crawl request: an HTTP request plus its crawl depth
#[derive(Debug)]
pub struct Request {
    http_req: reqwest::Request,
    depth: u32,
}

impl Request {
    pub fn new(http_req: reqwest::Request, depth: u32) -> Self {
        Self { http_req, depth }
    }

    /// Creates a GET request for `url`
    pub fn get(url: Url, depth: u32) -> Self {
        Self::new(reqwest::Request::new(Method::GET, url), depth)
    }

    pub fn http_req(&self) -> &reqwest::Request {
        &self.http_req
    }

    pub fn into_http_req(self) -> reqwest::Request {
        self.http_req
    }

    pub fn url(&self) -> &Url {
        self.http_req.url()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    /// A request is only usable if its URL names a host
    pub fn valid(&self) -> bool {
        self.url().host_str().is_some_and(|host| !host.is_empty())
    }
}

/// The parts of an HTTP response the crawl keeps
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Body bytes, `None` if the body could not be read
    pub body: Option<Vec<u8>>,
}

impl HttpResponse {
    /// Returns the `Content-Type` header, if present and readable
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// A downloaded response plus the depth of the request that produced it
#[derive(Debug, Clone)]
pub struct Response {
    http_resp: HttpResponse,
    depth: u32,
}

impl Response {
    pub fn new(http_resp: HttpResponse, depth: u32) -> Self {
        Self { http_resp, depth }
    }

    pub fn http_resp(&self) -> &HttpResponse {
        &self.http_resp
    }

    pub fn url(&self) -> &Url {
        &self.http_resp.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// A response is only usable if its body was read
    pub fn valid(&self) -> bool {
        self.http_resp.body.is_some()
    }
}

/// A value stored in an [`Item`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    List(Vec<ItemValue>),
}

impl ItemValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ItemValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ItemValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ItemValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<String> for ItemValue {
    fn from(s: String) -> Self {
        ItemValue::Text(s)
    }
}

impl From<&str> for ItemValue {
    fn from(s: &str) -> Self {
        ItemValue::Text(s.to_string())
    }
}

impl From<i64> for ItemValue {
    fn from(n: i64) -> Self {
        ItemValue::Integer(n)
    }
}

impl From<f64> for ItemValue {
    fn from(n: f64) -> Self {
        ItemValue::Float(n)
    }
}

impl From<bool> for ItemValue {
    fn from(b: bool) -> Self {
        ItemValue::Bool(b)
    }
}

impl From<Vec<u8>> for ItemValue {
    fn from(bytes: Vec<u8>) -> Self {
        ItemValue::Bytes(bytes)
    }
}

/// Open key/value record produced by analyzers and consumed by pipelines
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item(BTreeMap<String, ItemValue>);

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ItemValue>) -> Option<ItemValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&ItemValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ItemValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ItemValue>> FromIterator<(K, V)> for Item {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Output of an analyzer: either a follow-up request or an item
#[derive(Debug)]
pub enum Data {
    Request(Request),
    Item(Item),
}

impl Data {
    pub fn valid(&self) -> bool {
        match self {
            Data::Request(req) => req.valid(),
            Data::Item(_) => true,
        }
    }
}

impl From<Request> for Data {
    fn from(req: Request) -> Self {
        Data::Request(req)
    }
}

impl From<Item> for Data {
    fn from(item: Item) -> Self {
        Data::Item(item)
    }
}
