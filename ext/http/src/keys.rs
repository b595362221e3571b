//! Context keys shared by every HTTP module.

use crate::{Handler, HandlerError, Headers};
use chainer::MetaDataKey;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

/// Uppercased request method.
pub static REQUEST_METHOD: LazyLock<MetaDataKey<String>> =
    LazyLock::new(|| MetaDataKey::new("request.method"));

/// Request path, without the query string.
pub static REQUEST_PATH: LazyLock<MetaDataKey<String>> =
    LazyLock::new(|| MetaDataKey::new("request.path"));

pub static REQUEST_HEADERS: LazyLock<MetaDataKey<Headers>> =
    LazyLock::new(|| MetaDataKey::new("request.headers"));

pub static QUERY_PARAMETERS: LazyLock<MetaDataKey<BTreeMap<String, String>>> =
    LazyLock::new(|| MetaDataKey::new("request.query_parameters"));

pub static REQUEST_BODY: LazyLock<MetaDataKey<String>> =
    LazyLock::new(|| MetaDataKey::new("request.body"));

pub static RESPONSE_STATUS: LazyLock<MetaDataKey<u16>> =
    LazyLock::new(|| MetaDataKey::new("response.status"));

pub static RESPONSE_HEADERS: LazyLock<MetaDataKey<Headers>> =
    LazyLock::new(|| MetaDataKey::new("response.headers"));

pub static RESPONSE_BODY: LazyLock<MetaDataKey<String>> =
    LazyLock::new(|| MetaDataKey::new("response.body"));

/// Set while determining the handler, read when invoking it.
pub static HANDLER: LazyLock<MetaDataKey<Arc<dyn Handler>>> =
    LazyLock::new(|| MetaDataKey::new("handler"));

/// Set when the handler fails; its presence diverts the run to
/// `EXCEPTION_OCCURRED`.
pub static EXCEPTION: LazyLock<MetaDataKey<HandlerError>> =
    LazyLock::new(|| MetaDataKey::new("exception"));

/// Set a response header, creating the header map if needed.
pub fn set_response_header(md: &mut chainer::MetaData, name: &str, value: impl Into<String>) {
    let mut headers = md.remove(&RESPONSE_HEADERS).unwrap_or_default();
    headers.insert(name, value);
    md.set(&RESPONSE_HEADERS, headers);
}
