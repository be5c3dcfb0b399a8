//! Query configuration and request construction

use super::EntitySet;
use crate::error::QueryError;
use std::fmt;

/// Sandbox endpoint of the product master service
pub const DEFAULT_BASE_URL: &str =
    "https://sandbox.api.sap.com/s4hanacloud/sap/opu/odata/sap/API_PRODUCT_SRV";

/// Smallest accepted `$top`
pub const MIN_TOP: u32 = 1;
/// Largest accepted `$top`
pub const MAX_TOP: u32 = 100;
/// `$top` used when nothing else is configured
pub const DEFAULT_TOP: u32 = 5;

/// How the product filter value is placed into the `$filter` literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterEscaping {
    /// Interpolate the value as typed
    #[default]
    Raw,
    /// Double embedded single quotes (`O'Neil` -> `O''Neil`)
    DoubleQuotes,
}

impl FilterEscaping {
    fn apply(&self, value: &str) -> String {
        match self {
            Self::Raw => value.to_string(),
            Self::DoubleQuotes => value.replace('\'', "''"),
        }
    }
}

/// Everything needed to run one query
#[derive(Clone, PartialEq, Eq)]
pub struct QueryConfig {
    base_url: String,
    pub entity: EntitySet,
    top_n: u32,
    filter_value: Option<String>,
    credential: String,
    pub escaping: FilterEscaping,
}

impl QueryConfig {
    /// Create a config against `base_url`; `top_n` is clamped to 1..=100
    pub fn new(
        base_url: impl Into<String>,
        entity: EntitySet,
        top_n: u32,
        credential: impl Into<String>,
    ) -> Self {
        let mut config = Self {
            base_url: String::new(),
            entity,
            top_n: DEFAULT_TOP,
            filter_value: None,
            credential: credential.into(),
            escaping: FilterEscaping::Raw,
        };
        config.set_base_url(base_url);
        config.set_top(top_n);
        config
    }

    /// Builder-style filter setter
    pub fn with_filter(mut self, value: impl Into<String>) -> Self {
        self.set_filter(Some(value.into()));
        self
    }

    /// Builder-style escaping setter
    pub fn with_escaping(mut self, escaping: FilterEscaping) -> Self {
        self.escaping = escaping;
        self
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into().trim().trim_end_matches('/').to_string();
    }

    pub fn top(&self) -> u32 {
        self.top_n
    }

    pub fn set_top(&mut self, top_n: u32) {
        self.top_n = top_n.clamp(MIN_TOP, MAX_TOP);
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter_value.as_deref()
    }

    /// Empty strings clear the filter
    pub fn set_filter(&mut self, value: Option<String>) {
        self.filter_value = value.filter(|v| !v.is_empty());
    }

    pub fn has_credential(&self) -> bool {
        !self.credential.trim().is_empty()
    }

    /// Build the OData query URL
    pub fn build_url(&self) -> String {
        let mut url = format!(
            "{}/{}?$top={}&$format=json",
            self.base_url,
            self.entity.wire_name(),
            self.top_n
        );

        if let Some(value) = &self.filter_value {
            url.push_str(&format!(
                "&$filter=Product eq '{}'",
                self.escaping.apply(value)
            ));
        }

        url
    }

    /// Derive the request; fails when no credential is set
    pub fn to_request(&self) -> Result<ODataRequest, QueryError> {
        if !self.has_credential() {
            return Err(QueryError::MissingCredential);
        }

        Ok(ODataRequest {
            url: self.build_url(),
            headers: vec![
                ("APIKey", self.credential.clone()),
                ("Accept", "application/json".to_string()),
            ],
        })
    }
}

impl fmt::Debug for QueryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryConfig")
            .field("base_url", &self.base_url)
            .field("entity", &self.entity)
            .field("top_n", &self.top_n)
            .field("filter_value", &self.filter_value)
            .field("credential", &"<redacted>")
            .field("escaping", &self.escaping)
            .finish()
    }
}

/// A fully built GET request
#[derive(Clone, PartialEq, Eq)]
pub struct ODataRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
}

#[cfg(test)]
impl ODataRequest {
    /// Look up a header value by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for ODataRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("APIKey") {
                    (*k, "<redacted>")
                } else {
                    (*k, v.as_str())
                }
            })
            .collect();
        f.debug_struct("ODataRequest")
            .field("url", &self.url)
            .field("headers", &headers)
            .finish()
    }
}
