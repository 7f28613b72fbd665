//! Identity parameters carried on the hosting page URL.

use std::borrow::Cow;

use reqwest::Url;

/// Credentials for the house listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    pub user_id: String,
}

/// `AppId`, `UserId`, `AppName` and `UserName` from a page query string.
///
/// Display names are percent-decoded; ids are taken as-is after decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionParams {
    pub app_id: Option<String>,
    pub user_id: Option<String>,
    pub app_name: Option<String>,
    pub user_name: Option<String>,
}

impl SessionParams {
    /// Reads the parameters from a full URL. Returns `None` if it does not parse.
    pub fn from_url(url: &str) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        Some(Self::from_pairs(url.query_pairs()))
    }

    /// Reads the parameters from a bare query string, with or without a leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        match Url::parse("http://localhost/") {
            Ok(mut url) => {
                url.set_query(Some(query));
                Self::from_pairs(url.query_pairs())
            }
            Err(_) => Self::default(),
        }
    }

    fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match &*key {
                "AppId" => &mut params.app_id,
                "UserId" => &mut params.user_id,
                "AppName" => &mut params.app_name,
                "UserName" => &mut params.user_name,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }
        params
    }

    /// Both ids, if present.
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            app_id: self.app_id.clone()?,
            user_id: self.user_id.clone()?,
        })
    }
}
