use std::time::Duration;

use http::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::{Url, form_urlencoded};

use super::{RequestConfig, RequestOptions};
use crate::{BasicAuthCredentials, ErrorKind, Pairs, RequestBody, Result};

/// Normalizes caller input into a [`RequestConfig`], applying the client
/// defaults.
#[derive(Debug, Clone)]
pub(crate) struct RequestBuilder {
    pub(crate) base_url: Option<Url>,
    pub(crate) user_agent: HeaderValue,
    pub(crate) default_headers: HeaderMap,
    pub(crate) timeout: Option<Duration>,
}

impl RequestBuilder {
    /// Build the request for `method` and `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`] if the method, URL or a header is
    /// invalid, if the URL is relative and there is no base URL, or if more
    /// than one body form was given.
    pub(crate) fn build(
        &self,
        method: &str,
        url: &str,
        options: RequestOptions,
    ) -> Result<RequestConfig> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
        let mut url = self.resolve(url)?;

        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(options.query.iter());
        }

        let credentials = match &options.auth {
            Some(auth) => Some(auth.parse::<BasicAuthCredentials>()?),
            None => BasicAuthCredentials::from_url(&url),
        };
        // Cannot fail for http(s) URLs, which always have a host
        let _ = url.set_username("");
        let _ = url.set_password(None);

        let mut headers = self.default_headers.clone();
        headers.extend(to_header_map(&options.headers)?);
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, self.user_agent.clone());
        }
        if let Some(credentials) = credentials {
            headers.insert(AUTHORIZATION, credentials.to_header_value());
        }

        let timeout = options.timeout.or(self.timeout);
        let agent = options.agent;
        let body = body(options, &mut headers)?;

        Ok(RequestConfig {
            method,
            url,
            headers,
            body,
            timeout,
            agent,
        })
    }

    fn resolve(&self, url: &str) -> Result<Url> {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base.join(url)?,
                None => {
                    return Err(ErrorKind::InvalidConfig(format!(
                        "Relative URL `{url}` requires a base URL"
                    )));
                }
            },
            Err(e) => return Err(e.into()),
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ErrorKind::InvalidConfig(format!(
                "Unsupported URL scheme `{}`",
                url.scheme()
            )));
        }
        Ok(url)
    }
}

fn to_header_map(pairs: &Pairs) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs.iter() {
        headers.append(
            HeaderName::from_bytes(name.as_bytes())?,
            HeaderValue::from_str(value)?,
        );
    }
    Ok(headers)
}

/// Pick the body form and set the matching `Content-Type`.
fn body(options: RequestOptions, headers: &mut HeaderMap) -> Result<RequestBody> {
    let RequestOptions {
        body,
        text,
        json,
        form,
        ..
    } = options;

    let forms = [
        !matches!(body, RequestBody::Empty),
        text.is_some(),
        json.is_some(),
        form.is_some(),
    ];
    if forms.into_iter().filter(|&given| given).count() > 1 {
        return Err(ErrorKind::InvalidConfig(
            "Only one of `body`, `text`, `json` and `form` can be set".to_string(),
        ));
    }

    if let Some(text) = text {
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        }
        return Ok(text.into());
    }

    if let Some(json) = json {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        return Ok(serde_json::to_vec(&json)?.into());
    }

    if let Some(form) = form {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form.iter())
            .finish();
        return Ok(encoded.into());
    }

    Ok(body)
}
