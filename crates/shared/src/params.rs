use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{DecodingParams, ResolveError};
use crate::transport::Transport;

const PARAMS_SELECTOR: &str = "c-wiz > div[jscontroller]";
const SIGNATURE_ATTR: &str = "data-n-a-sg";
const TIMESTAMP_ATTR: &str = "data-n-a-ts";

pub fn primary_params_url(token: &str) -> String {
    format!("https://news.google.com/articles/{}", token)
}

pub fn secondary_params_url(token: &str) -> String {
    format!("https://news.google.com/rss/articles/{}", token)
}

/// Fetch the signature and timestamp needed to decode `token`.
///
/// A transport failure on the article endpoint is retried once against the
/// RSS endpoint. A page that loads but lacks the signing attributes is a
/// parse failure and is not retried.
pub async fn fetch_decoding_params<T: Transport + ?Sized>(
    transport: &T,
    token: &str,
    timeout: Duration,
) -> Result<DecodingParams, ResolveError> {
    let primary = primary_params_url(token);
    match transport.get(&primary, timeout).await {
        Ok(html) => parse_decoding_params(&html, token),
        Err(e) => {
            warn!("Parameter fetch failed for {}: {}, trying RSS endpoint", primary, e);
            let secondary = secondary_params_url(token);
            let html = transport.get(&secondary, timeout).await?;
            parse_decoding_params(&html, token)
        }
    }
}

/// Locate the signing attributes in an article page.
pub fn parse_decoding_params(html: &str, token: &str) -> Result<DecodingParams, ResolveError> {
    let selector = Selector::parse(PARAMS_SELECTOR)
        .map_err(|e| ResolveError::parse(format!("invalid selector: {}", e)))?;

    let document = Html::parse_document(html);
    let element = document
        .select(&selector)
        .next()
        .ok_or_else(|| ResolveError::parse("could not locate signing attributes"))?;

    let attr = |name: &str| {
        element
            .value()
            .attr(name)
            .map(str::to_string)
            .ok_or_else(|| ResolveError::parse(format!("missing {} attribute", name)))
    };

    let signature = attr(SIGNATURE_ATTR)?;
    let timestamp = attr(TIMESTAMP_ATTR)?;
    debug!("Found signing parameters for token {}", token);

    Ok(DecodingParams {
        signature,
        timestamp,
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <c-wiz jsrenderer="x">
          <div jscontroller="aLI87" data-n-a-sg="AZ5r3eS1gn" data-n-a-ts="1718000000"></div>
        </c-wiz>
    </body></html>"#;

    #[test]
    fn reads_signature_and_timestamp() {
        let params = parse_decoding_params(PAGE, "TOKEN").unwrap();
        assert_eq!(params.signature, "AZ5r3eS1gn");
        assert_eq!(params.timestamp, "1718000000");
        assert_eq!(params.token, "TOKEN");
    }

    #[test]
    fn missing_container_is_a_parse_error() {
        let err = parse_decoding_params("<html><body><div jscontroller></div></body></html>", "T")
            .unwrap_err();
        assert!(matches!(err, ResolveError::Parse(_)));
    }

    #[test]
    fn missing_attribute_is_a_parse_error() {
        let html = r#"<c-wiz><div jscontroller="x" data-n-a-sg="sig"></div></c-wiz>"#;
        let err = parse_decoding_params(html, "T").unwrap_err();
        assert_eq!(err, ResolveError::parse("missing data-n-a-ts attribute"));
    }

    #[test]
    fn endpoints_embed_the_token() {
        assert_eq!(primary_params_url("ABC"), "https://news.google.com/articles/ABC");
        assert_eq!(secondary_params_url("ABC"), "https://news.google.com/rss/articles/ABC");
    }
}
