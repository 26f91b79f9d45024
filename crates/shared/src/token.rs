use url::Url;

pub const NEWS_HOST: &str = "news.google.com";

const TOKEN_MARKERS: [&str; 2] = ["articles", "read"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenMatch {
    Token(String),
    NotRedirect,
}

/// Pull the opaque article token out of a redirect link.
///
/// Anything that is not `https://news.google.com/.../{articles|read}/{token}`
/// is `NotRedirect`, including URLs that fail to parse.
pub fn extract_token(raw: &str) -> TokenMatch {
    let Ok(url) = Url::parse(raw) else {
        return TokenMatch::NotRedirect;
    };

    if url.host_str() != Some(NEWS_HOST) {
        return TokenMatch::NotRedirect;
    }

    // Url::path always starts with '/', so the first split segment is empty
    let segments: Vec<&str> = url.path().split('/').collect();
    if segments.len() <= 1 {
        return TokenMatch::NotRedirect;
    }

    let marker = segments[segments.len() - 2];
    let token = segments[segments.len() - 1];

    if !TOKEN_MARKERS.contains(&marker) || token.is_empty() {
        return TokenMatch::NotRedirect;
    }

    TokenMatch::Token(token.to_string())
}

pub fn is_redirect_link(raw: &str) -> bool {
    matches!(extract_token(raw), TokenMatch::Token(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_token_from_rss_article_link() {
        assert_eq!(
            extract_token("https://news.google.com/rss/articles/CBMiVkFVX3lxTE4?oc=5"),
            TokenMatch::Token("CBMiVkFVX3lxTE4".to_string())
        );
    }

    #[test]
    fn accepts_read_and_plain_articles_paths() {
        assert_eq!(
            extract_token("https://news.google.com/read/ABC"),
            TokenMatch::Token("ABC".to_string())
        );
        assert_eq!(
            extract_token("https://news.google.com/articles/XYZ#frag"),
            TokenMatch::Token("XYZ".to_string())
        );
    }

    #[test]
    fn rejects_other_hosts_and_shapes() {
        assert_eq!(extract_token("https://example.com/articles/XYZ"), TokenMatch::NotRedirect);
        assert_eq!(extract_token("https://news.google.com/topics/XYZ"), TokenMatch::NotRedirect);
        assert_eq!(extract_token("https://news.google.com/"), TokenMatch::NotRedirect);
        assert_eq!(extract_token("https://news.google.com/articles/"), TokenMatch::NotRedirect);
        assert_eq!(extract_token("not a url"), TokenMatch::NotRedirect);
        assert_eq!(extract_token(""), TokenMatch::NotRedirect);
    }

    #[test]
    fn host_match_is_exact() {
        assert!(!is_redirect_link("https://news.google.com.evil.test/articles/XYZ"));
        assert!(!is_redirect_link("https://www.news.google.com/articles/XYZ"));
        assert!(is_redirect_link("https://NEWS.google.com/articles/XYZ"));
    }
}
