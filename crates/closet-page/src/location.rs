use url::Url;

/// Address of the page the content script runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub href: String,
    pub hostname: String,
}

impl PageLocation {
    /// Parses a page URL. An unparseable URL keeps its text but has an empty
    /// hostname, so no site pattern will resolve for it.
    #[must_use]
    pub fn parse(href: &str) -> Self {
        match Url::parse(href) {
            Ok(url) => Self {
                hostname: url.host_str().unwrap_or_default().to_ascii_lowercase(),
                href: url.into(),
            },
            Err(e) => {
                tracing::warn!(href, error = %e, "could not parse page URL");
                Self {
                    href: href.to_owned(),
                    hostname: String::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_lowercase_hostname() {
        let location = PageLocation::parse("https://WWW.Amazon.com/dp/B0TEST?th=1");
        assert_eq!(location.hostname, "www.amazon.com");
        assert_eq!(location.href, "https://www.amazon.com/dp/B0TEST?th=1");
    }

    #[test]
    fn parse_keeps_unparseable_href_without_hostname() {
        let location = PageLocation::parse("not a url");
        assert_eq!(location.href, "not a url");
        assert!(location.hostname.is_empty());
    }
}
