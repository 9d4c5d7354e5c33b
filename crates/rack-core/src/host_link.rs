//! Rewrites file-hosting "share" links into directly embeddable thumbnail
//! links.
//!
//! Share links render an HTML viewer page, not the image. The rewriter pulls
//! the file ID out of the link and rebuilds it as
//! `<host>/thumbnail?id=<ID>&sz=w1000`. The template is a contract with the
//! display layer and must not change within a deployment.

/// Host used when none is configured.
pub const DEFAULT_IMAGE_HOST: &str = "https://drive.google.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLinkRewriter {
    /// Scheme + host, without trailing slash, e.g. `https://drive.google.com`.
    host: String,
    /// Host without scheme; a URL is only rewritten when it contains this.
    domain: String,
}

impl Default for HostLinkRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_HOST)
    }
}

impl HostLinkRewriter {
    #[must_use]
    pub fn new(host: &str) -> Self {
        let host = host.trim().trim_end_matches('/').to_owned();
        let domain = host
            .split_once("://")
            .map_or(host.as_str(), |(_, rest)| rest)
            .to_owned();
        Self { host, domain }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the thumbnail URL for a recognized share link, or `url`
    /// unchanged when it is empty, on another host, or carries no file ID.
    #[must_use]
    pub fn rewrite(&self, url: &str) -> String {
        if url.is_empty() || self.domain.is_empty() || !url.contains(&self.domain) {
            return url.to_owned();
        }

        match extract_file_id(url) {
            Some(id) => format!("{}/thumbnail?id={id}&sz=w1000", self.host),
            None => url.to_owned(),
        }
    }
}

/// Rewrites `url` against [`DEFAULT_IMAGE_HOST`].
#[must_use]
pub fn rewrite_host_link(url: &str) -> String {
    HostLinkRewriter::default().rewrite(url)
}

/// Pulls the file ID from `/file/d/<ID>/...` or from an `id=<ID>` query
/// parameter.
fn extract_file_id(url: &str) -> Option<&str> {
    if let Some((_, rest)) = url.split_once("/file/d/") {
        let id = rest.split(['/', '?', '#']).next().unwrap_or_default();
        return (!id.is_empty()).then_some(id);
    }

    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("id="))
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> HostLinkRewriter {
        HostLinkRewriter::new("https://host")
    }

    #[test]
    fn rewrites_path_embedded_id() {
        assert_eq!(
            rewriter().rewrite("https://host/file/d/ABC123/view"),
            "https://host/thumbnail?id=ABC123&sz=w1000"
        );
    }

    #[test]
    fn rewrites_open_query_id() {
        assert_eq!(
            rewriter().rewrite("https://host/open?id=ABC123&usp=sharing"),
            "https://host/thumbnail?id=ABC123&sz=w1000"
        );
    }

    #[test]
    fn rewrites_id_that_is_not_the_first_param() {
        assert_eq!(
            rewriter().rewrite("https://host/uc?export=view&id=XYZ"),
            "https://host/thumbnail?id=XYZ&sz=w1000"
        );
    }

    #[test]
    fn leaves_other_hosts_unchanged() {
        let url = "https://example.com/pic.png";
        assert_eq!(rewriter().rewrite(url), url);
    }

    #[test]
    fn leaves_empty_input_unchanged() {
        assert_eq!(rewriter().rewrite(""), "");
    }

    #[test]
    fn leaves_link_without_id_unchanged() {
        let url = "https://host/drive/folders";
        assert_eq!(rewriter().rewrite(url), url);
    }

    #[test]
    fn ignores_params_that_merely_end_in_id() {
        let url = "https://host/view?uid=42";
        assert_eq!(rewriter().rewrite(url), url);
    }

    #[test]
    fn default_rewriter_targets_drive() {
        assert_eq!(
            rewrite_host_link("https://drive.google.com/file/d/F1le/view?usp=sharing"),
            "https://drive.google.com/thumbnail?id=F1le&sz=w1000"
        );
    }
}
