//! Extension-based MIME guessing for external links.
//!
//! This is a heuristic over the URL text only, no content sniffing. The port
//! exists so tests and hosts can substitute their own guesser.

/// MIME-type guesser port.
pub trait MimeGuesser: Send + Sync {
    fn guess(&self, url: &str) -> String;
}

/// Default guesser mapping the trailing path extension to a MIME type.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtensionMimeGuesser;

/// Extension to MIME mapping; covers the types the display-mode decision
/// cares about plus a few common ones.
const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    ("zip", "application/zip"),
    ("tar", "application/x-tar"),
    ("gz", "application/g-zip"),
    ("gzip", "application/g-zip"),
    ("pdf", "application/pdf"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("txt", "text/plain"),
    ("gif", "image/gif"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("svgz", "image/svg+xml"),
    ("swf", "application/x-shockwave-flash"),
    ("flv", "video/x-flv"),
    ("wm", "video/x-ms-wm"),
    ("wmv", "video/x-ms-wm"),
    ("avi", "video/x-ms-wm"),
    ("mov", "video/quicktime"),
    ("qt", "video/quicktime"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mp3", "audio/mp3"),
    ("ra", "audio/x-realaudio-plugin"),
    ("ram", "audio/x-realaudio-plugin"),
    ("rm", "audio/x-realaudio-plugin"),
];

impl MimeGuesser for ExtensionMimeGuesser {
    fn guess(&self, url: &str) -> String {
        match extension(url) {
            // no file-ish path segment, most probably a page
            None => "text/html".to_string(),
            Some(ext) => MIME_BY_EXTENSION
                .iter()
                .find(|(e, _)| ext.eq_ignore_ascii_case(e))
                .map(|(_, m)| m.to_string())
                .unwrap_or_else(|| "document/unknown".to_string()),
        }
    }
}

/// Extract the extension of the last path segment, ignoring query string and
/// fragment. Host-only URLs and directory URLs have none.
fn extension(url: &str) -> Option<&str> {
    let no_fragment = url.split('#').next().unwrap_or(url);
    let no_query = no_fragment.split('?').next().unwrap_or(no_fragment);

    // skip scheme://host so a dot in the host does not look like an extension
    let path = match no_query.find("://") {
        Some(pos) => {
            let after = &no_query[pos + 3..];
            match after.find('/') {
                Some(slash) => &after[slash..],
                None => return None,
            }
        }
        None => no_query,
    };

    let segment = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        let g = ExtensionMimeGuesser;
        assert_eq!(g.guess("http://e/a.pdf"), "application/pdf");
        assert_eq!(g.guess("http://e/a.PNG"), "image/png");
        assert_eq!(g.guess("http://e/dir/movie.mp4?t=10"), "video/mp4");
        assert_eq!(g.guess("http://e/a.tar#frag"), "application/x-tar");
    }

    #[test]
    fn host_dots_are_not_extensions() {
        let g = ExtensionMimeGuesser;
        assert_eq!(g.guess("http://www.example.com"), "text/html");
        assert_eq!(g.guess("http://www.example.com/"), "text/html");
        assert_eq!(g.guess("http://www.example.com/dir/"), "text/html");
    }

    #[test]
    fn unknown_extension() {
        let g = ExtensionMimeGuesser;
        assert_eq!(g.guess("http://e/archive.xyz"), "document/unknown");
    }

    #[test]
    fn dotfiles_and_bare_dots_have_no_extension() {
        assert_eq!(extension("http://e/.hidden"), None);
        assert_eq!(extension("http://e/name."), None);
        assert_eq!(extension("/local/readme.txt"), Some("txt"));
    }
}
