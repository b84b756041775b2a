//! Shape check for user-supplied frame URLs.
//!
//! This is a collaborator of the compositor, not part of it: the surface
//! trusts whatever source string it is handed. The check is loose: a
//! string passes if it ends in a known image extension, or if it looks like
//! an `http://` URL:
//!
//! ```text
//! [http://] (domain | ipv4) [:port] [/path...] [?query] [#fragment]
//! ```
//!
//! Matching is case-insensitive throughout. Only the exact `http://` prefix
//! counts as a scheme; a near miss such as `htt://` is left in place and then
//! fails as a host with an empty port.

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpeg", "jpg", "gif", "png", "svg", "webp", "bmp", "tiff", "ico", "blob",
];

/// Whether `url` is worth handing to the loader as a frame source.
pub fn is_valid_image_url(url: &str) -> bool {
    has_image_extension(url) || is_url_shaped(url)
}

fn has_image_extension(url: &str) -> bool {
    let Some((_, ext)) = url.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
}

fn is_url_shaped(url: &str) -> bool {
    let rest = strip_prefix_ignore_case(url, "http://").unwrap_or(url);

    let (rest, fragment) = split_at_char(rest, '#');
    if let Some(fragment) = fragment {
        if !fragment.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return false;
        }
    }

    let (rest, query) = split_at_char(rest, '?');
    if let Some(query) = query {
        if !query.chars().all(|c| c.is_ascii_alphanumeric() || ";&%_.~+=-".contains(c)) {
            return false;
        }
    }

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], Some(&rest[i..])),
        None => (rest, None),
    };
    if let Some(path) = path {
        if !path
            .chars()
            .all(|c| c == '/' || c.is_ascii_alphanumeric() || "-%_.~+".contains(c))
        {
            return false;
        }
    }

    let (host, port) = split_at_char(authority, ':');
    if let Some(port) = port {
        if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }

    is_ipv4(host) || is_domain(host)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn split_at_char(s: &str, c: char) -> (&str, Option<&str>) {
    match s.split_once(c) {
        Some((head, tail)) => (head, Some(tail)),
        None => (s, None),
    }
}

fn is_ipv4(host: &str) -> bool {
    let octets: Vec<&str> = host.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|o| (1..=3).contains(&o.len()) && o.chars().all(|c| c.is_ascii_digit()))
}

fn is_domain(host: &str) -> bool {
    let Some((labels, tld)) = host.rsplit_once('.') else {
        return false;
    };
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    labels.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_image_extensions_case_insensitively() {
        assert!(is_valid_image_url("https://cdn.example.com/frames/grad.PNG"));
        assert!(is_valid_image_url("frame.webp"));
        assert!(is_valid_image_url("whatever://odd/path/x.jpeg"));
        assert!(is_valid_image_url("file.blob"));
    }

    #[test]
    fn accepts_url_shapes() {
        assert!(is_valid_image_url("example.com"));
        assert!(is_valid_image_url("http://example.com"));
        assert!(is_valid_image_url("HTTP://Sub.Example.co.id/a/b"));
        assert!(is_valid_image_url("http://192.168.0.1:8080/frame"));
        assert!(is_valid_image_url("http://example.com/path?size=2&q=a-b#top"));
        assert!(is_valid_image_url("my-host.example.org/"));
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(!is_valid_image_url(""));
        assert!(!is_valid_image_url("not a url"));
        assert!(!is_valid_image_url("localhost"));
        assert!(!is_valid_image_url("http://-bad.com"));
        assert!(!is_valid_image_url("http://example.c"));
        assert!(!is_valid_image_url("http://example.com:port"));
        assert!(!is_valid_image_url("http://example.com/a b"));
        assert!(!is_valid_image_url("http://example.com/#frag?x"));
        assert!(!is_valid_image_url("ftp://example.com/frame"));
    }

    #[test]
    fn misspelled_scheme_is_not_a_url() {
        assert!(!is_valid_image_url("htt://example.com"));
        assert!(!is_valid_image_url("htt://example.com/frame"));
        assert!(!is_valid_image_url("ht://example.com"));
    }

    #[test]
    fn https_needs_an_image_extension() {
        assert!(!is_valid_image_url("https://example.com/frame"));
        assert!(is_valid_image_url("https://example.com/frame.png"));
    }

    #[test]
    fn ipv4_octets_are_one_to_three_digits() {
        assert!(is_ipv4("10.0.0.1"));
        assert!(!is_ipv4("10.0.0"));
        assert!(!is_ipv4("1000.0.0.1"));
    }
}
