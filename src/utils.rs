use url::Url;

/// Last path segment of `url`, or a generated name when it has none.
pub fn get_filename_from_url(url: &Url) -> String {
    if let Some(segments) = url.path_segments() {
        if let Some(filename) = segments.last() {
            if !filename.is_empty() {
                return filename.to_string();
            }
        }
    }

    format!("download_{}", uuid::Uuid::new_v4())
}

/// Replaces everything but alphanumerics, `.`, `-` and `_`. Names made only
/// of dots become `download`.
pub fn sanitize_filename(filename: &str) -> String {
    let name: String = filename
        .chars()
        .map(|c| match c {
            '.' | '-' | '_' => c,
            c if c.is_alphanumeric() => c,
            _ => '_',
        })
        .collect();
    if name.chars().all(|c| c == '.') {
        return "download".to_string();
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_url() {
        let url = Url::parse("https://registry.example.com/node/v18/node-v18.20.4-win-x64.zip?x=1").unwrap();
        assert_eq!(get_filename_from_url(&url), "node-v18.20.4-win-x64.zip");

        let url = Url::parse("https://example.com/").unwrap();
        assert!(get_filename_from_url(&url).starts_with("download_"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_filename("a b/c?.bin"), "a_b_c_.bin");
        assert_eq!(sanitize_filename(".."), "download");
        assert_eq!(sanitize_filename(""), "download");
    }
}
