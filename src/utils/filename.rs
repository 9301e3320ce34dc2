/// Turns a client-supplied filename into a safe, deterministic blob name:
/// keeps only the last path component, joins whitespace runs with `_`, drops
/// every character outside `[A-Za-z0-9_.-]`, and trims leading/trailing dots
/// and underscores. May return an empty string; callers must reject that.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("");

    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");

    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    filtered.trim_matches(['.', '_']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_names() {
        assert_eq!(sanitize_filename("mug.png"), "mug.png");
        assert_eq!(sanitize_filename("IMG_2024-01.jpeg"), "IMG_2024-01.jpeg");
    }

    #[test]
    fn strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\cup.jpg"), "cup.jpg");
        assert_eq!(sanitize_filename("/absolute/path/cup.jpg"), "cup.jpg");
    }

    #[test]
    fn replaces_whitespace_with_underscores() {
        assert_eq!(sanitize_filename("red   mug photo.png"), "red_mug_photo.png");
    }

    #[test]
    fn drops_unsafe_characters() {
        assert_eq!(sanitize_filename("ha!ck<>er;.png"), "hacker.png");
        assert_eq!(sanitize_filename("naïve café.png"), "nave_caf.png");
    }

    #[test]
    fn trims_leading_dots_and_underscores() {
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("__init__.py"), "init__.py");
    }

    #[test]
    fn degenerate_names_become_empty() {
        assert_eq!(sanitize_filename(""), "");
        assert_eq!(sanitize_filename("..."), "");
        assert_eq!(sanitize_filename("///"), "");
        assert_eq!(sanitize_filename("日本語"), "");
    }

    #[test]
    fn is_deterministic() {
        let a = sanitize_filename("a b/c d.png");
        let b = sanitize_filename("a b/c d.png");
        assert_eq!(a, b);
    }
}
