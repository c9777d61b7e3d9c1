//! Placeholder analysis for rule templates.

/// Placeholders the narrator derives from a captured path.
pub const DERIVED_FIELDS: &[&str] = &["filetype", "filename"];

/// List the `{name}` placeholders of a template in order of first appearance.
///
/// A placeholder name is a non-empty run of ASCII alphanumerics and
/// underscores; braces around anything else are literal text.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut found: Vec<&str> = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let name = &after[..close];
        if is_placeholder_name(name) {
            if !found.contains(&name) {
                found.push(name);
            }
            rest = &after[close + 1..];
        } else {
            rest = after;
        }
    }

    found
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_in_order() {
        assert_eq!(
            placeholders("{filetype}「{filename}」を読み込みます"),
            vec!["filetype", "filename"]
        );
        assert_eq!(placeholders("{a} {b} {a}"), vec!["a", "b"]);
    }

    #[test]
    fn test_no_placeholders() {
        assert!(placeholders("ファイルを作成します").is_empty());
        assert!(placeholders("").is_empty());
    }

    #[test]
    fn test_literal_braces_are_ignored() {
        assert_eq!(placeholders("{ not one } {}"), Vec::<&str>::new());
        assert_eq!(placeholders("{{command}}"), vec!["command"]);
        assert_eq!(placeholders("unterminated {file_path"), Vec::<&str>::new());
    }
}
