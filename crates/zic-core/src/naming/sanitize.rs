//! Filesystem-safe names.

/// Characters that some filesystems reject in names; replaced by spaces in
/// album directory names.
const DIR_FORBIDDEN: &[char] = &['/', '\\', '?', '*', '|', '"', ':', '>', '<'];

/// Album directory name: forbidden characters become spaces, control
/// characters are dropped, and leading/trailing dots and spaces are trimmed
/// so the name can never be `.`/`..` or hidden.
pub fn sanitize_dir_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if DIR_FORBIDDEN.contains(&c) { ' ' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        crate::naming::UNKNOWN.to_string()
    } else {
        truncate_to_name_max(trimmed)
    }
}

/// File name from an untrusted source (server header, URL).
///
/// - Replaces NUL, `/`, `\`, and control characters with `_`
/// - Trims leading/trailing spaces and dots
/// - Limits length to 255 bytes (Linux NAME_MAX)
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.' || c == '_');
    truncate_to_name_max(trimmed)
}

fn truncate_to_name_max(s: &str) -> String {
    const NAME_MAX: usize = 255;
    if s.len() <= NAME_MAX {
        return s.to_string();
    }
    let mut take = NAME_MAX;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    s[..take].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_forbidden_chars_become_spaces() {
        assert_eq!(sanitize_dir_name("AC/DC - Back: In <Black>"), "AC DC - Back  In  Black");
        assert_eq!(sanitize_dir_name("\"Quoted\" | *Star*"), "Quoted     Star");
    }

    #[test]
    fn dir_name_never_dot_or_empty() {
        assert_eq!(sanitize_dir_name(".."), "Unknown");
        assert_eq!(sanitize_dir_name("  "), "Unknown");
        assert_eq!(sanitize_dir_name(".hidden"), "hidden");
    }

    #[test]
    fn file_name_strips_separators_and_controls() {
        assert_eq!(sanitize_file_name("a/b\\c.mp3"), "a_b_c.mp3");
        assert_eq!(sanitize_file_name("x\u{0}y.mp3"), "x_y.mp3");
        assert_eq!(sanitize_file_name("../evil.mp3"), "evil.mp3");
    }

    #[test]
    fn long_names_are_cut_on_char_boundary() {
        let long = "й".repeat(200);
        let out = sanitize_file_name(&long);
        assert!(out.len() <= 255);
        assert!(out.chars().all(|c| c == 'й'));
    }
}
