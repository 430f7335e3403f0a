//! Sibling name validation and collision resolution.

/// Check whether `name` can be used as a leaf segment.
pub fn is_valid_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed != "." && trimmed != ".." && !name.contains('/')
}

/// Split a file name into stem and extension (with its dot).
///
/// Folders and dotfiles such as `.env` have no extension.
fn split_extension(name: &str, is_directory: bool) -> (&str, &str) {
    if is_directory {
        return (name, "");
    }
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) => name.split_at(idx),
    }
}

/// Strip a trailing ` (n)` counter, returning the base and `n`.
fn split_counter(stem: &str) -> (&str, u32) {
    if let Some(open) = stem.rfind(" (")
        && let Some(number) = stem[open + 2..].strip_suffix(')')
        && let Ok(n) = number.parse::<u32>()
    {
        return (&stem[..open], n);
    }
    (stem, 0)
}

/// Pick a name for `name` that `is_taken` rejects for none of the siblings.
///
/// Collisions append an incrementing counter before the extension:
/// `report.pdf` becomes `report (1).pdf`, `report (1).pdf` becomes
/// `report (2).pdf`, `New Folder` becomes `New Folder (1)`.
pub fn unique_name(name: &str, is_directory: bool, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(name) {
        return name.to_string();
    }

    let (stem, extension) = split_extension(name, is_directory);
    let (base, start) = split_counter(stem);

    let mut counter = start.saturating_add(1);
    loop {
        let candidate = format!("{} ({}){}", base, counter, extension);
        if !is_taken(&candidate) {
            return candidate;
        }
        counter = counter.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken<'a>(names: &'a [&'a str]) -> impl Fn(&str) -> bool + 'a {
        move |candidate| names.contains(&candidate)
    }

    #[test]
    fn test_unique_name_free() {
        assert_eq!(unique_name("report.pdf", false, taken(&["other.pdf"])), "report.pdf");
    }

    #[test]
    fn test_unique_name_file_collision() {
        assert_eq!(
            unique_name("report.pdf", false, taken(&["report.pdf"])),
            "report (1).pdf"
        );
        assert_eq!(
            unique_name("report.pdf", false, taken(&["report.pdf", "report (1).pdf"])),
            "report (2).pdf"
        );
    }

    #[test]
    fn test_unique_name_continues_counter() {
        assert_eq!(
            unique_name("report (3).pdf", false, taken(&["report (3).pdf"])),
            "report (4).pdf"
        );
    }

    #[test]
    fn test_unique_name_folder_keeps_dots() {
        assert_eq!(
            unique_name("v1.2", true, taken(&["v1.2"])),
            "v1.2 (1)"
        );
        assert_eq!(
            unique_name("New Folder", true, taken(&["New Folder", "New Folder (1)"])),
            "New Folder (2)"
        );
    }

    #[test]
    fn test_unique_name_dotfile() {
        assert_eq!(unique_name(".env", false, taken(&[".env"])), ".env (1)");
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("report.pdf"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("   "));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("a/b"));
    }
}
