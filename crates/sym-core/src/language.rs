//! Language ↔ file extension table.

use std::path::Path;

/// Known languages and their file extensions (with leading dot).
pub const LANGUAGE_EXTENSIONS: &[(&str, &[&str])] = &[
    ("javascript", &[".js", ".mjs", ".cjs"]),
    ("typescript", &[".ts", ".mts", ".cts"]),
    ("jsx", &[".jsx"]),
    ("tsx", &[".tsx"]),
    ("go", &[".go"]),
    ("python", &[".py"]),
    ("java", &[".java"]),
    ("c", &[".c", ".h"]),
    ("cpp", &[".cpp", ".cc", ".cxx", ".hpp", ".hh"]),
    ("rust", &[".rs"]),
    ("ruby", &[".rb"]),
    ("php", &[".php"]),
    ("shell", &[".sh", ".bash"]),
    ("yaml", &[".yaml", ".yml"]),
    ("json", &[".json"]),
    ("xml", &[".xml"]),
    ("html", &[".html", ".htm"]),
    ("css", &[".css"]),
];

/// Extensions registered for a language (after alias normalisation).
pub fn extensions_for(language: &str) -> &'static [&'static str] {
    let lang = normalize_language(language);
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(name, _)| *name == lang)
        .map_or(&[], |(_, exts)| exts)
}

/// Detect a file's language from its extension.
pub fn language_for_file(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_lowercase();
    let dotted = format!(".{ext}");
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(_, exts)| exts.contains(&dotted.as_str()))
        .map(|(name, _)| *name)
}

/// Normalise common aliases (`ts`, `tsx` → `typescript`; `js`, `jsx` → `javascript`;
/// `py` → `python`).
pub fn normalize_language(language: &str) -> String {
    let lower = language.trim().to_lowercase();
    match lower.as_str() {
        "ts" | "tsx" => "typescript".into(),
        "js" | "jsx" => "javascript".into(),
        "py" => "python".into(),
        _ => lower,
    }
}

/// Whether a file belongs to any of `languages`.
///
/// `jsx`/`tsx` files also count as `javascript`/`typescript`. An empty
/// language list matches every file.
pub fn file_matches_languages(path: &str, languages: &[String]) -> bool {
    if languages.is_empty() {
        return true;
    }
    let Some(detected) = language_for_file(path) else {
        return false;
    };
    let detected_family = normalize_language(detected);
    languages.iter().any(|lang| {
        let wanted = lang.trim().to_lowercase();
        wanted == detected || normalize_language(&wanted) == detected_family
    })
}
