/// Substitute when sanitization consumes the entire name.
const EMPTY_FALLBACK: &str = "document";

/// Ceiling applied after every other step.
const MAX_NAME_LEN: usize = 256;

/// Turns an arbitrary filename into a constrained identifier that is safe for
/// the inference API's document-naming rules.
///
/// The transformation is deterministic and idempotent: applying it to its own
/// output never changes the result. That property matters because prior turns
/// are re-serialized before every request, which re-applies sanitization to
/// names that were already sanitized once.
///
/// Steps, in order:
/// 1. Strip one trailing `.pdf` extension, case-insensitive.
/// 2. Replace every character outside `[A-Za-z0-9 \-()\[\]]` with `-`.
/// 3. Collapse whitespace runs, then convert each remaining space to `-`.
/// 4. Collapse `-` runs to a single `-`.
/// 5. Trim leading/trailing separators.
/// 6. Substitute `document` when nothing remains.
/// 7. Truncate to 256 characters (re-trimming any `-` the cut exposes).
pub fn sanitize_document_name(raw: &str) -> String {
    let stem = strip_pdf_extension(raw);

    let mut out = String::with_capacity(stem.len());
    let mut pending_separator = false;
    for c in stem.chars() {
        let valid = c.is_ascii_alphanumeric() || matches!(c, '(' | ')' | '[' | ']');
        if valid {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            out.push(c);
            pending_separator = false;
        } else {
            // Whitespace, '-', and every invalid character all become a single
            // separator once the runs are collapsed.
            pending_separator = true;
        }
    }

    if out.is_empty() {
        return EMPTY_FALLBACK.to_string();
    }

    let mut result: String = out.chars().take(MAX_NAME_LEN).collect();
    while result.ends_with('-') {
        result.pop();
    }
    if result.is_empty() {
        return EMPTY_FALLBACK.to_string();
    }
    result
}

fn strip_pdf_extension(name: &str) -> &str {
    let len = name.len();
    if len >= 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".pdf") {
        &name[..len - 4]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_case() {
        assert_eq!(sanitize_document_name("Report (Final)!.pdf"), "Report-(Final)");
    }

    #[test]
    fn test_plain_name_passes_through() {
        assert_eq!(sanitize_document_name("quarterly-report"), "quarterly-report");
    }

    #[test]
    fn test_extension_stripped_case_insensitively() {
        assert_eq!(sanitize_document_name("notes.PDF"), "notes");
        assert_eq!(sanitize_document_name("notes.Pdf"), "notes");
    }

    #[test]
    fn test_only_one_extension_stripped() {
        assert_eq!(sanitize_document_name("archive.pdf.pdf"), "archive-pdf");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(sanitize_document_name("a   b\t c"), "a-b-c");
    }

    #[test]
    fn test_dash_runs_collapsed() {
        assert_eq!(sanitize_document_name("a---b___c"), "a-b-c");
    }

    #[test]
    fn test_brackets_preserved() {
        assert_eq!(sanitize_document_name("notes [draft] (v2).pdf"), "notes-[draft]-(v2)");
    }

    #[test]
    fn test_empty_and_all_invalid_fall_back() {
        assert_eq!(sanitize_document_name(""), "document");
        assert_eq!(sanitize_document_name(".pdf"), "document");
        assert_eq!(sanitize_document_name("???.pdf"), "document");
        assert_eq!(sanitize_document_name("   "), "document");
    }

    #[test]
    fn test_non_ascii_replaced() {
        assert_eq!(sanitize_document_name("résumé.pdf"), "r-sum");
    }

    #[test]
    fn test_truncated_to_limit() {
        let long = "a".repeat(600);
        let result = sanitize_document_name(&long);
        assert_eq!(result.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_truncation_never_leaves_trailing_dash() {
        // 255 valid chars followed by a separator and more text: the cut at 256
        // would land on the '-' without the re-trim.
        let tricky = format!("{} tail", "a".repeat(255));
        let result = sanitize_document_name(&tricky);
        assert!(!result.ends_with('-'));
        assert_eq!(result, "a".repeat(255));
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "Report (Final)!.pdf",
            "a   b\t c",
            "résumé.pdf",
            "???.pdf",
            "",
            "notes [draft] (v2).pdf",
            "--leading and trailing--",
            "archive.pdf.pdf",
            &"x y".repeat(300),
        ];
        for input in inputs {
            let once = sanitize_document_name(input);
            let twice = sanitize_document_name(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_output_bounds() {
        let inputs = ["", " ", "!!!", &"รายงาน".repeat(100), &"a-".repeat(400)];
        for input in inputs {
            let result = sanitize_document_name(input);
            assert!(!result.is_empty(), "empty output for {input:?}");
            assert!(
                result.chars().count() <= MAX_NAME_LEN,
                "over-long output for {input:?}"
            );
        }
    }
}
