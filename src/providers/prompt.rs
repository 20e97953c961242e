/// The prompt used for extracting ingredient mentions from recipe text.
///
/// The template is loaded from `prompt.txt` at compile time using the
/// `include_str!` macro, making it easy to edit without dealing with
/// Rust string syntax. `{{TEXT}}` marks where the recipe text goes.
pub const INGREDIENT_EXTRACTION_PROMPT: &str = include_str!("prompt.txt");

const TEXT_PLACEHOLDER: &str = "{{TEXT}}";

/// Build the extraction prompt for a recipe description (or fallback title).
pub fn build_extraction_prompt(text: &str) -> String {
    INGREDIENT_EXTRACTION_PROMPT.replacen(TEXT_PLACEHOLDER, text, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_embedded() {
        assert!(!INGREDIENT_EXTRACTION_PROMPT.is_empty());
        assert!(INGREDIENT_EXTRACTION_PROMPT.contains(TEXT_PLACEHOLDER));
    }

    #[test]
    fn test_prompt_contains_output_rules() {
        let prompt = build_extraction_prompt("사과 5개");

        assert!(prompt.contains("JSON array"));
        assert!(prompt.contains("\"name\""));
        assert!(prompt.contains("\"amount\""));
        assert!(prompt.contains("\"unit\""));
        assert!(prompt.contains("never use markdown"));
        assert!(prompt.contains("empty array []"));
        assert!(prompt.contains("closing the final bracket ]"));
    }

    #[test]
    fn test_text_is_injected_once() {
        let prompt = build_extraction_prompt("후숙된 아보카도 1개와 {{TEXT}}");

        assert!(prompt.contains("\"\"\"후숙된 아보카도 1개와 {{TEXT}}\"\"\""));
        assert!(!prompt.starts_with("{{TEXT}}"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_extraction_prompt("루꼴라"), build_extraction_prompt("루꼴라"));
    }
}
