//! Prompts for the product-description request.
//!
//! Callers can override the system prompt via
//! [`crate::config::CatalogConfig::system_prompt`]; the constant here is used
//! only when no override is provided. The per-entry user text is always built
//! by [`description_request`].

use crate::output::COLUMNS;

/// Default system prompt for describing one product from its images.
pub const DESCRIPTION_SYSTEM_PROMPT: &str = r#"You are an e-commerce copywriter preparing a product catalog. You receive the style number of one product, a list of brand keywords and one or more photos of the product taken from a wholesale line sheet.

Follow these rules precisely:

1. OUTPUT FORMAT
   - Reply with exactly ONE JSON object and nothing else
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary before or after the object
   - Every value is a string

2. KEYS
   - "Style Number": the style number you were given, unchanged
   - "Product Title": a short, specific title (at most 70 characters)
   - "Product Description": two to four sentences on material, fit, details and use
   - "Tags": comma-separated search tags, lowercase
   - "Product Category": a broad category such as "Apparel" or "Accessories"
   - "Product Type": the specific garment or item type such as "Dress" or "Tote Bag"
   - "Option2 Value": the main visible colour
   - "Keywords": the brand keywords that genuinely apply, comma-separated

3. ACCURACY
   - Describe only what is visible in the photos or stated in the request
   - Never invent fabric content, sizes or prices
   - Use "N/A" for a key you cannot fill"#;

/// Build the user text for one entry.
///
/// The images are attached to the same message by the caller.
pub fn description_request(style_number: &str, keywords: &[String]) -> String {
    let keyword_line = if keywords.is_empty() {
        "(none provided)".to_string()
    } else {
        keywords.join(", ")
    };
    format!(
        "Style number: {style_number}\n\
         Brand keywords: {keyword_line}\n\
         Required keys: {}\n\n\
         Write the JSON object for this product.",
        COLUMNS.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_every_column() {
        for col in COLUMNS {
            assert!(
                DESCRIPTION_SYSTEM_PROMPT.contains(&format!("\"{col}\"")),
                "prompt does not mention {col}"
            );
        }
    }

    #[test]
    fn request_carries_style_and_keywords() {
        let text = description_request("AB-1234", &["linen".into(), "summer".into()]);
        assert!(text.contains("Style number: AB-1234"));
        assert!(text.contains("Brand keywords: linen, summer"));
        assert!(text.contains("Option2 Value"));
    }

    #[test]
    fn request_without_keywords_says_so() {
        let text = description_request("7", &[]);
        assert!(text.contains("(none provided)"));
    }
}
