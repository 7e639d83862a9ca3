use crate::error::ApiError;

pub const MAX_CHIRP_LENGTH: usize = 140;

const PROFANE_WORDS: &[&str] = &["kerfuffle", "sharbert", "fornax"];
const REPLACEMENT: &str = "****";

/// Check the length limit and mask profane words. Returns the body to store.
pub fn validate_chirp(body: &str) -> Result<String, ApiError> {
    if body.chars().count() > MAX_CHIRP_LENGTH {
        return Err(ApiError::BadRequest("Chirp is too long".to_string()));
    }
    Ok(clean_body(body))
}

/// Words are split on single spaces, so punctuation attached to a word
/// (`fornax!`) keeps it from matching.
pub fn clean_body(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            if PROFANE_WORDS.contains(&word.to_lowercase().as_str()) {
                REPLACEMENT
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_case_insensitively() {
        assert_eq!(
            clean_body("This is a kerfuffle opinion I need to share with the world"),
            "This is a **** opinion I need to share with the world"
        );
        assert_eq!(clean_body("Sharbert FORNAX"), "**** ****");
    }

    #[test]
    fn punctuation_and_spacing_survive() {
        assert_eq!(clean_body("fornax! is fine"), "fornax! is fine");
        assert_eq!(clean_body("two  spaces"), "two  spaces");
    }

    #[test]
    fn length_counts_characters() {
        let at_limit = "é".repeat(MAX_CHIRP_LENGTH);
        assert!(validate_chirp(&at_limit).is_ok());

        let over = "a".repeat(MAX_CHIRP_LENGTH + 1);
        assert!(matches!(validate_chirp(&over), Err(ApiError::BadRequest(_))));
    }
}
