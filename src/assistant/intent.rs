//! Routing of user prompts to chat or image generation.

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Conversation,
    ImageRequest,
}

/// Decides the [`Intent`] of a prompt.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, prompt: &str) -> Intent;
}

/// Case-insensitive keyword match.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    #[must_use]
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(["visuel", "affiche", "image"])
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, prompt: &str) -> Intent {
        let lower = prompt.to_lowercase();
        if self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            Intent::ImageRequest
        } else {
            Intent::Conversation
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_keywords_route_to_image() {
        let c = KeywordClassifier::default();
        assert_eq!(c.classify("Fais une AFFICHE pour la kermesse"), Intent::ImageRequest);
        assert_eq!(c.classify("un visuel sympa"), Intent::ImageRequest);
        assert_eq!(c.classify("Rédige un mail au trésorier"), Intent::Conversation);
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let c = KeywordClassifier::new(["dessin", ""]);
        assert_eq!(c.classify("une image"), Intent::Conversation);
        assert_eq!(c.classify("un Dessin"), Intent::ImageRequest);
    }
}
