//! Generated article domain types

use serde::{Deserialize, Serialize};

use crate::parse::{self, ParseError, lenient_string, lenient_strings};

/// Article text produced by the writer model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArticle {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image_prompt: String,
}

impl GeneratedArticle {
    /// Parses a model response into an article; title and content are required
    pub fn from_response(response: &str) -> Result<Self, ParseError> {
        let article: GeneratedArticle = parse::parse_json(response)?;
        if article.title.trim().is_empty() {
            return Err(ParseError::MissingField("title"));
        }
        if article.content.trim().is_empty() {
            return Err(ParseError::MissingField("content"));
        }
        Ok(article)
    }

    /// Image prompt, if the writer suggested one
    pub fn image_prompt(&self) -> Option<&str> {
        let prompt = self.image_prompt.trim();
        (!prompt.is_empty()).then_some(prompt)
    }

    /// URL- and filename-safe slug of the title
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }
}

/// How saved articles are laid out on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArticleStyle {
    /// Markdown with a YAML front matter block (static site generators)
    #[default]
    FrontMatter,
    /// Markdown with a heading and a description paragraph
    Plain,
}

/// Lowercase ASCII slug, words joined by `-`, at most 80 chars
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= 80 {
            break;
        }
    }

    if slug.is_empty() {
        "article".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_article_requires_title_and_content() {
        let ok = GeneratedArticle::from_response(
            r#"{"title": "Hello", "content": "Body", "tags": ["rust"], "imagePrompt": "a crab"}"#,
        )
        .unwrap();
        assert_eq!(ok.title, "Hello");
        assert_eq!(ok.image_prompt(), Some("a crab"));

        let missing = GeneratedArticle::from_response(r#"{"title": "Hello"}"#);
        assert_eq!(missing, Err(ParseError::MissingField("content")));

        let blank = GeneratedArticle::from_response(r#"{"title": " ", "content": "x"}"#);
        assert_eq!(blank, Err(ParseError::MissingField("title")));
    }

    #[test]
    fn test_empty_image_prompt_is_none() {
        let article = GeneratedArticle {
            title: "t".into(),
            content: "c".into(),
            ..Default::default()
        };
        assert_eq!(article.image_prompt(), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust 2024: What's New?  "), "rust-2024-what-s-new");
        assert_eq!(slugify("日本語"), "article");
    }
}
