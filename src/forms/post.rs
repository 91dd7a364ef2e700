use serde::Serialize;

use super::{FormErrors, optional_text, required_text};
use crate::models::{Post, PostInput};

pub const TITLE_MAX_LENGTH: usize = 255;
pub const TAG_NAME_MAX_LENGTH: usize = 50;
const URL_MAX_LENGTH: usize = 255;

/// Raw post form values.
///
/// Built from the ordered key/value pairs of the body because `tags` repeats
/// once per selected checkbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostForm {
    pub title: String,
    pub short_description: String,
    pub content: String,
    pub featured_image_url: String,
    pub visible: bool,
    pub tags: Vec<String>,
    pub new_tags: String,
}

impl PostForm {
    /// Blank form for the create page.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            visible: true,
            ..Self::default()
        }
    }

    /// Form pre-filled from an existing post, for the edit page.
    #[must_use]
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            short_description: post.short_description.clone().unwrap_or_default(),
            content: post.content.clone(),
            featured_image_url: post.featured_image_url.clone().unwrap_or_default(),
            visible: post.visible,
            tags: post.tags.iter().map(|t| t.id.to_string()).collect(),
            new_tags: String::new(),
        }
    }

    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "title" => form.title.clone_from(value),
                "short_description" => form.short_description.clone_from(value),
                "content" => form.content.clone_from(value),
                "featured_image_url" => form.featured_image_url.clone_from(value),
                "visible" => form.visible = is_checked(value),
                "tags" => form.tags.push(value.clone()),
                "new_tags" => form.new_tags.clone_from(value),
                _ => {}
            }
        }
        form
    }

    pub fn validate(&self) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::new();

        let title = required_text(&mut errors, "title", &self.title, Some(TITLE_MAX_LENGTH));
        let content = required_text(&mut errors, "content", &self.content, None);
        let short_description = optional_text(Some(&self.short_description));

        let featured_image_url = optional_text(Some(&self.featured_image_url));
        if let Some(url) = &featured_image_url
            && let Err(message) = check_image_url(url)
        {
            errors.add("featured_image_url", message);
        }

        let mut tag_ids = Vec::with_capacity(self.tags.len());
        for raw in &self.tags {
            match raw.trim().parse::<i32>() {
                Ok(id) if id > 0 => {
                    if !tag_ids.contains(&id) {
                        tag_ids.push(id);
                    }
                }
                _ => errors.add(
                    "tags",
                    format!("Select a valid choice. {raw} is not one of the available choices."),
                ),
            }
        }

        let mut new_tags: Vec<String> = Vec::new();
        for name in self.new_tags.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name.chars().count() > TAG_NAME_MAX_LENGTH {
                errors.add(
                    "new_tags",
                    format!("Tag names have at most {TAG_NAME_MAX_LENGTH} characters: {name}"),
                );
            } else if !new_tags.iter().any(|t| t.to_lowercase() == name.to_lowercase()) {
                new_tags.push(name.to_string());
            }
        }

        errors.into_result(PostInput {
            title,
            short_description,
            content,
            featured_image_url,
            visible: self.visible,
            tag_ids,
            new_tags,
        })
    }
}

fn is_checked(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "false" | "off" | "0"
    )
}

fn check_image_url(raw: &str) -> Result<(), String> {
    if raw.len() > URL_MAX_LENGTH {
        return Err(format!(
            "Ensure this value has at most {URL_MAX_LENGTH} characters."
        ));
    }
    let url = url::Url::parse(raw).map_err(|_| "Enter a valid URL.".to_string())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err("Enter a valid URL.".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn collects_repeated_tags() {
        let form = PostForm::from_pairs(&pairs(&[
            ("title", "Hello"),
            ("content", "<p>Body</p>"),
            ("tags", "1"),
            ("tags", "3"),
            ("tags", "1"),
            ("visible", "on"),
        ]));

        let input = form.validate().unwrap();
        assert_eq!(input.tag_ids, vec![1, 3]);
        assert!(input.visible);
        assert_eq!(input.short_description, None);
    }

    #[test]
    fn missing_checkbox_means_hidden() {
        let form = PostForm::from_pairs(&pairs(&[("title", "t"), ("content", "c")]));
        assert!(!form.validate().unwrap().visible);
        assert!(PostForm::initial().visible);
    }

    #[test]
    fn new_tags_are_split_and_deduplicated() {
        let form = PostForm::from_pairs(&pairs(&[
            ("title", "t"),
            ("content", "c"),
            ("new_tags", " Rust, rust ,, Web "),
        ]));
        assert_eq!(form.validate().unwrap().new_tags, vec!["Rust", "Web"]);
    }

    #[test]
    fn reports_each_invalid_field() {
        let form = PostForm::from_pairs(&pairs(&[
            ("title", &"x".repeat(256)),
            ("content", "  "),
            ("featured_image_url", "ftp://example.com/a.png"),
            ("tags", "abc"),
            ("new_tags", &"t".repeat(51)),
        ]));

        let errors = form.validate().unwrap_err();
        for field in ["title", "content", "featured_image_url", "tags", "new_tags"] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn accepts_http_image_url() {
        let form = PostForm::from_pairs(&pairs(&[
            ("title", "t"),
            ("content", "c"),
            ("featured_image_url", "https://example.com/cover.jpg"),
        ]));
        assert_eq!(
            form.validate().unwrap().featured_image_url.as_deref(),
            Some("https://example.com/cover.jpg")
        );
    }

    #[test]
    fn unknown_keys_such_as_author_are_ignored() {
        let form = PostForm::from_pairs(&pairs(&[
            ("title", "t"),
            ("content", "c"),
            ("author", "mallory"),
        ]));
        assert_eq!(form.title, "t");
        assert!(form.validate().is_ok());
    }
}
