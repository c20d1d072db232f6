use crate::error::AppError;
use regex::Regex;

/// Title filter shared by the photos and calendar listings.
#[derive(Debug, Clone)]
pub enum TitleMatcher {
    Exact(String),
    /// Anchored at the start of the title only, so `Trip` also matches
    /// `Trip 2`.
    Pattern(Regex),
}

impl TitleMatcher {
    pub fn new(title: &str, use_regex: bool) -> Result<Self, AppError> {
        if use_regex {
            let pattern = Regex::new(&format!("^(?:{})", title))?;
            Ok(TitleMatcher::Pattern(pattern))
        } else {
            Ok(TitleMatcher::Exact(title.to_owned()))
        }
    }

    pub fn matches(&self, title: &str) -> bool {
        match self {
            TitleMatcher::Exact(expected) => expected == title,
            TitleMatcher::Pattern(pattern) => pattern.is_match(title),
        }
    }
}
