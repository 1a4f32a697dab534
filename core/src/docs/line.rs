use serde::Deserialize;

/// Presentation hints handed through to the renderer untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct Styling {
    pub color: Option<String>,
    pub icon: Option<String>,
    pub italic: bool,
    pub starred: bool,
    pub indent: u8,
}

/// One line of documentation, either authored in the content files or generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct DocLine {
    pub text: String,
    #[serde(rename = "header")]
    pub is_header: bool,
    #[serde(rename = "separator")]
    pub is_separator: bool,
    pub link: Option<String>,
    #[serde(flatten)]
    pub styling: Styling,
}

impl DocLine {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn header(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_header: true,
            ..Self::default()
        }
    }

    pub fn separator() -> Self {
        Self {
            is_separator: true,
            ..Self::default()
        }
    }

    /// A blank line used for spacing.
    pub fn spacer() -> Self {
        Self::default()
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.styling.color = Some(color.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.styling.icon = Some(icon.into());
        self
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.styling.indent = indent;
        self
    }

    pub fn starred(mut self) -> Self {
        self.styling.starred = true;
        self
    }

    pub fn has_link(&self) -> bool {
        self.link.as_deref().is_some_and(|link| !link.is_empty())
    }

    /// Empty lines only affect spacing; they are still emitted.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.has_link() && !self.is_separator
    }
}
