//! Desk markup → network markup translation.

use std::sync::LazyLock;

use regex::Regex;

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\*\*(.+?)\*\*").expect("static regex")
});

/// Translate desk-flavored markdown to network markup.
///
/// The desk writes bold as `**text**`; the network expects `*text*`.
/// Italic, strikethrough, and inline code already agree between the two.
pub fn desk_to_network(content: &str) -> String {
    BOLD_RE.replace_all(content, "*$1*").into_owned()
}

/// Whether content is exactly one emoji glyph (reaction-shortcut check).
pub fn is_single_emoji(content: &str) -> bool {
    let mut chars = content.chars();
    let Some(c) = chars.next() else {
        return false;
    };
    if chars.next().is_some() {
        return false;
    }
    matches!(
        c as u32,
        0x1F300..=0x1F5FF | 0x1F600..=0x1F64F | 0x1F680..=0x1F6FF | 0x2600..=0x26FF | 0x2700..=0x27BF
    )
}
