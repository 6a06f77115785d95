//! Title and description from leading comments.

use crate::Comments;

/// Split leading comments into `(title, description)`.
///
/// A blank line separates the title paragraph from the description. Without
/// one, the whole comment is the description and the title is empty:
///
/// ```text
/// // User Profile
/// //
/// // Personal details and account settings.
/// ```
///
/// yields `("User Profile", "Personal details and account settings.")`.
pub fn title_and_description(comments: &Comments) -> (String, String) {
    let text = comments.leading.trim();
    if text.is_empty() {
        return (String::new(), String::new());
    }

    let split = text
        .split_once("\n\n")
        .or_else(|| text.split_once("\r\n\r\n"));

    match split {
        Some((title, description)) => (title.trim().to_string(), description.trim().to_string()),
        None => (String::new(), text.to_string()),
    }
}
