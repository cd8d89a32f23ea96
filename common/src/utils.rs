use crate::Item;

/// Checks that a username only uses letters, digits and `@ . + - _`.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

pub fn find_item_by_id(items: &[Item], id: i64) -> Option<&Item> {
    items.iter().find(|item| item.id == id)
}
