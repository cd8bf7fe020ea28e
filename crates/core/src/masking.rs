//! Display masking for personal and payment data.

use serde::{Deserialize, Serialize};

/// What kind of value is being masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveKind {
    #[default]
    Email,
    Phone,
    Card,
    Ssn,
    Generic,
}

fn last_chars(data: &str, n: usize) -> String {
    let chars: Vec<char> = data.chars().collect();
    chars[chars.len().saturating_sub(n)..].iter().collect()
}

/// Mask `data` for display. Empty input stays empty.
///
/// An email without `@` is treated as [`SensitiveKind::Generic`].
pub fn mask_sensitive(data: &str, kind: SensitiveKind) -> String {
    if data.is_empty() {
        return String::new();
    }
    let len = data.chars().count();

    match kind {
        SensitiveKind::Email => match data.split_once('@') {
            Some((name, domain)) if name.chars().count() <= 2 => format!("***@{domain}"),
            Some((name, domain)) => {
                let head: String = name.chars().take(2).collect();
                format!("{head}***@{domain}")
            }
            None => mask_sensitive(data, SensitiveKind::Generic),
        },
        SensitiveKind::Phone if len >= 4 => format!("***-***-{}", last_chars(data, 4)),
        SensitiveKind::Phone => "***".to_string(),
        SensitiveKind::Card if len >= 4 => format!("****-****-****-{}", last_chars(data, 4)),
        SensitiveKind::Card => "****".to_string(),
        SensitiveKind::Ssn if len >= 4 => format!("***-**-{}", last_chars(data, 4)),
        SensitiveKind::Ssn => "***".to_string(),
        SensitiveKind::Generic if len <= 3 => "***".to_string(),
        SensitiveKind::Generic => {
            let head: String = data.chars().take(2).collect();
            format!("{head}***{}", last_chars(data, 1))
        }
    }
}

/// Replace the first twelve characters of a card number with `*`, keeping
/// the length. Shorter values are fully starred.
pub fn mask_card_prefix(card_number: &str) -> String {
    card_number
        .chars()
        .enumerate()
        .map(|(i, c)| if i < 12 { '*' } else { c })
        .collect()
}
