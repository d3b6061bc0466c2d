/// Canonical form of a reporter email for window matching: surrounding
/// whitespace stripped, lowercased. The raw value is stored as submitted.
pub fn normalize_email(input: &str) -> String {
    input.trim().to_lowercase()
}

fn normalize_field(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identity of a reported establishment: the normalized
/// (business name, business address) pair. Two submissions naming the same
/// establishment with different casing or spacing produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EstablishmentKey {
    pub name: String,
    pub address: String,
}

impl EstablishmentKey {
    pub fn new(name: &str, address: &str) -> Self {
        Self {
            name: normalize_field(name),
            address: normalize_field(address),
        }
    }

    /// Rehydrate a key from columns that were normalized at insert time.
    pub fn from_normalized(name: String, address: String) -> Self {
        Self { name, address }
    }
}
