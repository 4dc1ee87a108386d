use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label of one cached view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryKey {
    Latest,
    Cs,
    Math,
    Physics,
    QBio,
    QFin,
    Stat,
    Eess,
    Econ,
    Search,
    Favorites,
}

impl CategoryKey {
    pub const ALL: [CategoryKey; 11] = [
        CategoryKey::Latest,
        CategoryKey::Cs,
        CategoryKey::Math,
        CategoryKey::Physics,
        CategoryKey::QBio,
        CategoryKey::QFin,
        CategoryKey::Stat,
        CategoryKey::Eess,
        CategoryKey::Econ,
        CategoryKey::Search,
        CategoryKey::Favorites,
    ];

    /// Subject areas in their fixed scan order.
    pub const SUBJECTS: [CategoryKey; 8] = [
        CategoryKey::Cs,
        CategoryKey::Math,
        CategoryKey::Physics,
        CategoryKey::QBio,
        CategoryKey::QFin,
        CategoryKey::Stat,
        CategoryKey::Eess,
        CategoryKey::Econ,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKey::Latest => "latest",
            CategoryKey::Cs => "cs",
            CategoryKey::Math => "math",
            CategoryKey::Physics => "physics",
            CategoryKey::QBio => "q-bio",
            CategoryKey::QFin => "q-fin",
            CategoryKey::Stat => "stat",
            CategoryKey::Eess => "eess",
            CategoryKey::Econ => "econ",
            CategoryKey::Search => "search",
            CategoryKey::Favorites => "favorites",
        }
    }

    /// The archive prefix used in category queries, for subject keys only.
    pub fn subject_code(&self) -> Option<&'static str> {
        match self {
            CategoryKey::Latest | CategoryKey::Search | CategoryKey::Favorites => None,
            other => Some(other.as_str()),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CategoryKey::Latest => "Latest",
            CategoryKey::Cs => "Computer Science",
            CategoryKey::Math => "Mathematics",
            CategoryKey::Physics => "Physics",
            CategoryKey::QBio => "Quantitative Biology",
            CategoryKey::QFin => "Quantitative Finance",
            CategoryKey::Stat => "Statistics",
            CategoryKey::Eess => "Electrical Engineering and Systems Science",
            CategoryKey::Econ => "Economics",
            CategoryKey::Search => "Search",
            CategoryKey::Favorites => "Favorites",
        }
    }

    /// Keys whose contents come straight from a catalog fetch.
    pub fn is_fetchable(&self) -> bool {
        !matches!(self, CategoryKey::Search | CategoryKey::Favorites)
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        CategoryKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == needle)
            .ok_or_else(|| {
                format!(
                    "Unknown category: {}. Expected one of: {}",
                    s,
                    CategoryKey::ALL.map(|k| k.as_str()).join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_key() {
        for key in CategoryKey::ALL {
            assert_eq!(key.as_str().parse::<CategoryKey>().unwrap(), key);
        }
        assert_eq!("Q-BIO".parse::<CategoryKey>().unwrap(), CategoryKey::QBio);
        assert!("biology".parse::<CategoryKey>().is_err());
    }

    #[test]
    fn test_subject_code_only_for_subjects() {
        assert_eq!(CategoryKey::Cs.subject_code(), Some("cs"));
        assert_eq!(CategoryKey::QFin.subject_code(), Some("q-fin"));
        assert_eq!(CategoryKey::Latest.subject_code(), None);
        assert_eq!(CategoryKey::Search.subject_code(), None);
        assert_eq!(CategoryKey::Favorites.subject_code(), None);
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            key: CategoryKey,
        }
        let wrapper: Wrapper = toml::from_str("key = \"q-bio\"").unwrap();
        assert_eq!(wrapper.key, CategoryKey::QBio);
    }
}
