//! Fixed vocabularies that bound classification and discovery queries.
use once_cell::sync::Lazy;
use serde::Serialize;

/// Last day that counts as "abans" (before).
pub const RELEASE_CUTOFF: &str = "2009-12-31";
/// First day that counts as "despres" (after).
pub const RELEASE_AFTER_CUTOFF: &str = "2010-01-01";
/// Runtime pivot between short and long films, in minutes.
pub const RUNTIME_PIVOT_MINUTES: u32 = 90;
pub const MIN_RATING: f32 = 6.0;
pub const MIN_VOTE_COUNT: u32 = 50;

pub static TAXONOMY: Lazy<Taxonomy> = Lazy::new(Taxonomy::builtin);

#[derive(Debug, Clone, Serialize)]
pub struct Genre {
    pub label: String,
    pub tmdb_id: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Platform {
    pub label: String,
    pub provider_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Duration {
    #[serde(rename = "Curta")]
    Short,
    #[serde(rename = "Llarga")]
    Long,
}

impl Duration {
    pub const ALL: [Duration; 2] = [Duration::Short, Duration::Long];

    pub fn label(&self) -> &'static str {
        match self {
            Duration::Short => "Curta",
            Duration::Long => "Llarga",
        }
    }

    pub fn from_label(input: &str) -> Option<Self> {
        match normalize(input).as_str() {
            "curta" => Some(Duration::Short),
            "llarga" => Some(Duration::Long),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Era {
    #[serde(rename = "abans")]
    Before,
    #[serde(rename = "despres")]
    After,
}

impl Era {
    pub const ALL: [Era; 2] = [Era::Before, Era::After];

    pub fn label(&self) -> &'static str {
        match self {
            Era::Before => "abans",
            Era::After => "despres",
        }
    }

    pub fn from_label(input: &str) -> Option<Self> {
        match normalize(input).as_str() {
            "abans" => Some(Era::Before),
            "despres" | "després" => Some(Era::After),
            _ => None,
        }
    }
}

/// Case-folds and trims a user- or model-supplied label.
pub fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

#[derive(Debug, Clone, Serialize)]
pub struct Taxonomy {
    pub genres: Vec<Genre>,
    pub languages: Vec<Language>,
    pub platforms: Vec<Platform>,
}

impl Taxonomy {
    pub fn builtin() -> Self {
        let genres = [
            ("acció", 28),
            ("aventura", 12),
            ("animació", 16),
            ("comèdia", 35),
            ("crim", 80),
            ("documental", 99),
            ("drama", 18),
            ("família", 10751),
            ("fantasia", 14),
            ("història", 36),
            ("terror", 27),
            ("música", 10402),
            ("misteri", 9648),
            ("romàntic", 10749),
            ("ciència ficció", 878),
            ("cinema de guerra", 10752),
            ("thriller", 53),
            ("western", 37),
        ]
        .into_iter()
        .map(|(label, tmdb_id)| Genre {
            label: label.to_string(),
            tmdb_id,
        })
        .collect();

        let languages = [
            ("ca", "Català"),
            ("es", "Castellà"),
            ("en", "Anglès"),
            ("fr", "Francès"),
            ("it", "Italià"),
            ("de", "Alemany"),
        ]
        .into_iter()
        .map(|(code, name)| Language {
            code: code.to_string(),
            name: name.to_string(),
        })
        .collect();

        let platforms = [
            ("Netflix", 8),
            ("Amazon Prime Video", 9),
            ("Disney+", 337),
            ("HBO Max", 384),
            ("Apple TV+", 350),
            ("Movistar Plus", 149),
        ]
        .into_iter()
        .map(|(label, provider_id)| Platform {
            label: label.to_string(),
            provider_id,
        })
        .collect();

        Self {
            genres,
            languages,
            platforms,
        }
    }

    pub fn genre_labels(&self) -> Vec<String> {
        self.genres.iter().map(|g| g.label.clone()).collect()
    }

    pub fn genre_id(&self, label: &str) -> Option<u32> {
        let wanted = normalize(label);
        self.genres
            .iter()
            .find(|g| normalize(&g.label) == wanted)
            .map(|g| g.tmdb_id)
    }

    pub fn language_names(&self) -> Vec<String> {
        self.languages.iter().map(|l| l.name.clone()).collect()
    }

    /// Resolves either a display name ("Català") or an ISO code ("ca").
    pub fn language_code(&self, input: &str) -> Option<&str> {
        let wanted = normalize(input);
        self.languages
            .iter()
            .find(|l| normalize(&l.name) == wanted || l.code == wanted)
            .map(|l| l.code.as_str())
    }

    pub fn platform(&self, label: &str) -> Option<&Platform> {
        let wanted = normalize(label);
        self.platforms
            .iter()
            .find(|p| normalize(&p.label) == wanted)
    }
}
