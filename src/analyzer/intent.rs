use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::clamp_input;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TempoBucket {
    Slow,
    Medium,
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyBucket {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PopularityBucket {
    Underground,
    Moderate,
    Popular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodTag {
    Happy,
    Sad,
    Energetic,
    Chill,
    Angry,
    Romantic,
}

impl MoodTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Energetic => "energetic",
            Self::Chill => "chill",
            Self::Angry => "angry",
            Self::Romantic => "romantic",
        }
    }
}

impl fmt::Display for MoodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user is asking for, in provider-neutral terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchIntent {
    /// Candidate genres in extraction order, deduplicated.
    pub genres: Vec<&'static str>,
    pub tempo: Option<TempoBucket>,
    pub energy: Option<EnergyBucket>,
    pub popularity: Option<PopularityBucket>,
    pub moods: Vec<MoodTag>,
}

impl SearchIntent {
    pub fn has_mood(&self, mood: MoodTag) -> bool {
        self.moods.contains(&mood)
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.moods.is_empty()
            && self.tempo.is_none()
            && self.energy.is_none()
            && self.popularity.is_none()
    }
}

/// Genre → phrases; a genre is a candidate when the text contains any phrase.
pub const GENRE_PHRASES: &[(&str, &[&str])] = &[
    ("rock", &["rock", "guitar", "band", "electric"]),
    ("pop", &["pop", "catchy", "mainstream", "radio"]),
    ("hip-hop", &["hip hop", "rap", "beats", "rhymes"]),
    ("dance", &["dance", "club", "edm", "electronic"]),
    ("r-n-b", &["r&b", "soul", "smooth", "rhythm"]),
    ("indie", &["indie", "alternative", "underground"]),
    ("jazz", &["jazz", "saxophone", "trumpet", "smooth", "improvisation"]),
    ("classical", &["classical", "orchestra", "symphony", "instrumental"]),
    ("country", &["country", "folk", "acoustic", "rural", "western"]),
    ("metal", &["metal", "heavy", "hard", "guitar", "intense"]),
    ("latin", &["latin", "spanish", "reggaeton", "salsa"]),
    ("house", &["house", "deep", "beat", "rhythm", "tempo"]),
];

/// Mood tag → phrases, same containment policy as genres.
pub const MOOD_PHRASES: &[(MoodTag, &[&str])] = &[
    (MoodTag::Happy, &["happy", "upbeat", "cheerful", "joy", "positive", "fun"]),
    (MoodTag::Sad, &["sad", "melancholy", "depressed", "moody", "blue", "unhappy"]),
    (
        MoodTag::Energetic,
        &["energetic", "energizing", "power", "workout", "energy", "lively"],
    ),
    (MoodTag::Chill, &["chill", "relaxed", "calm", "mellow", "peaceful", "soft"]),
    (MoodTag::Angry, &["angry", "intense", "aggressive", "hard", "rough"]),
    (MoodTag::Romantic, &["romantic", "love", "emotional", "passionate"]),
];

/// Build a case-insensitive whole-word alternation.
fn word_rule(alternatives: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{alternatives})\b")).unwrap()
}

/// Tempo cues in priority order: fast, slow, medium.
static TEMPO_RULES: LazyLock<Vec<(Regex, TempoBucket)>> = LazyLock::new(|| {
    vec![
        (word_rule("fast|quick|rapid|upbeat|uptempo"), TempoBucket::Fast),
        (word_rule("slow|relaxed|downtempo"), TempoBucket::Slow),
        (word_rule("medium|moderate|average"), TempoBucket::Medium),
    ]
});

/// Energy cues in priority order: high, low, medium.
static ENERGY_RULES: LazyLock<Vec<(Regex, EnergyBucket)>> = LazyLock::new(|| {
    vec![
        (
            word_rule("high energy|energetic|powerful|intense|strong"),
            EnergyBucket::High,
        ),
        (word_rule("low energy|calm|gentle|soft|smooth"), EnergyBucket::Low),
        (word_rule("medium energy|moderate energy"), EnergyBucket::Medium),
    ]
});

/// Popularity cues in priority order: popular, underground, moderate.
static POPULARITY_RULES: LazyLock<Vec<(Regex, PopularityBucket)>> = LazyLock::new(|| {
    vec![
        (
            word_rule("popular|mainstream|hit|chart|top"),
            PopularityBucket::Popular,
        ),
        (
            word_rule("obscure|underground|indie|unknown|niche"),
            PopularityBucket::Underground,
        ),
        (
            word_rule("moderate popularity|well known|familiar"),
            PopularityBucket::Moderate,
        ),
    ]
});

/// First bucket whose rule matches, if any.
fn first_match<T: Copy>(rules: &[(Regex, T)], text: &str) -> Option<T> {
    rules
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, bucket)| *bucket)
}

/// Tags whose phrase list has any phrase contained in `text`, deduplicated.
fn matching_tags<T: Copy + PartialEq>(table: &[(T, &[&str])], text: &str) -> Vec<T> {
    let mut tags = Vec::new();
    for (tag, phrases) in table {
        if phrases.iter().any(|p| text.contains(p)) && !tags.contains(tag) {
            tags.push(*tag);
        }
    }
    tags
}

/// Extract the structured search intent from free text.
pub fn extract_intent(text: &str) -> SearchIntent {
    let lower = clamp_input(text).to_lowercase();

    let intent = SearchIntent {
        genres: matching_tags(GENRE_PHRASES, &lower),
        tempo: first_match(&TEMPO_RULES, &lower),
        energy: first_match(&ENERGY_RULES, &lower),
        popularity: first_match(&POPULARITY_RULES, &lower),
        moods: matching_tags(MOOD_PHRASES, &lower),
    };

    log::debug!("Extracted intent: {intent:?}");
    intent
}
