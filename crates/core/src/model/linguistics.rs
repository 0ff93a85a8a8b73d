use serde::{Deserialize, Serialize};
use std::fmt;

//
// ─── CODE FOLDING ──────────────────────────────────────────────────────────────
//

/// Lower-cases, trims and strips Spanish acute accents so `"Él "` and `"el"` compare equal.
#[must_use]
pub fn fold_code(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

//
// ─── PRONOUN ───────────────────────────────────────────────────────────────────
//

/// Atomic subject pronoun codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pronoun {
    Yo,
    Tu,
    El,
    Ella,
    Usted,
    Nosotros,
    Vosotros,
    Ellos,
    Ellas,
    Ustedes,
}

impl Pronoun {
    pub const ALL: [Pronoun; 10] = [
        Pronoun::Yo,
        Pronoun::Tu,
        Pronoun::El,
        Pronoun::Ella,
        Pronoun::Usted,
        Pronoun::Nosotros,
        Pronoun::Vosotros,
        Pronoun::Ellos,
        Pronoun::Ellas,
        Pronoun::Ustedes,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Pronoun::Yo => "yo",
            Pronoun::Tu => "tu",
            Pronoun::El => "el",
            Pronoun::Ella => "ella",
            Pronoun::Usted => "usted",
            Pronoun::Nosotros => "nosotros",
            Pronoun::Vosotros => "vosotros",
            Pronoun::Ellos => "ellos",
            Pronoun::Ellas => "ellas",
            Pronoun::Ustedes => "ustedes",
        }
    }

    /// Parses an atomic code, ignoring case, surrounding whitespace and accents.
    #[must_use]
    pub fn from_code(raw: &str) -> Option<Self> {
        let folded = fold_code(raw);
        Self::ALL.into_iter().find(|p| p.as_str() == folded)
    }

    /// Index into a six-slot person/number paradigm (1s, 2s, 3s, 1p, 2p, 3p).
    #[must_use]
    pub fn paradigm_slot(self) -> usize {
        match self {
            Pronoun::Yo => 0,
            Pronoun::Tu => 1,
            Pronoun::El | Pronoun::Ella | Pronoun::Usted => 2,
            Pronoun::Nosotros => 3,
            Pronoun::Vosotros => 4,
            Pronoun::Ellos | Pronoun::Ellas | Pronoun::Ustedes => 5,
        }
    }
}

impl fmt::Display for Pronoun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── TENSE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tense {
    Present,
    Preterite,
    Imperfect,
    Future,
    Conditional,
}

impl Tense {
    pub const ALL: [Tense; 5] = [
        Tense::Present,
        Tense::Preterite,
        Tense::Imperfect,
        Tense::Future,
        Tense::Conditional,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tense::Present => "present",
            Tense::Preterite => "preterite",
            Tense::Imperfect => "imperfect",
            Tense::Future => "future",
            Tense::Conditional => "conditional",
        }
    }

    #[must_use]
    pub fn from_code(raw: &str) -> Option<Self> {
        let folded = fold_code(raw);
        Self::ALL.into_iter().find(|t| t.as_str() == folded)
    }
}

impl fmt::Display for Tense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── MOOD ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Indicative,
    Subjunctive,
}

impl Mood {
    pub const ALL: [Mood; 2] = [Mood::Indicative, Mood::Subjunctive];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Indicative => "indicative",
            Mood::Subjunctive => "subjunctive",
        }
    }

    #[must_use]
    pub fn from_code(raw: &str) -> Option<Self> {
        let folded = fold_code(raw);
        Self::ALL.into_iter().find(|m| m.as_str() == folded)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pronoun_codes_ignore_accents_and_case() {
        assert_eq!(Pronoun::from_code(" Él "), Some(Pronoun::El));
        assert_eq!(Pronoun::from_code("TÚ"), Some(Pronoun::Tu));
        assert_eq!(Pronoun::from_code("vos"), None);
    }

    #[test]
    fn third_person_pronouns_share_a_slot() {
        assert_eq!(Pronoun::Ella.paradigm_slot(), Pronoun::Usted.paradigm_slot());
        assert_eq!(Pronoun::Ellas.paradigm_slot(), 5);
    }

    #[test]
    fn tense_and_mood_round_trip_through_codes() {
        for tense in Tense::ALL {
            assert_eq!(Tense::from_code(tense.as_str()), Some(tense));
        }
        for mood in Mood::ALL {
            assert_eq!(Mood::from_code(mood.as_str()), Some(mood));
        }
        assert_eq!(Mood::from_code("imperative"), None);
    }
}
