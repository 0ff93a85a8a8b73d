//! Conjugation lookup.
//!
//! Round logic only needs [`ConjugationSource::correct_form`]; [`TableConjugator`] is the
//! built-in source covering regular paradigms plus the irregular verbs of the bundled
//! vocabularies. Combinations the table does not define (for example subjunctive preterite)
//! are gaps and return `None`.

use serde::Serialize;

use crate::model::{Mood, Pronoun, Tense};

/// External source of correct verb forms.
pub trait ConjugationSource: Send + Sync {
    /// The correct form, or `None` where the source has no defined form.
    fn correct_form(&self, verb: &str, pronoun: Pronoun, tense: Tense, mood: Mood)
    -> Option<String>;

    /// Every defined form of `verb`, ordered by mood, tense and pronoun.
    fn conjugation_table(&self, verb: &str) -> Vec<ConjugatedForm> {
        let mut out = Vec::new();
        for mood in Mood::ALL {
            for tense in Tense::ALL {
                for pronoun in Pronoun::ALL {
                    if let Some(form) = self.correct_form(verb, pronoun, tense, mood) {
                        out.push(ConjugatedForm {
                            mood,
                            tense,
                            pronoun,
                            form,
                        });
                    }
                }
            }
        }
        out
    }
}

/// One cell of a conjugation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConjugatedForm {
    pub mood: Mood,
    pub tense: Tense,
    pub pronoun: Pronoun,
    pub form: String,
}

//
// ─── PARADIGMS ─────────────────────────────────────────────────────────────────
//

type Row = [&'static str; 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjugation {
    Ar,
    Er,
    Ir,
}

impl Conjugation {
    fn of(verb: &str) -> Option<(Self, &str)> {
        if let Some(stem) = verb.strip_suffix("ar") {
            Some((Conjugation::Ar, stem))
        } else if let Some(stem) = verb.strip_suffix("er") {
            Some((Conjugation::Er, stem))
        } else {
            verb.strip_suffix("ir").map(|stem| (Conjugation::Ir, stem))
        }
    }

    fn present(self) -> Row {
        match self {
            Conjugation::Ar => ["o", "as", "a", "amos", "áis", "an"],
            Conjugation::Er => ["o", "es", "e", "emos", "éis", "en"],
            Conjugation::Ir => ["o", "es", "e", "imos", "ís", "en"],
        }
    }

    fn preterite(self) -> Row {
        match self {
            Conjugation::Ar => ["é", "aste", "ó", "amos", "asteis", "aron"],
            Conjugation::Er | Conjugation::Ir => ["í", "iste", "ió", "imos", "isteis", "ieron"],
        }
    }

    fn imperfect(self) -> Row {
        match self {
            Conjugation::Ar => ["aba", "abas", "aba", "ábamos", "abais", "aban"],
            Conjugation::Er | Conjugation::Ir => ["ía", "ías", "ía", "íamos", "íais", "ían"],
        }
    }

    fn present_subjunctive(self) -> Row {
        match self {
            Conjugation::Ar => ["e", "es", "e", "emos", "éis", "en"],
            Conjugation::Er | Conjugation::Ir => ["a", "as", "a", "amos", "áis", "an"],
        }
    }
}

const FUTURE_ENDINGS: Row = ["é", "ás", "á", "emos", "éis", "án"];
const CONDITIONAL_ENDINGS: Row = ["ía", "ías", "ía", "íamos", "íais", "ían"];
const IMPERFECT_SUBJUNCTIVE_ENDINGS: Row = ["ra", "ras", "ra", "ramos", "rais", "ran"];

//
// ─── IRREGULARS ────────────────────────────────────────────────────────────────
//

/// Irregular verb entry. Rows that are absent are gaps, except the imperfect indicative,
/// which falls back to the regular paradigm, and the future/conditional, which are built
/// from `future_stem` (or the infinitive).
struct Irregular {
    verb: &'static str,
    future_stem: Option<&'static str>,
    present: Option<Row>,
    preterite: Option<Row>,
    imperfect: Option<Row>,
    present_subjunctive: Option<Row>,
}

const IRREGULARS: &[Irregular] = &[
    Irregular {
        verb: "ser",
        future_stem: None,
        present: Some(["soy", "eres", "es", "somos", "sois", "son"]),
        preterite: Some(["fui", "fuiste", "fue", "fuimos", "fuisteis", "fueron"]),
        imperfect: Some(["era", "eras", "era", "éramos", "erais", "eran"]),
        present_subjunctive: Some(["sea", "seas", "sea", "seamos", "seáis", "sean"]),
    },
    Irregular {
        verb: "estar",
        future_stem: None,
        present: Some(["estoy", "estás", "está", "estamos", "estáis", "están"]),
        preterite: Some([
            "estuve",
            "estuviste",
            "estuvo",
            "estuvimos",
            "estuvisteis",
            "estuvieron",
        ]),
        imperfect: None,
        present_subjunctive: Some(["esté", "estés", "esté", "estemos", "estéis", "estén"]),
    },
    Irregular {
        verb: "tener",
        future_stem: Some("tendr"),
        present: Some(["tengo", "tienes", "tiene", "tenemos", "tenéis", "tienen"]),
        preterite: Some(["tuve", "tuviste", "tuvo", "tuvimos", "tuvisteis", "tuvieron"]),
        imperfect: None,
        present_subjunctive: Some(["tenga", "tengas", "tenga", "tengamos", "tengáis", "tengan"]),
    },
    Irregular {
        verb: "hacer",
        future_stem: Some("har"),
        present: Some(["hago", "haces", "hace", "hacemos", "hacéis", "hacen"]),
        preterite: Some(["hice", "hiciste", "hizo", "hicimos", "hicisteis", "hicieron"]),
        imperfect: None,
        present_subjunctive: Some(["haga", "hagas", "haga", "hagamos", "hagáis", "hagan"]),
    },
    Irregular {
        verb: "ir",
        future_stem: None,
        present: Some(["voy", "vas", "va", "vamos", "vais", "van"]),
        preterite: Some(["fui", "fuiste", "fue", "fuimos", "fuisteis", "fueron"]),
        imperfect: Some(["iba", "ibas", "iba", "íbamos", "ibais", "iban"]),
        present_subjunctive: Some(["vaya", "vayas", "vaya", "vayamos", "vayáis", "vayan"]),
    },
    Irregular {
        verb: "poder",
        future_stem: Some("podr"),
        present: Some(["puedo", "puedes", "puede", "podemos", "podéis", "pueden"]),
        preterite: Some(["pude", "pudiste", "pudo", "pudimos", "pudisteis", "pudieron"]),
        imperfect: None,
        present_subjunctive: Some(["pueda", "puedas", "pueda", "podamos", "podáis", "puedan"]),
    },
    Irregular {
        verb: "decir",
        future_stem: Some("dir"),
        present: Some(["digo", "dices", "dice", "decimos", "decís", "dicen"]),
        preterite: Some(["dije", "dijiste", "dijo", "dijimos", "dijisteis", "dijeron"]),
        imperfect: None,
        present_subjunctive: Some(["diga", "digas", "diga", "digamos", "digáis", "digan"]),
    },
    Irregular {
        verb: "haber",
        future_stem: Some("habr"),
        present: Some(["he", "has", "ha", "hemos", "habéis", "han"]),
        preterite: Some(["hube", "hubiste", "hubo", "hubimos", "hubisteis", "hubieron"]),
        imperfect: None,
        present_subjunctive: Some(["haya", "hayas", "haya", "hayamos", "hayáis", "hayan"]),
    },
    Irregular {
        verb: "ver",
        future_stem: None,
        present: Some(["veo", "ves", "ve", "vemos", "veis", "ven"]),
        preterite: Some(["vi", "viste", "vio", "vimos", "visteis", "vieron"]),
        imperfect: Some(["veía", "veías", "veía", "veíamos", "veíais", "veían"]),
        present_subjunctive: Some(["vea", "veas", "vea", "veamos", "veáis", "vean"]),
    },
    Irregular {
        verb: "dar",
        future_stem: None,
        present: Some(["doy", "das", "da", "damos", "dais", "dan"]),
        preterite: Some(["di", "diste", "dio", "dimos", "disteis", "dieron"]),
        imperfect: None,
        present_subjunctive: Some(["dé", "des", "dé", "demos", "deis", "den"]),
    },
    Irregular {
        verb: "saber",
        future_stem: Some("sabr"),
        present: Some(["sé", "sabes", "sabe", "sabemos", "sabéis", "saben"]),
        preterite: Some(["supe", "supiste", "supo", "supimos", "supisteis", "supieron"]),
        imperfect: None,
        present_subjunctive: Some(["sepa", "sepas", "sepa", "sepamos", "sepáis", "sepan"]),
    },
    Irregular {
        verb: "querer",
        future_stem: Some("querr"),
        present: Some(["quiero", "quieres", "quiere", "queremos", "queréis", "quieren"]),
        preterite: Some(["quise", "quisiste", "quiso", "quisimos", "quisisteis", "quisieron"]),
        imperfect: None,
        present_subjunctive: Some([
            "quiera", "quieras", "quiera", "queramos", "queráis", "quieran",
        ]),
    },
    Irregular {
        verb: "poner",
        future_stem: Some("pondr"),
        present: Some(["pongo", "pones", "pone", "ponemos", "ponéis", "ponen"]),
        preterite: Some(["puse", "pusiste", "puso", "pusimos", "pusisteis", "pusieron"]),
        imperfect: None,
        present_subjunctive: Some(["ponga", "pongas", "ponga", "pongamos", "pongáis", "pongan"]),
    },
    Irregular {
        verb: "parecer",
        future_stem: None,
        present: Some(["parezco", "pareces", "parece", "parecemos", "parecéis", "parecen"]),
        preterite: Some([
            "parecí",
            "pareciste",
            "pareció",
            "parecimos",
            "parecisteis",
            "parecieron",
        ]),
        imperfect: None,
        present_subjunctive: Some([
            "parezca",
            "parezcas",
            "parezca",
            "parezcamos",
            "parezcáis",
            "parezcan",
        ]),
    },
    Irregular {
        verb: "llegar",
        future_stem: None,
        present: Some(["llego", "llegas", "llega", "llegamos", "llegáis", "llegan"]),
        preterite: Some(["llegué", "llegaste", "llegó", "llegamos", "llegasteis", "llegaron"]),
        imperfect: None,
        present_subjunctive: Some([
            "llegue", "llegues", "llegue", "lleguemos", "lleguéis", "lleguen",
        ]),
    },
    Irregular {
        verb: "creer",
        future_stem: None,
        present: Some(["creo", "crees", "cree", "creemos", "creéis", "creen"]),
        preterite: Some(["creí", "creíste", "creyó", "creímos", "creísteis", "creyeron"]),
        imperfect: None,
        present_subjunctive: Some(["crea", "creas", "crea", "creamos", "creáis", "crean"]),
    },
];

//
// ─── TABLE CONJUGATOR ──────────────────────────────────────────────────────────
//

/// Built-in conjugation table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableConjugator;

impl TableConjugator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn preterite_third_plural(verb: &str) -> Option<String> {
        let slot = Pronoun::Ellos.paradigm_slot();
        match IRREGULARS.iter().find(|entry| entry.verb == verb) {
            Some(entry) => entry.preterite.map(|row| row[slot].to_string()),
            None => {
                let (conj, stem) = Conjugation::of(verb)?;
                Some(format!("{stem}{}", conj.preterite()[slot]))
            }
        }
    }

    /// Imperfect subjunctive (-ra) built from the third person plural preterite.
    fn imperfect_subjunctive(verb: &str, slot: usize) -> Option<String> {
        let third_plural = Self::preterite_third_plural(verb)?;
        let stem = third_plural.strip_suffix("ron")?;
        let ending = IMPERFECT_SUBJUNCTIVE_ENDINGS[slot];
        if slot == Pronoun::Nosotros.paradigm_slot() {
            // nosotros stresses the vowel before the ending: habláramos, fuéramos
            let mut chars: Vec<char> = stem.chars().collect();
            let last = chars.pop()?;
            let stressed = match last {
                'a' => 'á',
                'e' => 'é',
                other => other,
            };
            let head: String = chars.into_iter().collect();
            return Some(format!("{head}{stressed}{ending}"));
        }
        Some(format!("{stem}{ending}"))
    }
}

impl ConjugationSource for TableConjugator {
    fn correct_form(
        &self,
        verb: &str,
        pronoun: Pronoun,
        tense: Tense,
        mood: Mood,
    ) -> Option<String> {
        let verb = verb.trim();
        let slot = pronoun.paradigm_slot();
        let (conj, stem) = Conjugation::of(verb)?;
        let irregular = IRREGULARS.iter().find(|entry| entry.verb == verb);

        let from_row = |row: Option<Row>| row.map(|r| r[slot].to_string());
        let regular = |row: Row| format!("{stem}{}", row[slot]);

        match (mood, tense) {
            (Mood::Indicative, Tense::Present) => match irregular {
                Some(entry) => from_row(entry.present),
                None => Some(regular(conj.present())),
            },
            (Mood::Indicative, Tense::Preterite) => match irregular {
                Some(entry) => from_row(entry.preterite),
                None => Some(regular(conj.preterite())),
            },
            (Mood::Indicative, Tense::Imperfect) => irregular
                .and_then(|entry| from_row(entry.imperfect))
                .or_else(|| Some(regular(conj.imperfect()))),
            (Mood::Indicative, Tense::Future | Tense::Conditional) => {
                let future_stem = irregular.and_then(|entry| entry.future_stem).unwrap_or(verb);
                let endings = if tense == Tense::Future {
                    FUTURE_ENDINGS
                } else {
                    CONDITIONAL_ENDINGS
                };
                Some(format!("{future_stem}{}", endings[slot]))
            }
            (Mood::Subjunctive, Tense::Present) => match irregular {
                Some(entry) => from_row(entry.present_subjunctive),
                None => Some(regular(conj.present_subjunctive())),
            },
            (Mood::Subjunctive, Tense::Imperfect) => Self::imperfect_subjunctive(verb, slot),
            (Mood::Subjunctive, Tense::Preterite | Tense::Future | Tense::Conditional) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::vocabulary::{REGULAR, TOP20};

    fn form(verb: &str, pronoun: Pronoun, tense: Tense, mood: Mood) -> Option<String> {
        TableConjugator::new().correct_form(verb, pronoun, tense, mood)
    }

    #[test]
    fn regular_present_indicative() {
        assert_eq!(
            form("hablar", Pronoun::Yo, Tense::Present, Mood::Indicative).as_deref(),
            Some("hablo")
        );
        assert_eq!(
            form("vivir", Pronoun::Vosotros, Tense::Present, Mood::Indicative).as_deref(),
            Some("vivís")
        );
        assert_eq!(
            form("comer", Pronoun::Ustedes, Tense::Present, Mood::Indicative).as_deref(),
            Some("comen")
        );
    }

    #[test]
    fn irregular_overrides_and_future_stems() {
        assert_eq!(
            form("tener", Pronoun::Yo, Tense::Present, Mood::Indicative).as_deref(),
            Some("tengo")
        );
        assert_eq!(
            form("tener", Pronoun::Nosotros, Tense::Future, Mood::Indicative).as_deref(),
            Some("tendremos")
        );
        assert_eq!(
            form("ser", Pronoun::Ella, Tense::Imperfect, Mood::Indicative).as_deref(),
            Some("era")
        );
        assert_eq!(
            form("estar", Pronoun::Tu, Tense::Imperfect, Mood::Indicative).as_deref(),
            Some("estabas")
        );
    }

    #[test]
    fn imperfect_subjunctive_derives_from_preterite() {
        assert_eq!(
            form("ser", Pronoun::Nosotros, Tense::Imperfect, Mood::Subjunctive).as_deref(),
            Some("fuéramos")
        );
        assert_eq!(
            form("hablar", Pronoun::Yo, Tense::Imperfect, Mood::Subjunctive).as_deref(),
            Some("hablara")
        );
        assert_eq!(
            form("comer", Pronoun::Nosotros, Tense::Imperfect, Mood::Subjunctive).as_deref(),
            Some("comiéramos")
        );
    }

    #[test]
    fn subjunctive_preterite_is_a_gap() {
        assert_eq!(
            form("hablar", Pronoun::Yo, Tense::Preterite, Mood::Subjunctive),
            None
        );
        assert_eq!(form("xyz", Pronoun::Yo, Tense::Present, Mood::Indicative), None);
    }

    #[test]
    fn bundled_vocabularies_are_fully_covered_in_present_indicative() {
        for verb in TOP20.verbs().iter().chain(REGULAR.verbs()) {
            for pronoun in Pronoun::ALL {
                assert!(
                    form(verb, pronoun, Tense::Present, Mood::Indicative).is_some(),
                    "missing {verb}/{pronoun}"
                );
            }
        }
    }

    #[test]
    fn table_lists_every_defined_cell() {
        let table = TableConjugator::new().conjugation_table("hablar");
        // 5 indicative tenses + 2 subjunctive tenses, 10 pronouns each
        assert_eq!(table.len(), 70);
        assert_eq!(table[0].form, "hablo");
    }
}
