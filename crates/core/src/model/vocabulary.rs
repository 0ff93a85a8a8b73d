/// A bounded verb vocabulary selectable by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerbClass {
    key: &'static str,
    verbs: &'static [&'static str],
}

impl VerbClass {
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Infinitives in this class, in frequency order.
    #[must_use]
    pub fn verbs(&self) -> &'static [&'static str] {
        self.verbs
    }
}

pub const DEFAULT_VERB_CLASS: &str = "top20";

/// Fully regular verbs only.
pub const REGULAR: VerbClass = VerbClass {
    key: "regular",
    verbs: &[
        "hablar", "caminar", "estudiar", "trabajar", "comer", "beber", "aprender", "vivir",
        "escribir", "abrir",
    ],
};

/// The twenty most frequent Spanish verbs.
pub const TOP20: VerbClass = VerbClass {
    key: "top20",
    verbs: &[
        "ser", "estar", "tener", "hacer", "ir", "poder", "decir", "haber", "ver", "dar", "saber",
        "querer", "llegar", "pasar", "deber", "poner", "parecer", "quedar", "creer", "hablar",
    ],
};

pub const VERB_CLASSES: [VerbClass; 2] = [TOP20, REGULAR];

/// Looks up a verb class by key (case-insensitive).
#[must_use]
pub fn verb_class(key: &str) -> Option<VerbClass> {
    let key = key.trim();
    VERB_CLASSES
        .into_iter()
        .find(|class| class.key.eq_ignore_ascii_case(key))
}
