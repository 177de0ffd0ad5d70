use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldRule {
    pub keyword: String,
    pub example: String,
}

/// Configurable description of a supported language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageSpec {
    #[serde(default)]
    pub verb_forms: Vec<String>,
    #[serde(default)]
    pub verb_endings: Vec<String>,
    #[serde(default)]
    pub scaffolds: Vec<ScaffoldRule>,
    pub generic_example: String,
}

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("invalid verb pattern for language '{code}': {source}")]
    Pattern {
        code: String,
        #[source]
        source: regex::Error,
    },
}

/// Compiled verb detector and example generator for one language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    code: String,
    verb_pattern: Option<Regex>,
    scaffolds: Vec<ScaffoldRule>,
    generic_example: String,
}

impl LanguageProfile {
    pub fn compile(code: &str, spec: &LanguageSpec) -> Result<Self, LanguageError> {
        let code = code.trim().to_ascii_lowercase();
        let verb_pattern = build_verb_pattern(&spec.verb_forms, &spec.verb_endings)
            .map(|pattern| Regex::new(&pattern))
            .transpose()
            .map_err(|source| LanguageError::Pattern {
                code: code.clone(),
                source,
            })?;

        let scaffolds = spec
            .scaffolds
            .iter()
            .map(|rule| ScaffoldRule {
                keyword: rule.keyword.to_lowercase(),
                example: rule.example.clone(),
            })
            .collect();

        Ok(Self {
            code,
            verb_pattern,
            scaffolds,
            generic_example: spec.generic_example.clone(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn detect_verb(&self, text: &str) -> bool {
        let Some(pattern) = self.verb_pattern.as_ref() else {
            return false;
        };
        pattern.is_match(&text.to_lowercase())
    }

    /// Model sentence for the task, matched on the first keyword it contains.
    pub fn scaffold(&self, task: &str) -> &str {
        let task = task.to_lowercase();
        self.scaffolds
            .iter()
            .find(|rule| task.contains(&rule.keyword))
            .map(|rule| rule.example.as_str())
            .unwrap_or(&self.generic_example)
    }
}

fn build_verb_pattern(forms: &[String], endings: &[String]) -> Option<String> {
    let forms: Vec<String> = forms
        .iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .map(|f| regex::escape(&f))
        .collect();
    let endings: Vec<String> = endings
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .map(|e| regex::escape(&e))
        .collect();

    let mut alternatives = Vec::with_capacity(2);
    if !forms.is_empty() {
        alternatives.push(format!("(?:{})", forms.join("|")));
    }
    if !endings.is_empty() {
        alternatives.push(format!(r"\w+(?:{})", endings.join("|")));
    }
    if alternatives.is_empty() {
        return None;
    }

    Some(format!(r"\b(?:{})\b", alternatives.join("|")))
}

#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    profiles: HashMap<String, LanguageProfile>,
}

impl LanguageRegistry {
    pub fn from_specs(specs: &BTreeMap<String, LanguageSpec>) -> Result<Self, LanguageError> {
        let mut registry = Self::default();
        for (code, spec) in specs {
            registry.register(LanguageProfile::compile(code, spec)?);
        }
        Ok(registry)
    }

    pub fn register(&mut self, profile: LanguageProfile) {
        self.profiles.insert(profile.code.clone(), profile);
    }

    pub fn get(&self, code: &str) -> Option<&LanguageProfile> {
        self.profiles.get(&code.trim().to_ascii_lowercase())
    }

    pub fn supports(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Unsupported languages never report a verb.
    pub fn has_verb(&self, text: &str, lang: &str) -> bool {
        self.get(lang).is_some_and(|profile| profile.detect_verb(text))
    }

    pub fn scaffold(&self, task: &str, lang: &str) -> Option<&str> {
        self.get(lang).map(|profile| profile.scaffold(task))
    }

    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

pub fn builtin_languages() -> BTreeMap<String, LanguageSpec> {
    let mut languages = BTreeMap::new();
    languages.insert("es".to_string(), spanish());
    languages.insert("fr".to_string(), french());
    languages.insert("de".to_string(), german());
    languages.insert("ga".to_string(), irish());
    languages
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn rules(list: &[(&str, &str)]) -> Vec<ScaffoldRule> {
    list.iter()
        .map(|(keyword, example)| ScaffoldRule {
            keyword: keyword.to_string(),
            example: example.to_string(),
        })
        .collect()
}

fn spanish() -> LanguageSpec {
    LanguageSpec {
        verb_forms: words(&[
            "es", "soy", "eres", "somos", "sois", "son", "está", "estoy", "estás", "estamos",
            "están", "fui", "fue", "fuimos", "fueron", "era", "eras", "éramos", "eran", "hay",
            "había", "voy", "vas", "va", "vamos", "van", "iré", "tiene", "tengo", "tienes",
            "tenemos", "tienen", "gusta", "gustan", "encanta", "vivo", "vive", "viven", "juego",
            "juega", "hago", "hace", "llamo", "llama", "llevo", "lleva",
        ]),
        verb_endings: words(&[
            "aba", "abas", "ábamos", "aban", "ía", "ían", "amos", "emos", "imos", "aré", "eré",
            "iré", "ará", "erá", "irá", "ó", "ió", "aron", "ieron",
        ]),
        scaffolds: rules(&[
            ("town", "Mi pueblo es pequeño y tranquilo."),
            ("house", "Mi casa es pequeña y está en el centro."),
            ("subject", "Mi asignatura favorita es interesante."),
            ("weekend", "El fin de semana fui al cine con mis amigos."),
            ("family", "Mi madre es simpática."),
        ]),
        generic_example: "Mi amigo es simpático.".to_string(),
    }
}

fn french() -> LanguageSpec {
    LanguageSpec {
        verb_forms: words(&[
            "est", "suis", "es", "sommes", "êtes", "sont", "ai", "as", "a", "avons", "avez",
            "ont", "vais", "vas", "va", "allons", "allez", "vont", "était", "étais", "étaient",
            "fait", "fais", "font", "aime", "aimes", "aiment", "adore", "habite", "habitent",
            "joue", "jouent", "appelle",
        ]),
        verb_endings: words(&["ons", "ez", "ait", "aient", "ais", "ront"]),
        scaffolds: rules(&[
            ("town", "Ma ville est petite et calme."),
            ("house", "Ma maison est petite et elle est au centre."),
            ("subject", "Ma matière préférée est intéressante."),
            ("weekend", "Le week-end, je suis allé au cinéma avec mes amis."),
            ("family", "Ma mère est sympathique."),
        ]),
        generic_example: "Mon ami est sympathique.".to_string(),
    }
}

fn german() -> LanguageSpec {
    LanguageSpec {
        verb_forms: words(&[
            "ist", "bin", "bist", "sind", "seid", "war", "warst", "waren", "habe", "hast", "hat",
            "haben", "habt", "hatte", "hatten", "wohne", "wohnt", "gehe", "geht", "spiele",
            "spielt", "mag", "mögen", "heiße", "heißt", "gibt", "kann", "will", "finde", "findet",
            "mache", "macht", "fahre", "fährt", "liegt",
        ]),
        verb_endings: words(&["iert", "ierte", "ierst"]),
        scaffolds: rules(&[
            ("town", "Meine Stadt ist klein und ruhig."),
            ("house", "Mein Haus ist klein und liegt im Zentrum."),
            ("subject", "Mein Lieblingsfach ist interessant."),
            ("weekend", "Am Wochenende bin ich mit meinen Freunden ins Kino gegangen."),
            ("family", "Meine Mutter ist nett."),
        ]),
        generic_example: "Mein Freund ist nett.".to_string(),
    }
}

fn irish() -> LanguageSpec {
    LanguageSpec {
        verb_forms: words(&[
            "tá", "níl", "bhí", "bíonn", "beidh", "is", "ba", "chuaigh", "téim", "rinne",
            "déanaim", "thaitin", "taitníonn", "imrím", "itheann", "bhfuil",
        ]),
        verb_endings: words(&["aim", "ann", "eann", "fidh", "faidh", "aíonn", "íonn"]),
        scaffolds: rules(&[
            ("town", "Tá mo bhaile beag agus ciúin."),
            ("house", "Tá mo theach beag agus tá sé i lár an bhaile."),
            ("subject", "Is maith liom stair mar tá sí suimiúil."),
            ("weekend", "Ag an deireadh seachtaine chuaigh mé go dtí an phictiúrlann le mo chairde."),
            ("family", "Tá mo mháthair deas."),
        ]),
        generic_example: "Tá mo chara deas.".to_string(),
    }
}
