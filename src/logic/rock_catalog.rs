use crate::models::{RockClassification, RockGroup};
use std::collections::HashMap;

/// Built-in rock-type codes, matched after normalisation
const BUILTIN_CODES: &[(&str, RockGroup)] = &[
    ("granite", RockGroup::Granite),
    ("granodiorite", RockGroup::Granite),
    ("monzonite", RockGroup::Granite),
    ("diorite", RockGroup::Granite),
    ("gabbro", RockGroup::Granite),
    ("gneiss", RockGroup::Gneiss),
    ("migmatite", RockGroup::Gneiss),
    ("basalt", RockGroup::Basalt),
    ("andesite", RockGroup::Basalt),
    ("dolerite", RockGroup::Basalt),
    ("diabase", RockGroup::Basalt),
    ("quartzite", RockGroup::Quartzite),
    ("rhyolite", RockGroup::Rhyolite),
    ("welded tuff", RockGroup::Rhyolite),
    ("limestone", RockGroup::Limestone),
    ("travertine", RockGroup::Limestone),
    ("marble", RockGroup::Limestone),
    ("dolomite", RockGroup::Dolomite),
    ("dolostone", RockGroup::Dolomite),
    ("schist", RockGroup::Schist),
    ("slate", RockGroup::Schist),
    ("phyllite", RockGroup::Schist),
    ("conglomerate", RockGroup::Conglomerate),
    ("breccia", RockGroup::Conglomerate),
    ("gritstone", RockGroup::Gritstone),
    ("grit", RockGroup::Gritstone),
    ("millstone grit", RockGroup::Gritstone),
    ("sandstone", RockGroup::Sandstone),
    ("quartz sandstone", RockGroup::Sandstone),
    ("desert sandstone", RockGroup::Sandstone),
    ("arkose", RockGroup::Sandstone),
    ("tuff", RockGroup::Tuff),
    ("volcanic tuff", RockGroup::Tuff),
    ("ignimbrite", RockGroup::Tuff),
];

/// Static lookup from rock-type codes to rock profiles.
///
/// Loaded once at startup; lookups never fail.
#[derive(Debug, Clone)]
pub struct RockTypeCatalog {
    codes: HashMap<String, RockGroup>,
}

impl RockTypeCatalog {
    pub fn new() -> Self {
        let codes = BUILTIN_CODES
            .iter()
            .map(|(code, group)| (normalize_code(code), *group))
            .collect();
        Self { codes }
    }

    /// Built-in table extended with configured aliases; aliases win on conflict
    pub fn with_aliases<'a>(
        aliases: impl IntoIterator<Item = (&'a String, &'a RockGroup)>,
    ) -> Self {
        let mut catalog = Self::new();
        for (code, group) in aliases {
            catalog.codes.insert(normalize_code(code), *group);
        }
        catalog
    }

    pub fn classify(&self, code: &str) -> RockClassification {
        match self.codes.get(&normalize_code(code)) {
            Some(group) => RockClassification {
                profile: group.profile(),
                assumed: false,
            },
            None => {
                tracing::debug!(code, "Unknown rock type - assuming generic porous rock");
                Self::assumed()
            }
        }
    }

    pub fn classify_optional(&self, code: Option<&str>) -> RockClassification {
        match code {
            Some(code) if !code.trim().is_empty() => self.classify(code),
            _ => Self::assumed(),
        }
    }

    fn assumed() -> RockClassification {
        RockClassification {
            profile: RockGroup::Unclassified.profile(),
            assumed: true,
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for RockTypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .collect()
}
