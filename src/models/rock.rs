use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Porosity {
    Low,
    Medium,
    High,
}

impl Porosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Porosity::Low => "Low",
            Porosity::Medium => "Medium",
            Porosity::High => "High",
        }
    }
}

impl std::fmt::Display for Porosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named rock groups known to the engine.
///
/// Porosity and wet-sensitivity are defined by exhaustive matches, so every
/// group has exactly one answer for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RockGroup {
    Granite,
    Gneiss,
    Basalt,
    Quartzite,
    Rhyolite,
    Limestone,
    Dolomite,
    Schist,
    Conglomerate,
    Gritstone,
    Sandstone,
    Tuff,
    /// Fallback for codes the catalog does not recognise
    Unclassified,
}

impl RockGroup {
    pub const ALL: [RockGroup; 13] = [
        RockGroup::Granite,
        RockGroup::Gneiss,
        RockGroup::Basalt,
        RockGroup::Quartzite,
        RockGroup::Rhyolite,
        RockGroup::Limestone,
        RockGroup::Dolomite,
        RockGroup::Schist,
        RockGroup::Conglomerate,
        RockGroup::Gritstone,
        RockGroup::Sandstone,
        RockGroup::Tuff,
        RockGroup::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RockGroup::Granite => "Granite",
            RockGroup::Gneiss => "Gneiss",
            RockGroup::Basalt => "Basalt",
            RockGroup::Quartzite => "Quartzite",
            RockGroup::Rhyolite => "Rhyolite",
            RockGroup::Limestone => "Limestone",
            RockGroup::Dolomite => "Dolomite",
            RockGroup::Schist => "Schist",
            RockGroup::Conglomerate => "Conglomerate",
            RockGroup::Gritstone => "Gritstone",
            RockGroup::Sandstone => "Sandstone",
            RockGroup::Tuff => "Tuff",
            RockGroup::Unclassified => "Rock",
        }
    }

    pub fn porosity(&self) -> Porosity {
        match self {
            RockGroup::Granite
            | RockGroup::Gneiss
            | RockGroup::Basalt
            | RockGroup::Quartzite
            | RockGroup::Rhyolite => Porosity::Low,
            RockGroup::Limestone
            | RockGroup::Dolomite
            | RockGroup::Schist
            | RockGroup::Conglomerate
            | RockGroup::Unclassified => Porosity::Medium,
            RockGroup::Gritstone | RockGroup::Sandstone | RockGroup::Tuff => Porosity::High,
        }
    }

    /// Rock that loses holds or crumbles when climbed before it has dried
    pub fn is_wet_sensitive(&self) -> bool {
        match self {
            RockGroup::Sandstone | RockGroup::Tuff => true,
            RockGroup::Granite
            | RockGroup::Gneiss
            | RockGroup::Basalt
            | RockGroup::Quartzite
            | RockGroup::Rhyolite
            | RockGroup::Limestone
            | RockGroup::Dolomite
            | RockGroup::Schist
            | RockGroup::Conglomerate
            | RockGroup::Gritstone
            | RockGroup::Unclassified => false,
        }
    }

    pub fn profile(&self) -> RockTypeProfile {
        RockTypeProfile {
            group: *self,
            porosity: self.porosity(),
            name: self.as_str(),
            wet_sensitive: self.is_wet_sensitive(),
        }
    }
}

impl std::fmt::Display for RockGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RockTypeProfile {
    pub group: RockGroup,
    pub porosity: Porosity,
    pub name: &'static str,
    pub wet_sensitive: bool,
}

/// Result of a catalog lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RockClassification {
    pub profile: RockTypeProfile,
    /// True when the code was unknown or missing and the generic profile was substituted
    pub assumed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wet_sensitive_groups() {
        let sensitive: Vec<RockGroup> = RockGroup::ALL
            .into_iter()
            .filter(|g| g.is_wet_sensitive())
            .collect();
        assert_eq!(sensitive, vec![RockGroup::Sandstone, RockGroup::Tuff]);
    }

    #[test]
    fn porosity_ordering() {
        assert!(Porosity::Low < Porosity::Medium);
        assert!(Porosity::Medium < Porosity::High);
        assert_eq!(RockGroup::Granite.porosity(), Porosity::Low);
        assert_eq!(RockGroup::Sandstone.porosity(), Porosity::High);
        assert_eq!(RockGroup::Unclassified.porosity(), Porosity::Medium);
    }

    #[test]
    fn profile_matches_group() {
        for group in RockGroup::ALL {
            let profile = group.profile();
            assert_eq!(profile.group, group);
            assert_eq!(profile.porosity, group.porosity());
            assert_eq!(profile.wet_sensitive, group.is_wet_sensitive());
            assert_eq!(profile.name, group.as_str());
        }
    }
}
