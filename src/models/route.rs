use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hemisphere {
    Northern,
    Southern,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn hemisphere(&self) -> Hemisphere {
        if self.latitude < 0.0 {
            Hemisphere::Southern
        } else {
            Hemisphere::Northern
        }
    }

    /// Weather cell for this point: coordinates rounded to 0.01°.
    /// Routes in the same cell share one weather series.
    pub fn grid_key(&self) -> (i64, i64) {
        (
            (self.latitude * 100.0).round() as i64,
            (self.longitude * 100.0).round() as i64,
        )
    }
}

/// Compass aspect of the exposed face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aspect {
    #[serde(rename = "N", alias = "north")]
    North,
    #[serde(rename = "NE", alias = "northeast")]
    NorthEast,
    #[serde(rename = "E", alias = "east")]
    East,
    #[serde(rename = "SE", alias = "southeast")]
    SouthEast,
    #[serde(rename = "S", alias = "south")]
    South,
    #[serde(rename = "SW", alias = "southwest")]
    SouthWest,
    #[serde(rename = "W", alias = "west")]
    West,
    #[serde(rename = "NW", alias = "northwest")]
    NorthWest,
}

impl Aspect {
    pub const ALL: [Aspect; 8] = [
        Aspect::North,
        Aspect::NorthEast,
        Aspect::East,
        Aspect::SouthEast,
        Aspect::South,
        Aspect::SouthWest,
        Aspect::West,
        Aspect::NorthWest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::North => "N",
            Aspect::NorthEast => "NE",
            Aspect::East => "E",
            Aspect::SouthEast => "SE",
            Aspect::South => "S",
            Aspect::SouthWest => "SW",
            Aspect::West => "W",
            Aspect::NorthWest => "NW",
        }
    }

    pub fn bearing_degrees(&self) -> f64 {
        match self {
            Aspect::North => 0.0,
            Aspect::NorthEast => 45.0,
            Aspect::East => 90.0,
            Aspect::SouthEast => 135.0,
            Aspect::South => 180.0,
            Aspect::SouthWest => 225.0,
            Aspect::West => 270.0,
            Aspect::NorthWest => 315.0,
        }
    }

    /// Snap a bearing to the nearest of the eight compass points
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        if !degrees.is_finite() {
            return None;
        }
        let normalized = degrees.rem_euclid(360.0);
        let index = ((normalized / 45.0).round() as usize) % 8;
        Some(Self::ALL[index])
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' ', '_'], "").as_str() {
            "n" | "north" => Some(Aspect::North),
            "ne" | "northeast" => Some(Aspect::NorthEast),
            "e" | "east" => Some(Aspect::East),
            "se" | "southeast" => Some(Aspect::SouthEast),
            "s" | "south" => Some(Aspect::South),
            "sw" | "southwest" => Some(Aspect::SouthWest),
            "w" | "west" => Some(Aspect::West),
            "nw" | "northwest" => Some(Aspect::NorthWest),
            other => other.parse::<f64>().ok().and_then(Self::from_degrees),
        }
    }

    /// How squarely the face points at the equator: 1.0 facing it, 0.0 facing the pole.
    pub fn equatorward_exposure(&self, hemisphere: Hemisphere) -> f64 {
        let equator_bearing = match hemisphere {
            Hemisphere::Northern => 180.0,
            Hemisphere::Southern => 0.0,
        };
        let delta = (self.bearing_degrees() - equator_bearing).to_radians();
        (1.0 + delta.cos()) / 2.0
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimbingRoute {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub area_id: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub rock_type: Option<String>,
    #[serde(default)]
    pub aspect: Option<Aspect>,
}

impl ClimbingRoute {
    pub fn new(id: impl Into<String>, area_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            area_id: area_id.into(),
            location: None,
            rock_type: None,
            aspect: None,
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some(GeoPoint::new(latitude, longitude));
        self
    }

    pub fn with_rock_type(mut self, rock_type: impl Into<String>) -> Self {
        self.rock_type = Some(rock_type.into());
        self
    }

    pub fn with_aspect(mut self, aspect: Aspect) -> Self {
        self.aspect = Some(aspect);
        self
    }

    /// Location usable for weather lookup, if the route has valid GPS data
    pub fn usable_location(&self) -> Option<GeoPoint> {
        self.location.filter(|p| p.is_valid())
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}
