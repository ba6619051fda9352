use serde::{Deserialize, Serialize};

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Home contestant.
    Home,
    /// Away contestant.
    Away,
}

/// Stable identity of a contestant, either a single player or a whole team.
///
/// Both variants drive the same engine; the tag only tells consumers which
/// kind of record the identifier points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContestantIdentity {
    /// One-on-one match participant.
    Player {
        /// Opaque identifier owned by the external system.
        id: String,
        /// Name shown to officials and spectators.
        name: String,
    },
    /// Team match participant.
    Team {
        /// Opaque identifier owned by the external system.
        id: String,
        /// Name shown to officials and spectators.
        name: String,
    },
}

impl ContestantIdentity {
    /// Build a player identity.
    pub fn player(id: impl Into<String>, name: impl Into<String>) -> Self {
        ContestantIdentity::Player {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Build a team identity.
    pub fn team(id: impl Into<String>, name: impl Into<String>) -> Self {
        ContestantIdentity::Team {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Opaque identifier.
    pub fn id(&self) -> &str {
        match self {
            ContestantIdentity::Player { id, .. } | ContestantIdentity::Team { id, .. } => id,
        }
    }

    /// Display name.
    pub fn display_name(&self) -> &str {
        match self {
            ContestantIdentity::Player { name, .. } | ContestantIdentity::Team { name, .. } => name,
        }
    }
}

/// Running tally for one contestant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestantScore {
    /// Points scored, never negative.
    pub points: u32,
    /// Fouls committed.
    pub fouls: u32,
}

impl ContestantScore {
    /// Build a score seeded with existing values.
    pub fn new(points: u32, fouls: u32) -> Self {
        Self { points, fouls }
    }

    /// Apply a signed point delta, clamping the result at zero.
    pub fn apply_points(&mut self, delta: i32) {
        self.points = if delta >= 0 {
            self.points.saturating_add(delta.unsigned_abs())
        } else {
            self.points.saturating_sub(delta.unsigned_abs())
        };
    }

    /// Record one more foul.
    pub fn add_foul(&mut self) {
        self.fouls = self.fouls.saturating_add(1);
    }
}

/// A value held once per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sides<T> {
    /// Home side value.
    pub home: T,
    /// Away side value.
    pub away: T,
}

impl<T> Sides<T> {
    /// Pair up home and away values.
    pub fn new(home: T, away: T) -> Self {
        Self { home, away }
    }

    /// Borrow the value for `side`.
    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    /// Mutably borrow the value for `side`.
    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Home => &mut self.home,
            Side::Away => &mut self.away,
        }
    }
}
