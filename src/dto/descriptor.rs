use serde::Deserialize;
use validator::Validate;

use crate::{
    config::MAX_DURATION_SECONDS,
    dto::validation::validate_contestant_id,
    error::DescriptorError,
    state::{ContestantIdentity, ContestantScore, SessionDescriptor},
};

/// Payload describing a session to open.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SessionDescriptorInput {
    #[validate(nested)]
    pub home: ContestantInput,
    #[validate(nested)]
    pub away: ContestantInput,
    /// If omitted, the configured default duration is used.
    #[serde(default)]
    #[validate(range(min = 1, max = MAX_DURATION_SECONDS))]
    pub duration_seconds: Option<u32>,
    /// Scores recorded elsewhere before this session took over.
    #[serde(default)]
    pub starting_score: Option<StartingScoreInput>,
}

/// Whether a contestant is a single player or a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestantKind {
    Player,
    Team,
}

/// Incoming contestant definition.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContestantInput {
    pub kind: ContestantKind,
    #[validate(custom(function = "validate_contestant_id"))]
    pub id: String,
    #[validate(length(min = 1, max = 80))]
    pub name: String,
}

/// Points and fouls to resume from.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ScoreInput {
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub fouls: u32,
}

/// Starting tallies for both sides.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StartingScoreInput {
    #[serde(default)]
    pub home: ScoreInput,
    #[serde(default)]
    pub away: ScoreInput,
}

impl ContestantInput {
    /// Convenience constructor for a player.
    pub fn player(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ContestantKind::Player,
            id: id.into(),
            name: name.into(),
        }
    }

    /// Convenience constructor for a team.
    pub fn team(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ContestantKind::Team,
            id: id.into(),
            name: name.into(),
        }
    }
}

impl From<ContestantInput> for ContestantIdentity {
    fn from(value: ContestantInput) -> Self {
        match value.kind {
            ContestantKind::Player => ContestantIdentity::player(value.id, value.name),
            ContestantKind::Team => ContestantIdentity::team(value.id, value.name),
        }
    }
}

impl From<ScoreInput> for ContestantScore {
    fn from(value: ScoreInput) -> Self {
        ContestantScore::new(value.points, value.fouls)
    }
}

impl SessionDescriptorInput {
    /// Convert into a domain descriptor. Callers are expected to have run
    /// [`Validate::validate`] first.
    pub fn into_descriptor(
        self,
        default_duration_seconds: u32,
    ) -> Result<SessionDescriptor, DescriptorError> {
        let duration = self.duration_seconds.unwrap_or(default_duration_seconds);

        let mut descriptor =
            SessionDescriptor::new(self.home.into(), self.away.into())?.with_duration(duration);
        if let Some(StartingScoreInput { home, away }) = self.starting_score {
            descriptor = descriptor.with_starting_scores(home.into(), away.into());
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Side;

    fn parse(json: &str) -> SessionDescriptorInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_a_team_match_with_starting_score() {
        let input = parse(
            r#"{
                "home": { "kind": "team", "id": "t-1", "name": "Harbor Hawks" },
                "away": { "kind": "team", "id": "t-2", "name": "Ridge Runners" },
                "duration_seconds": 480,
                "starting_score": { "home": { "points": 12, "fouls": 3 } }
            }"#,
        );
        assert!(input.validate().is_ok());

        let descriptor = input.into_descriptor(600).unwrap();
        assert_eq!(
            descriptor.identities().get(Side::Home),
            &ContestantIdentity::team("t-1", "Harbor Hawks")
        );
        let session = crate::state::ScoreSession::new(descriptor).unwrap();
        assert_eq!(session.clock().remaining_seconds, 480);
        assert_eq!(session.score(Side::Home), ContestantScore::new(12, 3));
        assert_eq!(session.score(Side::Away), ContestantScore::default());
    }

    #[test]
    fn missing_duration_uses_default() {
        let input = parse(
            r#"{
                "home": { "kind": "player", "id": "p-1", "name": "Ada" },
                "away": { "kind": "player", "id": "p-2", "name": "Bo" }
            }"#,
        );
        let session = crate::state::ScoreSession::new(input.into_descriptor(300).unwrap()).unwrap();
        assert_eq!(session.clock().remaining_seconds, 300);
    }

    #[test]
    fn rejects_bad_fields() {
        let input = SessionDescriptorInput {
            home: ContestantInput::player("p 1", "Ada"),
            away: ContestantInput::player("p-2", ""),
            duration_seconds: Some(0),
            starting_score: None,
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.errors();
        assert!(fields.contains_key("home"));
        assert!(fields.contains_key("away"));
        assert!(fields.contains_key("duration_seconds"));
    }

    #[test]
    fn duplicate_ids_fail_conversion() {
        let input = SessionDescriptorInput {
            home: ContestantInput::team("same", "A"),
            away: ContestantInput::team("same", "B"),
            duration_seconds: None,
            starting_score: None,
        };
        assert!(input.validate().is_ok());
        assert!(matches!(
            input.into_descriptor(600),
            Err(DescriptorError::DuplicateContestant(_))
        ));
    }
}
