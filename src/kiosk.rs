// Kiosk wizard - the area -> entry -> confirm flow as an explicit state
// machine. Each session is correlated by a token; the HTTP/session
// plumbing that carries the token is a collaborator concern.

use thiserror::Error;
use uuid::Uuid;

use crate::db::StorageError;
use crate::directory::Directory;
use crate::movements::{MovementEvent, MovementService};
use crate::notify::{CheckinNotice, Notifier};

/// Wizard-level rejections. These are user-facing prompts to retry, not
/// failures - except `Storage`, which the UI must surface as "not
/// recorded".
#[derive(Debug, Error)]
pub enum KioskError {
    #[error("'{0}' is not one of the configured areas")]
    UnknownArea(String),

    #[error("no area selected yet")]
    NoAreaSelected,

    #[error("'{0}' could not be matched to a card or name")]
    UnmatchedEntry(String),

    #[error("nothing to confirm yet")]
    NothingToConfirm,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskState {
    AwaitingArea,
    AwaitingEntry {
        area: String,
    },
    AwaitingConfirmation {
        area: String,
        name: String,
        raw_input: String,
    },
}

/// One kiosk session: a token plus where the visitor is in the wizard.
pub struct KioskSession {
    token: String,
    areas: Vec<String>,
    state: KioskState,
}

impl KioskSession {
    pub fn new(areas: Vec<String>) -> Self {
        KioskSession {
            token: Uuid::new_v4().to_string(),
            areas,
            state: KioskState::AwaitingArea,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn state(&self) -> &KioskState {
        &self.state
    }

    pub fn areas(&self) -> &[String] {
        &self.areas
    }

    /// Pins the session to one of the configured areas.
    pub fn select_area(&mut self, area: &str) -> Result<(), KioskError> {
        if !self.areas.iter().any(|a| a == area) {
            return Err(KioskError::UnknownArea(area.to_string()));
        }
        self.state = KioskState::AwaitingEntry {
            area: area.to_string(),
        };
        Ok(())
    }

    /// Resolves a card scan or typed name against the directory. An
    /// unmatched entry leaves the state unchanged so the visitor can
    /// retry.
    pub fn submit_entry(
        &mut self,
        entry: &str,
        directory: &Directory,
    ) -> Result<&KioskState, KioskError> {
        let area = match &self.state {
            KioskState::AwaitingEntry { area }
            | KioskState::AwaitingConfirmation { area, .. } => area.clone(),
            KioskState::AwaitingArea => return Err(KioskError::NoAreaSelected),
        };

        let trimmed = entry.trim();
        match directory.resolve(trimmed) {
            Some(name) => {
                self.state = KioskState::AwaitingConfirmation {
                    area,
                    name,
                    raw_input: trimmed.to_string(),
                };
                Ok(&self.state)
            }
            None => Err(KioskError::UnmatchedEntry(trimmed.to_string())),
        }
    }

    /// Records the movement and returns to the entry screen for the next
    /// visitor. Persistence happens first; a notifier failure is logged
    /// and the recorded event stands.
    pub fn confirm(
        &mut self,
        direction: &str,
        movements: &MovementService,
        notifier: &dyn Notifier,
    ) -> Result<MovementEvent, KioskError> {
        let (area, name, raw_input) = match &self.state {
            KioskState::AwaitingConfirmation {
                area,
                name,
                raw_input,
            } => (area.clone(), name.clone(), raw_input.clone()),
            _ => return Err(KioskError::NothingToConfirm),
        };

        let event = movements.record_event(&name, &area, direction, Some(raw_input.as_str()))?;

        let notice = CheckinNotice {
            name: event.name.clone(),
            area: event.area.clone(),
            direction: event.direction,
            occurred_at: event.recorded_at,
        };
        if let Err(err) = notifier.notify(&notice) {
            tracing::warn!(error = %err, "check-in notification failed");
        }

        self.state = KioskState::AwaitingEntry { area };
        Ok(event)
    }

    /// Abandons a pending confirmation, staying on the selected area.
    pub fn cancel(&mut self) {
        if let KioskState::AwaitingConfirmation { area, .. } = &self.state {
            self.state = KioskState::AwaitingEntry { area: area.clone() };
        }
    }

    /// Returns the session to area selection.
    pub fn reset(&mut self) {
        self.state = KioskState::AwaitingArea;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MovementStore;
    use crate::directory::{DirectoryRow, DirectorySource};
    use crate::movements::Direction;
    use crate::notify::LogNotifier;

    fn directory() -> Directory {
        Directory::load(DirectorySource::Rows(vec![DirectoryRow::new(
            "Doe, Jane",
            vec!["AB12".to_string()],
        )]))
        .unwrap()
    }

    fn movements() -> MovementService {
        MovementService::new(MovementStore::open_in_memory().unwrap())
    }

    fn session() -> KioskSession {
        KioskSession::new(vec!["Reception".to_string(), "Wellbeing".to_string()])
    }

    #[test]
    fn test_full_wizard_flow_records_event() {
        let directory = directory();
        let movements = movements();
        let mut session = session();

        session.select_area("Reception").unwrap();
        session.submit_entry(" AB12 ", &directory).unwrap();
        assert!(matches!(
            session.state(),
            KioskState::AwaitingConfirmation { name, .. } if name == "Jane Doe"
        ));

        let event = session.confirm("in", &movements, &LogNotifier).unwrap();
        assert_eq!(event.name, "Jane Doe");
        assert_eq!(event.area, "Reception");
        assert_eq!(event.direction, Direction::In);
        assert_eq!(event.raw_input.as_deref(), Some("AB12"));

        // Back on the entry screen for the next visitor, same area
        assert_eq!(
            session.state(),
            &KioskState::AwaitingEntry {
                area: "Reception".to_string()
            }
        );
        assert_eq!(movements.store().count().unwrap(), 1);
    }

    #[test]
    fn test_unknown_area_is_rejected() {
        let mut session = session();
        let err = session.select_area("Gym").unwrap_err();

        assert!(matches!(err, KioskError::UnknownArea(_)));
        assert_eq!(session.state(), &KioskState::AwaitingArea);
    }

    #[test]
    fn test_entry_requires_area() {
        let directory = directory();
        let mut session = session();

        let err = session.submit_entry("AB12", &directory).unwrap_err();
        assert!(matches!(err, KioskError::NoAreaSelected));
    }

    #[test]
    fn test_unmatched_entry_keeps_state_for_retry() {
        let directory = directory();
        let mut session = session();
        session.select_area("Reception").unwrap();

        let err = session.submit_entry("zz99", &directory).unwrap_err();
        assert!(matches!(err, KioskError::UnmatchedEntry(_)));
        assert_eq!(
            session.state(),
            &KioskState::AwaitingEntry {
                area: "Reception".to_string()
            }
        );

        // Retry with the typed name succeeds
        session.submit_entry("Jane Doe", &directory).unwrap();
        assert!(matches!(
            session.state(),
            KioskState::AwaitingConfirmation { .. }
        ));
    }

    #[test]
    fn test_confirm_without_entry_is_rejected() {
        let movements = movements();
        let mut session = session();
        session.select_area("Reception").unwrap();

        let err = session.confirm("in", &movements, &LogNotifier).unwrap_err();
        assert!(matches!(err, KioskError::NothingToConfirm));
        assert_eq!(movements.store().count().unwrap(), 0);
    }

    #[test]
    fn test_cancel_and_reset() {
        let directory = directory();
        let mut session = session();
        session.select_area("Reception").unwrap();
        session.submit_entry("AB12", &directory).unwrap();

        session.cancel();
        assert_eq!(
            session.state(),
            &KioskState::AwaitingEntry {
                area: "Reception".to_string()
            }
        );

        session.reset();
        assert_eq!(session.state(), &KioskState::AwaitingArea);
    }

    #[test]
    fn test_sessions_have_distinct_tokens() {
        assert_ne!(session().token(), session().token());
    }
}
