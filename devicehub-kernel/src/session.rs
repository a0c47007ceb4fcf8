/**
 * SESSIONS - Contrôle exclusif d'un device par un seul utilisateur
 *
 * RÔLE :
 * Un device n'accepte des updates que de l'utilisateur qui détient sa
 * session. La session est un bail : elle expire si le détenteur reste
 * inactif plus longtemps que la durée configurée, et un admin du projet
 * peut la révoquer de force.
 *
 * RÈGLES :
 * - start : pas de détenteur → le demandeur devient détenteur
 *           détenteur = demandeur → renouvellement (idempotent)
 *           autre détenteur, bail valide → conflit
 *           autre détenteur, bail expiré → reprise par le demandeur
 * - submit : réservé au détenteur (renouvelle le bail)
 * - stop : réservé au détenteur, sans détenteur c'est un no-op
 */

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSession {
    pub user: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub lease_expires_at: Option<OffsetDateTime>,
}

impl DeviceSession {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.lease_expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionGrant {
    Started,
    Renewed,
    TakenOver { previous: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session already started for this device with other user.")]
    HeldByOther,
    #[error("Logged in user is not in current session with this device.")]
    NotHolder,
    #[error("Cannot stop session you didn't start")]
    CannotStop,
}

/// Politique de bail appliquée à toutes les sessions
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// `None` : la session ne expire jamais d'elle-même
    pub lease: Option<Duration>,
}

impl SessionPolicy {
    pub fn new(lease: Option<Duration>) -> Self {
        Self { lease }
    }

    fn lease_from(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        self.lease.and_then(|lease| now.checked_add(lease))
    }

    pub fn start(
        &self,
        slot: &mut Option<DeviceSession>,
        user: &str,
        now: OffsetDateTime,
    ) -> Result<SessionGrant, SessionError> {
        let grant = match slot.as_mut() {
            Some(session) if session.user == user => {
                session.lease_expires_at = self.lease_from(now);
                return Ok(SessionGrant::Renewed);
            }
            Some(session) if !session.is_expired(now) => return Err(SessionError::HeldByOther),
            Some(session) => SessionGrant::TakenOver { previous: session.user.clone() },
            None => SessionGrant::Started,
        };
        *slot = Some(DeviceSession {
            user: user.to_string(),
            started_at: now,
            lease_expires_at: self.lease_from(now),
        });
        Ok(grant)
    }

    /// Autorise une soumission d'update et renouvelle le bail du détenteur
    pub fn authorize(
        &self,
        slot: &mut Option<DeviceSession>,
        user: &str,
        now: OffsetDateTime,
    ) -> Result<(), SessionError> {
        match slot.as_mut() {
            Some(session) if session.user == user => {
                session.lease_expires_at = self.lease_from(now);
                Ok(())
            }
            _ => Err(SessionError::NotHolder),
        }
    }

    pub fn stop(
        &self,
        slot: &mut Option<DeviceSession>,
        user: &str,
    ) -> Result<Option<DeviceSession>, SessionError> {
        match slot {
            None => Ok(None),
            Some(session) if session.user == user => Ok(slot.take()),
            Some(_) => Err(SessionError::CannotStop),
        }
    }

    pub fn revoke(&self, slot: &mut Option<DeviceSession>) -> Option<DeviceSession> {
        slot.take()
    }
}

pub fn is_holder(slot: &Option<DeviceSession>, user: &str) -> bool {
    slot.as_ref().map(|s| s.user == user).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

    fn policy() -> SessionPolicy {
        SessionPolicy::new(Some(Duration::minutes(10)))
    }

    #[test]
    fn test_first_writer_wins() {
        let mut slot = None;
        assert_eq!(policy().start(&mut slot, "a@x.io", T0), Ok(SessionGrant::Started));
        assert_eq!(policy().start(&mut slot, "b@x.io", T0), Err(SessionError::HeldByOther));
        assert_eq!(slot.as_ref().unwrap().user, "a@x.io");
    }

    #[test]
    fn test_reentry_renews_lease() {
        let mut slot = None;
        policy().start(&mut slot, "a@x.io", T0).unwrap();
        let later = T0 + Duration::minutes(5);
        assert_eq!(policy().start(&mut slot, "a@x.io", later), Ok(SessionGrant::Renewed));
        let session = slot.unwrap();
        assert_eq!(session.started_at, T0);
        assert_eq!(session.lease_expires_at, Some(later + Duration::minutes(10)));
    }

    #[test]
    fn test_expired_lease_can_be_taken_over() {
        let mut slot = None;
        policy().start(&mut slot, "a@x.io", T0).unwrap();
        let grant = policy().start(&mut slot, "b@x.io", T0 + Duration::minutes(11)).unwrap();
        assert_eq!(grant, SessionGrant::TakenOver { previous: "a@x.io".into() });
        assert!(is_holder(&slot, "b@x.io"));
    }

    #[test]
    fn test_no_lease_never_expires() {
        let mut slot = None;
        let forever = SessionPolicy::new(None);
        forever.start(&mut slot, "a@x.io", T0).unwrap();
        let much_later = T0 + Duration::days(365);
        assert_eq!(forever.start(&mut slot, "b@x.io", much_later), Err(SessionError::HeldByOther));
    }

    #[test]
    fn test_lease_past_the_calendar_never_expires() {
        let mut slot = None;
        SessionPolicy::new(Some(Duration::MAX)).start(&mut slot, "a@x.io", T0).unwrap();
        let session = slot.unwrap();
        assert_eq!(session.lease_expires_at, None);
        assert!(!session.is_expired(T0 + Duration::weeks(52 * 100)));
    }

    #[test]
    fn test_only_holder_submits_and_stops() {
        let mut slot = None;
        assert_eq!(policy().authorize(&mut slot, "a@x.io", T0), Err(SessionError::NotHolder));
        policy().start(&mut slot, "a@x.io", T0).unwrap();
        assert_eq!(policy().authorize(&mut slot, "b@x.io", T0), Err(SessionError::NotHolder));
        assert!(policy().authorize(&mut slot, "a@x.io", T0).is_ok());
        assert_eq!(policy().stop(&mut slot, "b@x.io"), Err(SessionError::CannotStop));
        assert!(policy().stop(&mut slot, "a@x.io").unwrap().is_some());
        assert!(slot.is_none());
        assert_eq!(policy().stop(&mut slot, "b@x.io"), Ok(None));
    }

    #[test]
    fn test_revoke() {
        let mut slot = None;
        policy().start(&mut slot, "a@x.io", T0).unwrap();
        assert_eq!(policy().revoke(&mut slot).unwrap().user, "a@x.io");
        assert!(slot.is_none());
    }
}
