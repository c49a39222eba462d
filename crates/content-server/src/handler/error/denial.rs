//! Conversion of authorization denials into HTTP errors.

use content_auth::strategy::DenialReason;

use super::http_error::{Error, ErrorKind};

impl From<&DenialReason> for ErrorKind {
    fn from(reason: &DenialReason) -> Self {
        match reason {
            DenialReason::MissingCredential => Self::MissingAuthToken,
            DenialReason::AnonymousSubject
            | DenialReason::PolicyDenied
            | DenialReason::GroupMismatch => Self::Forbidden,
            DenialReason::InvalidApiKey
            | DenialReason::Verification(_)
            | DenialReason::AdminUnauthenticated => Self::Unauthorized,
        }
    }
}

impl From<DenialReason> for Error<'static> {
    fn from(reason: DenialReason) -> Self {
        ErrorKind::from(&reason).with_context(reason.code())
    }
}

#[cfg(test)]
mod tests {
    use content_auth::verify::VerificationError;

    use super::*;

    #[test]
    fn status_agrees_with_denial_reason() {
        let reasons = [
            DenialReason::MissingCredential,
            DenialReason::InvalidApiKey,
            DenialReason::Verification(VerificationError::Expired),
            DenialReason::AnonymousSubject,
            DenialReason::AdminUnauthenticated,
            DenialReason::PolicyDenied,
            DenialReason::GroupMismatch,
        ];

        for reason in reasons {
            assert_eq!(ErrorKind::from(&reason).status_code(), reason.status(), "{reason:?}");
        }
    }

    #[test]
    fn reason_stays_in_context() {
        let error = Error::from(DenialReason::PolicyDenied);
        assert_eq!(error.kind(), ErrorKind::Forbidden);
        assert_eq!(error.context(), Some("policy_denied"));
        assert_eq!(error.message(), None);
    }
}
