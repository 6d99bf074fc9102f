//! Lifecycle states of a request controller.

/// Current lifecycle phase of a [`RequestController`](super::RequestController).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// No request has been issued, or the last one was aborted or reset.
    #[default]
    None,
    /// A request was issued and no response bytes have arrived yet.
    Pending,
    /// Response bytes are arriving.
    Processing,
    /// The response was received completely.
    Completed,
    /// The request failed at the transport level.
    Error,
}

impl RequestState {
    /// Whether a request is outstanding in this state.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Whether this is the outcome of a request that ran to its end.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// ```text
    /// None -> Pending
    /// Pending | Processing -> Processing | Completed | Error
    /// any -> None
    /// ```
    pub fn can_transition_to(self, next: Self) -> bool {
        match next {
            Self::None => true,
            Self::Pending => self == Self::None,
            Self::Processing | Self::Completed | Self::Error => self.is_busy(),
        }
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Pending => write!(f, "Pending"),
            Self::Processing => write!(f, "Processing"),
            Self::Completed => write!(f, "Completed"),
            Self::Error => write!(f, "Error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [RequestState; 5] = [
        RequestState::None,
        RequestState::Pending,
        RequestState::Processing,
        RequestState::Completed,
        RequestState::Error,
    ];

    #[test]
    fn test_busy_states() {
        let busy: Vec<_> = ALL.into_iter().filter(|s| s.is_busy()).collect();
        assert_eq!(busy, vec![RequestState::Pending, RequestState::Processing]);
    }

    #[test]
    fn test_every_state_can_reset() {
        for state in ALL {
            assert!(state.can_transition_to(RequestState::None));
        }
    }

    #[test]
    fn test_pending_only_from_none() {
        for state in ALL {
            assert_eq!(
                state.can_transition_to(RequestState::Pending),
                state == RequestState::None
            );
        }
    }

    #[test]
    fn test_outcomes_only_from_busy() {
        for state in ALL {
            for next in [
                RequestState::Processing,
                RequestState::Completed,
                RequestState::Error,
            ] {
                assert_eq!(state.can_transition_to(next), state.is_busy());
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(RequestState::Processing.to_string(), "Processing");
        assert_eq!(RequestState::default(), RequestState::None);
    }
}
