use crate::state::ManagerState;
use cyclekeep_remote::CreateResourceReply;
use cyclekeep_schema::{AccountId, ResourceId, ResourceView};
use tracing::{debug, info};

/// Something that happened to the manager. Async outcomes are carried as
/// stringified errors so events stay plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CreateStarted,
    CreateSettled {
        /// Account that issued the create; a result for any other account
        /// is stale.
        account: AccountId,
        nickname: String,
        outcome: Result<CreateResourceReply, String>,
    },
    /// The create request was dropped before it settled.
    CreateAbandoned {
        account: AccountId,
    },
    QuotaRead {
        id: ResourceId,
        outcome: Result<u64, String>,
    },
    LoggedOut,
}

impl ManagerState {
    /// The one transition function. Total over every (state, event) pair:
    /// events that make no sense for the current state leave it unchanged.
    #[must_use]
    pub fn apply(self, event: Event) -> ManagerState {
        let (identity, mut resources, mut error, mut creating) = match self {
            ManagerState::Initialized {
                identity,
                resources,
                error,
                creating,
            } => (identity, resources, error, creating),
            other => {
                return match event {
                    Event::LoggedOut => ManagerState::Uninitialized,
                    _ => {
                        debug!("ignoring {} event in {} state", event_name(&event), other.kind());
                        other
                    }
                };
            }
        };

        match event {
            Event::LoggedOut => {
                info!("logged out of {}", identity.account);
                return ManagerState::Uninitialized;
            }
            Event::CreateStarted => {
                creating = true;
                error.clear();
            }
            Event::CreateSettled {
                account,
                nickname,
                outcome,
            } => {
                if account != identity.account {
                    debug!("dropping create result for stale account {account}");
                } else {
                    creating = false;
                    match outcome {
                        Ok(reply) if reply.success => {
                            let id = reply.resource_id.unwrap_or_default();
                            info!("created resource {id} ({nickname})");
                            resources.push(ResourceView::pending(nickname, id));
                        }
                        Ok(reply) => error = reply.message,
                        Err(message) => error = message,
                    }
                }
            }
            Event::CreateAbandoned { account } => {
                if account == identity.account {
                    debug!("create abandoned before it settled");
                    creating = false;
                }
            }
            Event::QuotaRead { id, outcome } => {
                let mut matched = false;
                for view in resources.iter_mut().filter(|r| r.id == id) {
                    matched = true;
                    view.loading = false;
                    match &outcome {
                        Ok(remaining) => {
                            view.remaining_quota = *remaining;
                            view.error.clear();
                        }
                        Err(message) => view.error.clone_from(message),
                    }
                }
                if !matched {
                    debug!("dropping quota reading for unknown resource {id}");
                }
            }
        }

        ManagerState::Initialized {
            identity,
            resources,
            error,
            creating,
        }
    }
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::CreateStarted => "create-started",
        Event::CreateSettled { .. } => "create-settled",
        Event::CreateAbandoned { .. } => "create-abandoned",
        Event::QuotaRead { .. } => "quota-read",
        Event::LoggedOut => "logged-out",
    }
}
