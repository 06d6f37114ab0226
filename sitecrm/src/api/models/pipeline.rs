//! Pipeline enumerations and their allowed transitions.
//!
//! Deal stages, lead statuses, account statuses, task statuses and opportunity stages are
//! stored as their display label in TEXT columns (so that import scripts and the board tool see
//! the same strings), but inside the service they are closed enums. Each enum carries a
//! transition table; [`ensure_transition`] is called by update handlers before a stage or status
//! change is written.
//!
//! Unrecognised stored labels read back as the pipeline's initial state.
//!
//! Moving a record to the value it already holds is always allowed, so partial updates that
//! resend the current stage never fail.

use serde::{Deserialize, Serialize};
use sqlx::{
    Postgres,
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
};
use std::fmt;
use tracing::warn;
use utoipa::ToSchema;

use crate::errors::Error;

/// A closed set of pipeline states with an explicit transition table.
pub trait Pipeline: Copy + Eq + fmt::Display + 'static {
    /// Human readable name of the field, used in error messages (e.g. "deal stage").
    const FIELD: &'static str;

    /// The value new records start in, and the fallback for unrecognised stored labels.
    const INITIAL: Self;

    /// Every state, in board order.
    const ALL: &'static [Self];

    /// The states reachable from `self` in a single update.
    fn allowed_next(self) -> &'static [Self];

    fn can_transition_to(self, next: Self) -> bool {
        self == next || self.allowed_next().contains(&next)
    }
}

/// Reject a transition not present in the table with a validation error.
pub fn ensure_transition<P: Pipeline>(from: P, to: P) -> Result<(), Error> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        let allowed = from.allowed_next().iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(", ");
        Err(Error::BadRequest {
            message: format!(
                "Cannot move {} from '{from}' to '{to}' (allowed: {})",
                P::FIELD,
                if allowed.is_empty() { "none".to_string() } else { allowed }
            ),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum DealStage {
    #[serde(rename = "Prospects")]
    Prospects,
    #[serde(rename = "Preparing proposal")]
    PreparingProposal,
    #[serde(rename = "Proposal sent")]
    ProposalSent,
    #[serde(rename = "Closed Won")]
    ClosedWon,
    #[serde(rename = "Lost")]
    Lost,
    #[serde(rename = "Completed")]
    Completed,
}

impl DealStage {
    pub fn label(self) -> &'static str {
        match self {
            DealStage::Prospects => "Prospects",
            DealStage::PreparingProposal => "Preparing proposal",
            DealStage::ProposalSent => "Proposal sent",
            DealStage::ClosedWon => "Closed Won",
            DealStage::Lost => "Lost",
            DealStage::Completed => "Completed",
        }
    }
}

impl Pipeline for DealStage {
    const FIELD: &'static str = "deal stage";
    const INITIAL: Self = DealStage::Prospects;
    const ALL: &'static [Self] = &[
        DealStage::Prospects,
        DealStage::PreparingProposal,
        DealStage::ProposalSent,
        DealStage::ClosedWon,
        DealStage::Lost,
        DealStage::Completed,
    ];

    fn allowed_next(self) -> &'static [Self] {
        use DealStage::*;
        match self {
            Prospects => &[PreparingProposal, ProposalSent, Lost],
            PreparingProposal => &[Prospects, ProposalSent, Lost],
            ProposalSent => &[PreparingProposal, ClosedWon, Lost],
            ClosedWon => &[Completed, Lost],
            // Lost deals can be revived into the pipeline
            Lost => &[Prospects, PreparingProposal],
            Completed => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum LeadStatus {
    #[serde(rename = "New Lead")]
    NewLead,
    #[serde(rename = "Working on it")]
    WorkingOnIt,
    #[serde(rename = "Prospect")]
    Prospect,
    #[serde(rename = "Unqualified")]
    Unqualified,
}

impl LeadStatus {
    pub fn label(self) -> &'static str {
        match self {
            LeadStatus::NewLead => "New Lead",
            LeadStatus::WorkingOnIt => "Working on it",
            LeadStatus::Prospect => "Prospect",
            LeadStatus::Unqualified => "Unqualified",
        }
    }
}

impl Pipeline for LeadStatus {
    const FIELD: &'static str = "lead status";
    const INITIAL: Self = LeadStatus::NewLead;
    const ALL: &'static [Self] = &[
        LeadStatus::NewLead,
        LeadStatus::WorkingOnIt,
        LeadStatus::Prospect,
        LeadStatus::Unqualified,
    ];

    fn allowed_next(self) -> &'static [Self] {
        use LeadStatus::*;
        match self {
            NewLead => &[WorkingOnIt, Prospect, Unqualified],
            WorkingOnIt => &[NewLead, Prospect, Unqualified],
            Prospect => &[WorkingOnIt, Unqualified],
            Unqualified => &[NewLead, WorkingOnIt],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum AccountStatus {
    #[serde(rename = "Prospect")]
    Prospect,
    #[serde(rename = "Qualified")]
    Qualified,
    #[serde(rename = "Active")]
    Active,
    #[serde(rename = "Inactive")]
    Inactive,
}

impl AccountStatus {
    pub fn label(self) -> &'static str {
        match self {
            AccountStatus::Prospect => "Prospect",
            AccountStatus::Qualified => "Qualified",
            AccountStatus::Active => "Active",
            AccountStatus::Inactive => "Inactive",
        }
    }
}

impl Pipeline for AccountStatus {
    const FIELD: &'static str = "account status";
    const INITIAL: Self = AccountStatus::Prospect;
    const ALL: &'static [Self] = &[
        AccountStatus::Prospect,
        AccountStatus::Qualified,
        AccountStatus::Active,
        AccountStatus::Inactive,
    ];

    fn allowed_next(self) -> &'static [Self] {
        use AccountStatus::*;
        match self {
            Prospect => &[Qualified, Active, Inactive],
            Qualified => &[Prospect, Active, Inactive],
            Active => &[Inactive],
            Inactive => &[Prospect, Active],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    #[serde(rename = "To do")]
    ToDo,
    #[serde(rename = "Working on it")]
    WorkingOnIt,
    #[serde(rename = "Stuck")]
    Stuck,
    #[serde(rename = "On hold")]
    OnHold,
    #[serde(rename = "Need info")]
    NeedInfo,
    #[serde(rename = "Waiting for review")]
    WaitingForReview,
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To do",
            TaskStatus::WorkingOnIt => "Working on it",
            TaskStatus::Stuck => "Stuck",
            TaskStatus::OnHold => "On hold",
            TaskStatus::NeedInfo => "Need info",
            TaskStatus::WaitingForReview => "Waiting for review",
            TaskStatus::Done => "Done",
        }
    }

    /// Whether the task still needs attention.
    pub fn is_open(self) -> bool {
        self != TaskStatus::Done
    }
}

impl Pipeline for TaskStatus {
    const FIELD: &'static str = "task status";
    const INITIAL: Self = TaskStatus::ToDo;
    const ALL: &'static [Self] = &[
        TaskStatus::ToDo,
        TaskStatus::WorkingOnIt,
        TaskStatus::Stuck,
        TaskStatus::OnHold,
        TaskStatus::NeedInfo,
        TaskStatus::WaitingForReview,
        TaskStatus::Done,
    ];

    fn allowed_next(self) -> &'static [Self] {
        use TaskStatus::*;
        match self {
            ToDo | WorkingOnIt | Stuck | OnHold | NeedInfo | WaitingForReview => {
                &[ToDo, WorkingOnIt, Stuck, OnHold, NeedInfo, WaitingForReview, Done]
            }
            // Finished tasks have to be reopened before they can stall again
            Done => &[ToDo, WorkingOnIt],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OpportunityStage {
    #[serde(rename = "Leads")]
    Leads,
    #[serde(rename = "Estimating")]
    Estimating,
    #[serde(rename = "Submitted")]
    Submitted,
    #[serde(rename = "Submitted Revisions")]
    SubmittedRevisions,
    #[serde(rename = "Small works")]
    SmallWorks,
    #[serde(rename = "Won")]
    Won,
    #[serde(rename = "Signed - Small works")]
    SignedSmallWorks,
    #[serde(rename = "Lost")]
    Lost,
    #[serde(rename = "Declined")]
    Declined,
}

impl OpportunityStage {
    pub fn label(self) -> &'static str {
        match self {
            OpportunityStage::Leads => "Leads",
            OpportunityStage::Estimating => "Estimating",
            OpportunityStage::Submitted => "Submitted",
            OpportunityStage::SubmittedRevisions => "Submitted Revisions",
            OpportunityStage::SmallWorks => "Small works",
            OpportunityStage::Won => "Won",
            OpportunityStage::SignedSmallWorks => "Signed - Small works",
            OpportunityStage::Lost => "Lost",
            OpportunityStage::Declined => "Declined",
        }
    }
}

impl Pipeline for OpportunityStage {
    const FIELD: &'static str = "opportunity stage";
    const INITIAL: Self = OpportunityStage::Leads;
    const ALL: &'static [Self] = &[
        OpportunityStage::Leads,
        OpportunityStage::Estimating,
        OpportunityStage::Submitted,
        OpportunityStage::SubmittedRevisions,
        OpportunityStage::SmallWorks,
        OpportunityStage::Won,
        OpportunityStage::SignedSmallWorks,
        OpportunityStage::Lost,
        OpportunityStage::Declined,
    ];

    fn allowed_next(self) -> &'static [Self] {
        use OpportunityStage::*;
        match self {
            Leads => &[Estimating, SmallWorks, Lost, Declined],
            Estimating => &[Leads, Submitted, Lost, Declined],
            Submitted => &[SubmittedRevisions, Won, Lost],
            SubmittedRevisions => &[Submitted, Won, Lost],
            SmallWorks => &[SignedSmallWorks, Lost, Declined],
            Won => &[],
            SignedSmallWorks => &[],
            Lost => &[Leads],
            Declined => &[Leads],
        }
    }
}

/// Display, label lookup and TEXT column mapping for the pipeline enums.
///
/// Stored labels are written by import scripts as well as by the service, so a label outside the
/// vocabulary decodes to [`Pipeline::INITIAL`] with a warning instead of failing the whole query.
macro_rules! stored_as_label {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $ty {
                pub fn from_label(label: &str) -> Option<Self> {
                    <$ty as Pipeline>::ALL.iter().copied().find(|value| value.label() == label)
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }

            impl sqlx::Type<Postgres> for $ty {
                fn type_info() -> PgTypeInfo {
                    <str as sqlx::Type<Postgres>>::type_info()
                }

                fn compatible(ty: &PgTypeInfo) -> bool {
                    <str as sqlx::Type<Postgres>>::compatible(ty)
                }
            }

            impl sqlx::Encode<'_, Postgres> for $ty {
                fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
                    <&str as sqlx::Encode<Postgres>>::encode(self.label(), buf)
                }
            }

            impl<'r> sqlx::Decode<'r, Postgres> for $ty {
                fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                    let label = <&str as sqlx::Decode<Postgres>>::decode(value)?;
                    Ok(<$ty>::from_label(label).unwrap_or_else(|| {
                        let fallback = <$ty as Pipeline>::INITIAL;
                        warn!(
                            "Unknown {} '{}' read from the database, treating it as '{}'",
                            <$ty as Pipeline>::FIELD,
                            label,
                            fallback
                        );
                        fallback
                    }))
                }
            }
        )+
    };
}

stored_as_label!(DealStage, LeadStatus, AccountStatus, TaskStatus, OpportunityStage);
