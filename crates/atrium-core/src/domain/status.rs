//! Status enums shared by the soft-deletable entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown status: {0}")]
pub struct StatusParseError(pub String);

macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = StatusParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(StatusParseError(other.to_string())),
                }
            }
        }
    };
}

// Soft-delete lifecycle for users and customers.
wire_enum!(EntityStatus {
    Active => "active",
    Inactive => "inactive",
    Deleted => "deleted",
});

wire_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

wire_enum!(RequestStatus {
    New => "new",
    InProgress => "in_progress",
    Resolved => "resolved",
    Deleted => "deleted",
});

wire_enum!(ProjectStatus {
    Active => "active",
    OnHold => "on_hold",
    Completed => "completed",
    Deleted => "deleted",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        assert_eq!("active".parse::<EntityStatus>().unwrap(), EntityStatus::Active);
        assert_eq!(EntityStatus::Deleted.as_str(), "deleted");
        assert_eq!(
            "in_progress".parse::<RequestStatus>().unwrap(),
            RequestStatus::InProgress
        );
        assert!("bogus".parse::<ProjectStatus>().is_err());
    }
}
