//! Status ids mapping to SMALLINT lookup tables.
//!
//! Each variant's discriminant matches the seed order (1-based) of the
//! corresponding `*_statuses` table.

use vstudio_core::error::CoreError;
use vstudio_core::media::MediaStatus;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Row ids of `media_statuses`.
    MediaStatusId {
        Pending = 1,
        Running = 2,
        Completed = 3,
        Failed = 4,
    }
}

impl From<MediaStatus> for MediaStatusId {
    fn from(value: MediaStatus) -> Self {
        match value {
            MediaStatus::Pending => Self::Pending,
            MediaStatus::Running => Self::Running,
            MediaStatus::Completed => Self::Completed,
            MediaStatus::Failed => Self::Failed,
        }
    }
}

impl From<MediaStatusId> for MediaStatus {
    fn from(value: MediaStatusId) -> Self {
        match value {
            MediaStatusId::Pending => Self::Pending,
            MediaStatusId::Running => Self::Running,
            MediaStatusId::Completed => Self::Completed,
            MediaStatusId::Failed => Self::Failed,
        }
    }
}

/// Decode a stored status id.
pub fn media_status(id: StatusId) -> Result<MediaStatus, CoreError> {
    MediaStatusId::from_id(id)
        .map(MediaStatus::from)
        .ok_or_else(|| CoreError::Corrupt(format!("unknown media status id {id}")))
}
