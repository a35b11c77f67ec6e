use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(AccountId, "Identifies an Account.");
uuid_id!(PolicyId, "Identifies a Policy.");
uuid_id!(AutomationId, "Identifies an Automation.");
uuid_id!(TemplateId, "Identifies an email template.");
uuid_id!(ScheduledEmailId, "Identifies a row in the scheduled-email queue.");
uuid_id!(EmailLogId, "Identifies an email-log audit record.");
uuid_id!(OwnerId, "Identifies the end-user (agency/owner) a resource belongs to.");
uuid_id!(BatchId, "Identifies a mass-email batch.");
