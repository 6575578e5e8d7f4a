use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// JSON and the database share the same string representation.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Doctor => "doctor",
    Laboratory => "laboratory",
    Admin => "admin",
});

impl Role {
    /// Doctors and laboratories go through admin validation and the
    /// consent ledger; patients and admins do not.
    pub fn is_professional(&self) -> bool {
        matches!(self, Self::Doctor | Self::Laboratory)
    }
}

str_enum!(Gender {
    Male => "M",
    Female => "F",
});

str_enum!(BloodGroup {
    APositive => "A+",
    ANegative => "A-",
    BPositive => "B+",
    BNegative => "B-",
    AbPositive => "AB+",
    AbNegative => "AB-",
    OPositive => "O+",
    ONegative => "O-",
});

str_enum!(Genotype {
    Aa => "AA",
    As => "AS",
    Ss => "SS",
    Ac => "AC",
    Sc => "SC",
});

str_enum!(TestStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Canceled => "canceled",
});
