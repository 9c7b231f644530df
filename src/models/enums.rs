use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
///
/// Parsing is case-insensitive and accepts extra aliases listed after `|`.
/// Serde uses the canonical string on both sides.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal $(| $alias:literal)*),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
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

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lowered = s.trim().to_ascii_lowercase();
                $(
                    if lowered == $s.to_ascii_lowercase() $(|| lowered == $alias)* {
                        return Ok(Self::$variant);
                    }
                )+
                Err(DatabaseError::InvalidEnum {
                    field: stringify!($name).into(),
                    value: s.into(),
                })
            }
        }
    };
}

str_enum!(UserRole {
    Admin => "admin",
    Doctor => "doctor",
    Patient => "patient",
});

str_enum!(AppointmentStatus {
    Scheduled => "Scheduled",
    Completed => "Completed",
    NoShow => "NoShow" | "no_show" | "no-show",
});

str_enum!(TrendStatus {
    Improving => "Improving",
    Stable => "Stable",
    Worsening => "Worsening",
});

str_enum!(AgeBand {
    Under18 => "Under 18",
    From18To30 => "18-30",
    From31To45 => "31-45",
    From46To60 => "46-60",
    Over60 => "60+",
    Unknown => "Unknown",
});

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Scheduled
    }
}

impl AgeBand {
    /// Display order for cohort breakdowns.
    pub const ALL: [AgeBand; 6] = [
        AgeBand::Under18,
        AgeBand::From18To30,
        AgeBand::From31To45,
        AgeBand::From46To60,
        AgeBand::Over60,
        AgeBand::Unknown,
    ];

    pub fn for_age(age: Option<i64>) -> Self {
        match age {
            None => AgeBand::Unknown,
            Some(a) if a < 18 => AgeBand::Under18,
            Some(a) if a <= 30 => AgeBand::From18To30,
            Some(a) if a <= 45 => AgeBand::From31To45,
            Some(a) if a <= 60 => AgeBand::From46To60,
            Some(_) => AgeBand::Over60,
        }
    }
}
