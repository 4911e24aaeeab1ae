use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Declares a closed set of string-valued variants with serde names, `as_str`,
/// `FromStr` and `Display` kept in sync.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($what:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Invalid {}: {}", $what, other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    pub enum Role ("role") {
        Client => "client",
        Freelancer => "freelancer",
        Admin => "admin",
    }
}

string_enum! {
    pub enum JobStatus ("job status") {
        Open => "open",
        InProgress => "in-progress",
        Completed => "completed",
    }
}

string_enum! {
    /// `Pending` is the only state that can change; the other two are terminal.
    pub enum ApplicationStatus ("application status") {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
    }
}

string_enum! {
    pub enum JobType ("job type") {
        Ongoing => "ongoing",
        OneTime => "one-time",
    }
}

string_enum! {
    pub enum RateKind ("rate") {
        Hourly => "hourly",
        Fixed => "fixed",
    }
}

string_enum! {
    /// Project length in months.
    pub enum ProjectLength ("project length") {
        UnderOne => "<1",
        OneToThree => "1-3",
        ThreeToSix => "3-6",
        SixToTwelve => "6-12",
        OverTwelve => "12+",
    }
}

string_enum! {
    pub enum HoursPerWeek ("hours per week") {
        UnderTen => "<10",
        TenToTwenty => "10-20",
        TwentyToForty => "20-40",
        FortyToSixty => "40-60",
        OverEighty => "80+",
    }
}

impl ApplicationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}
